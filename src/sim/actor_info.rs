//! Per-actor-type info table
//!
//! The table is copied verbatim into a `Common` arena chunk. Layout, in
//! little-endian words:
//!
//! ```text
//! [0..n)          word offset of each type's record (n = offset of type 0)
//! record + 0      number of frames
//! record + 1      draw index (signed)
//! record + 2 + 8f frame f: x offset, y offset, height, width, 4 unused words
//! ```
//!
//! Every offset is checked when the table is loaded, so lookups for a known
//! type never read outside the chunk.

use serde::{Deserialize, Serialize};

use super::arena::{ChunkHandle, ChunkType, MemoryArena};
use crate::error::{LoadError, SimError};

const FRAME_WORDS: usize = 8;
const RECORD_HEADER_WORDS: usize = 2;

/// Geometry of one sprite frame, in tiles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorFrameInfo {
    pub x_offset: i16,
    pub y_offset: i16,
    pub width: u16,
    pub height: u16,
}

/// Handle to the loaded info table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorInfoTable {
    handle: ChunkHandle,
    num_types: u16,
}

impl ActorInfoTable {
    /// Validate `data` and copy it into a new arena chunk
    pub fn load(arena: &mut MemoryArena, data: &[u8]) -> Result<Self, LoadError> {
        let num_types = validate(data)?;
        let handle = arena.push_chunk(data.len(), ChunkType::Common)?;
        arena.bytes_mut(handle).copy_from_slice(data);
        log::debug!("actor info: {} types, {} bytes", num_types, data.len());
        Ok(Self { handle, num_types })
    }

    pub fn num_types(&self) -> u16 {
        self.num_types
    }

    fn record_offset(&self, arena: &MemoryArena, id: u16) -> Result<usize, SimError> {
        if id >= self.num_types {
            return Err(SimError::UnknownActorType(id));
        }
        Ok(arena.word(self.handle, id as usize) as usize)
    }

    pub fn num_frames(&self, arena: &MemoryArena, id: u16) -> Result<u16, SimError> {
        let offset = self.record_offset(arena, id)?;
        Ok(arena.word(self.handle, offset))
    }

    /// Draw index deciding the spawn pass of this type at level start
    pub fn draw_index(&self, arena: &MemoryArena, id: u16) -> Result<i16, SimError> {
        let offset = self.record_offset(arena, id)?;
        Ok(arena.word(self.handle, offset + 1) as i16)
    }

    /// Geometry of `frame`. Frames past the last one read as empty.
    pub fn frame(&self, arena: &MemoryArena, id: u16, frame: u16) -> Result<ActorFrameInfo, SimError> {
        let offset = self.record_offset(arena, id)?;
        if frame >= arena.word(self.handle, offset) {
            return Ok(ActorFrameInfo {
                x_offset: 0,
                y_offset: 0,
                width: 0,
                height: 0,
            });
        }
        let base = offset + RECORD_HEADER_WORDS + frame as usize * FRAME_WORDS;
        Ok(ActorFrameInfo {
            x_offset: arena.word(self.handle, base) as i16,
            y_offset: arena.word(self.handle, base + 1) as i16,
            height: arena.word(self.handle, base + 2),
            width: arena.word(self.handle, base + 3),
        })
    }
}

fn read_word(data: &[u8], index: usize) -> u16 {
    u16::from_le_bytes([data[index * 2], data[index * 2 + 1]])
}

fn validate(data: &[u8]) -> Result<u16, LoadError> {
    let len_words = data.len() / 2;
    if len_words == 0 {
        return Err(LoadError::CorruptActorInfo("empty table".into()));
    }

    let num_types = read_word(data, 0);
    if num_types == 0 || num_types as usize > len_words {
        return Err(LoadError::CorruptActorInfo(format!(
            "offset table of {} entries does not fit {} words",
            num_types, len_words
        )));
    }

    for id in 0..num_types as usize {
        let offset = read_word(data, id) as usize;
        if offset + RECORD_HEADER_WORDS > len_words {
            return Err(LoadError::CorruptActorInfo(format!(
                "record of type {} starts past the end",
                id
            )));
        }
        let frames = read_word(data, offset) as usize;
        if offset + RECORD_HEADER_WORDS + frames * FRAME_WORDS > len_words {
            return Err(LoadError::CorruptActorInfo(format!(
                "frames of type {} run past the end",
                id
            )));
        }
    }

    Ok(num_types)
}

/// Description of one type, used to build tables in tools and tests
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActorInfoEntry {
    pub draw_index: i16,
    /// (width, height) of each frame, zero offsets
    pub frames: Vec<(u16, u16)>,
}

/// Encode entries into the on-disk table layout (type id = position)
pub fn encode_actor_info(entries: &[ActorInfoEntry]) -> Vec<u8> {
    let mut words: Vec<u16> = vec![0; entries.len()];
    for (id, entry) in entries.iter().enumerate() {
        words[id] = words.len() as u16;
        words.push(entry.frames.len() as u16);
        words.push(entry.draw_index as u16);
        for &(width, height) in &entry.frames {
            words.extend_from_slice(&[0, 0, height, width, 0, 0, 0, 0]);
        }
    }
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        encode_actor_info(&[
            ActorInfoEntry {
                draw_index: 0,
                frames: vec![(3, 5), (3, 5)],
            },
            ActorInfoEntry {
                draw_index: -1,
                frames: vec![(2, 2)],
            },
            ActorInfoEntry {
                draw_index: 3,
                frames: vec![],
            },
        ])
    }

    #[test]
    fn test_lookup() {
        let mut arena = MemoryArena::new(1024, 4);
        let table = ActorInfoTable::load(&mut arena, &sample()).unwrap();
        assert_eq!(table.num_types(), 3);
        assert_eq!(table.draw_index(&arena, 1).unwrap(), -1);
        assert_eq!(table.draw_index(&arena, 2).unwrap(), 3);
        assert_eq!(table.num_frames(&arena, 0).unwrap(), 2);
        let frame = table.frame(&arena, 0, 1).unwrap();
        assert_eq!((frame.width, frame.height), (3, 5));
        assert_eq!(table.frame(&arena, 2, 0).unwrap().width, 0);
    }

    #[test]
    fn test_unknown_type_is_fatal() {
        let mut arena = MemoryArena::new(1024, 4);
        let table = ActorInfoTable::load(&mut arena, &sample()).unwrap();
        assert_eq!(table.draw_index(&arena, 3), Err(SimError::UnknownActorType(3)));
    }

    #[test]
    fn test_truncated_table_rejected() {
        let mut data = sample();
        data.truncate(data.len() - 4);
        let mut arena = MemoryArena::new(1024, 4);
        assert!(matches!(
            ActorInfoTable::load(&mut arena, &data),
            Err(LoadError::CorruptActorInfo(_))
        ));
        // Nothing is allocated for a rejected table
        assert_eq!(arena.used(), 0);
    }

    #[test]
    fn test_table_too_large_for_arena() {
        let mut arena = MemoryArena::new(8, 4);
        let err = ActorInfoTable::load(&mut arena, &sample()).unwrap_err();
        assert!(err.is_fatal());
    }
}
