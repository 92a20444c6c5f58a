//! Bump-pointer memory arena
//!
//! Emulates the real-mode memory manager of the classic game: one fixed byte
//! pool is carved into chunks in arrival order. Chunks are never freed one by
//! one; the whole pool is reset when a level (re)starts.
//!
//! Instead of raw addresses, `push_chunk` hands out a [`ChunkHandle`]. A
//! handle carries the arena generation it was issued in, so using one after a
//! reset is caught instead of silently aliasing the next level's data.

use bytemuck::Pod;
use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Kind of data held by a chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChunkType {
    /// Long-lived session data (particle buffers, actor info)
    Common,
    /// Level map tiles
    MapData,
    /// Tileset attribute table
    Czone,
}

/// Opaque reference to an allocated chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkHandle {
    index: u16,
    tag: ChunkType,
    generation: u32,
}

impl ChunkHandle {
    pub fn tag(&self) -> ChunkType {
        self.tag
    }
}

/// Bookkeeping entry for one chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub offset: usize,
    pub size: usize,
    pub tag: ChunkType,
}

/// Fixed-capacity byte pool with a bounded chunk table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryArena {
    pool: Vec<u8>,
    chunks: Vec<ChunkRecord>,
    max_chunks: usize,
    used: usize,
    generation: u32,
}

impl MemoryArena {
    pub fn new(capacity: usize, max_chunks: usize) -> Self {
        Self {
            pool: vec![0; capacity],
            chunks: Vec::with_capacity(max_chunks),
            max_chunks,
            used: 0,
            generation: 0,
        }
    }

    /// Carve `size` bytes off the free end of the pool.
    ///
    /// The chunk keeps whatever bytes the pool held at that position.
    pub fn push_chunk(&mut self, size: usize, tag: ChunkType) -> Result<ChunkHandle, SimError> {
        if self.chunks.len() >= self.max_chunks {
            return Err(SimError::ChunkTableFull {
                max: self.max_chunks,
            });
        }

        let available = self.remaining();
        if size > available {
            return Err(SimError::ArenaExhausted {
                requested: size,
                available,
                tag,
            });
        }

        let index = self.chunks.len() as u16;
        self.chunks.push(ChunkRecord {
            offset: self.used,
            size,
            tag,
        });
        self.used += size;
        log::debug!("arena: chunk {} ({:?}, {} bytes), {} used", index, tag, size, self.used);

        Ok(ChunkHandle {
            index,
            tag,
            generation: self.generation,
        })
    }

    /// Release every chunk at once. Handles issued before are invalidated.
    pub fn reset(&mut self) {
        self.chunks.clear();
        self.used = 0;
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn capacity(&self) -> usize {
        self.pool.len()
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn remaining(&self) -> usize {
        self.pool.len() - self.used
    }

    pub fn chunks(&self) -> &[ChunkRecord] {
        &self.chunks
    }

    /// Resolve a handle, panicking if it was issued before the last reset
    pub fn record(&self, handle: ChunkHandle) -> ChunkRecord {
        assert_eq!(
            handle.generation, self.generation,
            "stale arena handle for chunk {}",
            handle.index
        );
        let record = self.chunks[handle.index as usize];
        assert_eq!(record.tag, handle.tag, "arena handle type mismatch");
        record
    }

    pub fn bytes(&self, handle: ChunkHandle) -> &[u8] {
        let record = self.record(handle);
        &self.pool[record.offset..record.offset + record.size]
    }

    pub fn bytes_mut(&mut self, handle: ChunkHandle) -> &mut [u8] {
        let record = self.record(handle);
        &mut self.pool[record.offset..record.offset + record.size]
    }

    /// Number of whole 16-bit words in the chunk
    pub fn word_len(&self, handle: ChunkHandle) -> usize {
        self.record(handle).size / 2
    }

    /// Read the little-endian word at `index`
    pub fn word(&self, handle: ChunkHandle, index: usize) -> u16 {
        let bytes = self.bytes(handle);
        u16::from_le_bytes([bytes[index * 2], bytes[index * 2 + 1]])
    }

    pub fn set_word(&mut self, handle: ChunkHandle, index: usize, value: u16) {
        let bytes = self.bytes_mut(handle);
        bytes[index * 2..index * 2 + 2].copy_from_slice(&value.to_le_bytes());
    }

    /// Read the `index`-th record of type `T` stored back to back in the chunk
    pub fn read<T: Pod>(&self, handle: ChunkHandle, index: usize) -> T {
        let size = std::mem::size_of::<T>();
        let bytes = self.bytes(handle);
        bytemuck::pod_read_unaligned(&bytes[index * size..(index + 1) * size])
    }

    pub fn write<T: Pod>(&mut self, handle: ChunkHandle, index: usize, value: T) {
        let size = std::mem::size_of::<T>();
        let bytes = self.bytes_mut(handle);
        bytes[index * size..(index + 1) * size].copy_from_slice(bytemuck::bytes_of(&value));
    }
}
