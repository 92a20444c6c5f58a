//! Level blob parsing and the render-side map mirror
//!
//! Level file layout (all words little-endian):
//!
//! ```text
//! 0       u16  header size
//! 2       header bytes
//!   +0      tileset file name (13 bytes, space padded)
//!   +13     backdrop file name (13 bytes)
//!   +26     music file name (13 bytes)
//!   +39     flags
//!   +40     alternative backdrop number
//!   +43     actor list size in words
//!   +45     actor list: (id, x, y) word triples
//!   +45+2n  map width in tiles
//! 2+size  map data, 65500 bytes
//! ```

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::LoadError;
use crate::sim::actors::ActorDescriptor;

const TILESET_NAME_OFFSET: usize = 0;
const BACKDROP_NAME_OFFSET: usize = 13;
const MUSIC_NAME_OFFSET: usize = 26;
const FILE_NAME_LEN: usize = 13;
const FLAGS_OFFSET: usize = 39;
const ALT_BACKDROP_OFFSET: usize = 40;
const ACTOR_LIST_SIZE_OFFSET: usize = 43;
const ACTOR_LIST_OFFSET: usize = 45;

/// Number of map tiles in the map data block
pub const MAP_DATA_WORDS: usize = MAP_DATA_SIZE / 2;

/// Level behavior switches from the header's flag byte
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelFlags {
    pub parallax_both: bool,
    pub parallax_horizontal: bool,
    pub auto_scroll_x: bool,
    pub auto_scroll_y: bool,
    pub earthquake: bool,
    pub switch_backdrop_on_reactor_destruction: bool,
    pub switch_backdrop_on_teleport: bool,
}

impl LevelFlags {
    pub fn from_bits(bits: u8) -> Self {
        Self {
            parallax_both: bits & 0x01 != 0,
            parallax_horizontal: bits & 0x02 != 0,
            auto_scroll_x: bits & 0x08 != 0,
            auto_scroll_y: bits & 0x10 != 0,
            earthquake: bits & 0x20 != 0,
            switch_backdrop_on_reactor_destruction: bits & 0x40 != 0,
            switch_backdrop_on_teleport: bits & 0x80 != 0,
        }
    }

    pub fn bits(&self) -> u8 {
        let mut bits = 0;
        for (set, bit) in [
            (self.parallax_both, 0x01),
            (self.parallax_horizontal, 0x02),
            (self.auto_scroll_x, 0x08),
            (self.auto_scroll_y, 0x10),
            (self.earthquake, 0x20),
            (self.switch_backdrop_on_reactor_destruction, 0x40),
            (self.switch_backdrop_on_teleport, 0x80),
        ] {
            if set {
                bits |= bit;
            }
        }
        bits
    }
}

/// Parsed level file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelData {
    /// Raw header bytes, as kept by the simulation
    pub header: Vec<u8>,
    pub tileset_name: String,
    pub backdrop_name: String,
    pub music_name: String,
    pub flags: LevelFlags,
    pub alternative_backdrop: u8,
    /// Actor list size in words, as stored in the header
    pub actor_list_size: u16,
    pub actors: Vec<ActorDescriptor>,
    pub map_width: u16,
    /// Map tile words, 65500 bytes
    pub map_data: Vec<u8>,
}

fn read_word(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

/// Words past the end of the header read as 0
fn read_word_or_zero(data: &[u8], offset: usize) -> u16 {
    match data.get(offset..offset + 2) {
        Some(bytes) => u16::from_le_bytes([bytes[0], bytes[1]]),
        None => 0,
    }
}

fn read_name(header: &[u8], offset: usize) -> String {
    let raw = &header[offset..offset + FILE_NAME_LEN];
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).trim_end().to_string()
}

fn write_name(header: &mut [u8], offset: usize, name: &str) {
    let field = &mut header[offset..offset + FILE_NAME_LEN];
    field.fill(b' ');
    let bytes = name.as_bytes();
    let len = bytes.len().min(FILE_NAME_LEN);
    field[..len].copy_from_slice(&bytes[..len]);
}

impl LevelData {
    pub fn parse(bytes: &[u8]) -> Result<Self, LoadError> {
        if bytes.len() < 2 {
            return Err(LoadError::Truncated {
                expected: 2,
                actual: bytes.len(),
            });
        }

        let header_size = read_word(bytes, 0) as usize;
        if header_size >= LEVEL_HEADER_CAPACITY {
            return Err(LoadError::HeaderTooLarge {
                declared: header_size,
                capacity: LEVEL_HEADER_CAPACITY,
            });
        }

        let expected = 2 + header_size + MAP_DATA_SIZE;
        if bytes.len() < expected {
            return Err(LoadError::Truncated {
                expected,
                actual: bytes.len(),
            });
        }

        let header = bytes[2..2 + header_size].to_vec();
        if header.len() < ACTOR_LIST_OFFSET {
            return Err(LoadError::Truncated {
                expected: ACTOR_LIST_OFFSET,
                actual: header.len(),
            });
        }

        let actor_list_size = read_word(&header, ACTOR_LIST_SIZE_OFFSET);
        let width_offset = ACTOR_LIST_OFFSET + actor_list_size as usize * 2;
        if header.len() < width_offset + 2 {
            return Err(LoadError::Truncated {
                expected: width_offset + 2,
                actual: header.len(),
            });
        }

        // A trailing partial record is still read, continuing into the
        // words that follow the list
        let actors = (0..width_offset - ACTOR_LIST_OFFSET)
            .step_by(6)
            .map(|i| {
                let offset = ACTOR_LIST_OFFSET + i;
                ActorDescriptor {
                    id: read_word_or_zero(&header, offset),
                    x: read_word_or_zero(&header, offset + 2),
                    y: read_word_or_zero(&header, offset + 4),
                }
            })
            .collect();

        let map_width = read_word(&header, width_offset);
        if !map_width.is_power_of_two() || map_width as usize > MAP_DATA_WORDS {
            return Err(LoadError::InvalidMapWidth(map_width));
        }

        Ok(Self {
            tileset_name: read_name(&header, TILESET_NAME_OFFSET),
            backdrop_name: read_name(&header, BACKDROP_NAME_OFFSET),
            music_name: read_name(&header, MUSIC_NAME_OFFSET),
            flags: LevelFlags::from_bits(header[FLAGS_OFFSET]),
            alternative_backdrop: header[ALT_BACKDROP_OFFSET],
            actor_list_size,
            actors,
            map_width,
            map_data: bytes[2 + header_size..expected].to_vec(),
            header,
        })
    }

    /// Build a level in memory. `tiles` is laid out row by row with
    /// `map_width` tiles per row; missing tiles are 0.
    pub fn new(
        tileset_name: &str,
        flags: LevelFlags,
        actors: Vec<ActorDescriptor>,
        map_width: u16,
        tiles: &[u16],
    ) -> Self {
        let actor_list_size = (actors.len() * 3) as u16;
        let mut header = vec![0u8; ACTOR_LIST_OFFSET + actors.len() * 6 + 2];
        write_name(&mut header, TILESET_NAME_OFFSET, tileset_name);
        write_name(&mut header, BACKDROP_NAME_OFFSET, "");
        write_name(&mut header, MUSIC_NAME_OFFSET, "");
        header[FLAGS_OFFSET] = flags.bits();
        header[ACTOR_LIST_SIZE_OFFSET..ACTOR_LIST_SIZE_OFFSET + 2]
            .copy_from_slice(&actor_list_size.to_le_bytes());
        for (i, actor) in actors.iter().enumerate() {
            let offset = ACTOR_LIST_OFFSET + i * 6;
            header[offset..offset + 2].copy_from_slice(&actor.id.to_le_bytes());
            header[offset + 2..offset + 4].copy_from_slice(&actor.x.to_le_bytes());
            header[offset + 4..offset + 6].copy_from_slice(&actor.y.to_le_bytes());
        }
        let width_offset = header.len() - 2;
        header[width_offset..].copy_from_slice(&map_width.to_le_bytes());

        let mut map_data = vec![0u8; MAP_DATA_SIZE];
        for (i, tile) in tiles.iter().take(MAP_DATA_WORDS).enumerate() {
            map_data[i * 2..i * 2 + 2].copy_from_slice(&tile.to_le_bytes());
        }

        Self {
            header,
            tileset_name: tileset_name.to_string(),
            backdrop_name: String::new(),
            music_name: String::new(),
            flags,
            alternative_backdrop: 0,
            actor_list_size,
            actors,
            map_width,
            map_data,
        }
    }

    /// Serialize into the on-disk layout
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(2 + self.header.len() + self.map_data.len());
        bytes.extend_from_slice(&(self.header.len() as u16).to_le_bytes());
        bytes.extend_from_slice(&self.header);
        bytes.extend_from_slice(&self.map_data);
        bytes
    }

    pub fn map_height(&self) -> u16 {
        (MAP_DATA_WORDS / self.map_width as usize) as u16
    }
}

/// Tile grid as seen by the renderer: tile indices (map value / 8)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelMap {
    width: u16,
    height: u16,
    tiles: Vec<u16>,
}

impl LevelMap {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            tiles: vec![0; width as usize * height as usize],
        }
    }

    pub fn from_level(level: &LevelData) -> Self {
        let mut map = Self::new(level.map_width, level.map_height());
        for (i, tile) in map.tiles.iter_mut().enumerate() {
            *tile = read_word(&level.map_data, i * 2) / 8;
        }
        map
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn tile_at(&self, x: u16, y: u16) -> u16 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        self.tiles[y as usize * self.width as usize + x as usize]
    }

    /// Writes outside the grid are dropped
    pub fn set_tile_at(&mut self, x: u16, y: u16, tile: u16) {
        if x < self.width && y < self.height {
            self.tiles[y as usize * self.width as usize + x as usize] = tile;
        }
    }
}
