//! Classic World - bit-exact simulation core of a 16-bit platformer
//!
//! Core modules:
//! - `sim`: Deterministic per-frame simulation (arena, RNG, particles, actors)
//! - `world`: Session owner that drives frames and quick saves
//! - `level`: Level blob parsing and the render-side map mirror
//! - `profile`: Player profile shared with the host shell
//! - `settings`: Data-driven configuration

pub mod error;
pub mod level;
pub mod profile;
pub mod settings;
pub mod sim;
pub mod world;

pub use error::{LoadError, SimError};
pub use settings::Settings;
pub use world::{GameWorld, LevelAssets};

/// Game configuration constants
pub mod consts {
    /// Size of one map tile in pixels
    pub const TILE_SIZE_PX: u16 = 8;

    /// Visible map area in tiles
    pub const VIEWPORT_WIDTH: u16 = 32;
    pub const VIEWPORT_HEIGHT: u16 = 20;

    /// Pixel window in which particles are drawn (x in [8, 264), y in [8, 160))
    pub const PARTICLE_VIEW_LEFT: i16 = 8;
    pub const PARTICLE_VIEW_RIGHT: i16 = 264;
    pub const PARTICLE_VIEW_TOP: i16 = 8;
    pub const PARTICLE_VIEW_BOTTOM: i16 = 160;

    /// Particle system
    pub const NUM_PARTICLE_GROUPS: usize = 5;
    pub const PARTICLES_PER_GROUP: usize = 64;
    /// A group is active for this many frames
    pub const PARTICLE_LIFETIME: u16 = 28;

    /// Slot capacities
    pub const MAX_NUM_ACTORS: usize = 448;
    pub const MAX_NUM_EFFECTS: usize = 18;
    pub const MAX_NUM_PLAYER_SHOTS: usize = 6;
    pub const MAX_NUM_MOVING_MAP_PARTS: usize = 70;
    pub const MAX_NUM_TILE_DEBRIS: usize = 700;

    /// Memory arena defaults (overridable through `Settings`)
    pub const DEFAULT_ARENA_CAPACITY: usize = 200_000;
    pub const DEFAULT_ARENA_MAX_CHUNKS: usize = 32;

    /// Level data buffers
    pub const LEVEL_HEADER_CAPACITY: usize = 3002;
    pub const MAP_DATA_SIZE: usize = 65500;
    pub const TILESET_ATTRIBUTES_SIZE: usize = 3600;
    /// Highest tile value that may be written into the map
    pub const MAX_TILE_VALUE: u16 = 8000;

    /// Player
    pub const PLAYER_MAX_HEALTH: u8 = 9;
    pub const INITIAL_MERCY_FRAMES: u8 = 20;
    pub const PLAYER_DEATH_ANIMATION_STEPS: u8 = 12;
    pub const PLAYER_WIDTH: u16 = 3;
    pub const PLAYER_HEIGHT: u16 = 5;

    /// Actor ids with special meaning to the core
    pub const ACT_DUKE_L: u16 = 0;
    pub const ACT_DUKE_R: u16 = 1;
    pub const ACT_RAPID_FIRE_ICON: u16 = 114;
    pub const ACT_CIRCUIT_CARD: u16 = 120;
    pub const ACT_BLUE_KEY: u16 = 121;
    pub const ACT_CLOAKING_DEVICE_ICON: u16 = 214;
    pub const ACT_SPECIAL_HINT_GLOBE_ICON: u16 = 233;
    pub const ACT_RESPAWN_CHECKPOINT: u16 = 128;
    pub const ACT_META_MEDIUMHARD_ONLY: u16 = 82;
    pub const ACT_META_HARD_ONLY: u16 = 83;

    /// Sound ids used by the core
    pub const SND_DUKE_PAIN: u8 = 14;
    pub const SND_DUKE_DEATH: u8 = 28;
    pub const SND_EARTHQUAKE: u8 = 38;
}

/// Convert tile units to pixel units (16-bit wrapping)
#[inline]
pub fn tile_to_pixel(tiles: u16) -> u16 {
    tiles.wrapping_shl(3)
}

/// Convert pixel units to tile units
#[inline]
pub fn pixel_to_tile(pixels: u16) -> u16 {
    pixels >> 3
}
