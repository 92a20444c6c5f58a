//! Simulation state
//!
//! Everything the per-frame simulation reads or writes lives in
//! [`SimulationState`]. Subsystems receive it by exclusive reference and keep
//! no state of their own, so a clone of this struct is a complete snapshot.

use serde::{Deserialize, Serialize};

use super::actor_info::ActorInfoTable;
use super::actors::{ActorState, Difficulty, spawn_level_actors};
use super::arena::{ChunkHandle, ChunkType, MemoryArena};
use super::effects::{EffectState, TileDebris};
use super::particles::{ParticleSystem, clear_particles};
use super::rng::RandomNumberSource;
use crate::consts::*;
use crate::error::{LoadError, SimError};
use crate::level::{LevelData, LevelFlags, LevelMap};
use crate::settings::Settings;

/// Tileset attribute bits
pub const TILE_SOLID_TOP: u16 = 0x01;
pub const TILE_SOLID_BOTTOM: u16 = 0x02;
pub const TILE_SOLID_RIGHT: u16 = 0x04;
pub const TILE_SOLID_LEFT: u16 = 0x08;

/// Outcome of the frames played so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    #[default]
    Running,
    PlayerDied,
    LevelFinished,
    EpisodeFinished,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerState {
    #[default]
    Normal,
    Dying,
    UsingShip,
}

/// Digital input as relayed by the host for the current frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputState {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub fire: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Position in tiles, bottom-left of the sprite
    pub x: u16,
    pub y: u16,
    pub health: u8,
    pub score: u32,
    pub ammo: u8,
    pub weapon: u8,
    pub state: PlayerState,
    pub mercy_frames_left: u8,
    pub cloak_time_left: u16,
    pub rapid_fire_time_left: u16,
    /// Facing: ACT_DUKE_L or ACT_DUKE_R
    pub actor_id: u16,
    pub animation_frame: u16,
    /// Bits 0x100..=0x1000 mark the letters N, U, K, E, M
    pub collected_letters: u16,
    pub death_animation_step: u8,
    pub killed_in_ship: bool,
    pub on_elevator: bool,
    pub airlock_death_step: u8,
    pub body_explosion_step: u8,
    pub interact_anim_ticks: u8,
    pub block_looking_up: bool,
}

/// Top-left corner of the visible map area, in tiles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Camera {
    pub x: u16,
    pub y: u16,
}

/// Metadata of the loaded level
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelInfo {
    pub header: Vec<u8>,
    pub actor_list_size: u16,
    pub map_width: u16,
    pub map_width_shift: u16,
    pub map_bottom: u16,
    pub viewport_height: u8,
    pub flags: LevelFlags,
    pub map_data: Option<ChunkHandle>,
    pub tileset_attributes: Option<ChunkHandle>,
    pub episode: u8,
    pub level: u8,
}

/// Bonus bookkeeping of the current level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelCounters {
    pub cameras_destroyed: u16,
    pub cameras_in_level: u16,
    pub weapons_collected: u16,
    pub weapons_in_level: u16,
    pub merch_collected: u16,
    pub merch_in_level: u16,
    pub turrets_destroyed: u16,
    pub turrets_in_level: u16,
    pub orbs_left: u16,
    pub bomb_boxes_left: u16,
    pub radar_dishes_left: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerShot {
    pub active: bool,
    pub id: u16,
    pub x: u16,
    pub y: u16,
    pub direction: u16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovingMapPart {
    /// 0 = unused slot
    pub kind: u16,
    pub left: u16,
    pub top: u16,
    pub right: u16,
    pub bottom: u16,
}

/// Complete mutable simulation state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    pub arena: MemoryArena,
    pub rng: RandomNumberSource,
    pub particles: ParticleSystem,
    pub actor_info: ActorInfoTable,

    pub player: Player,
    pub camera: Camera,
    pub level: LevelInfo,
    pub input: InputState,
    pub difficulty: Difficulty,
    pub status: GameStatus,

    pub actors: Vec<ActorState>,
    pub effects: Vec<EffectState>,
    pub player_shots: Vec<PlayerShot>,
    pub moving_map_parts: Vec<MovingMapPart>,
    pub num_moving_map_parts: u8,
    pub tile_debris: Vec<TileDebris>,
    pub exploding_section_ticks: u8,

    pub counters: LevelCounters,
    pub boss_activated: bool,
    pub player_took_damage: bool,
    pub request_unlock_next_door: bool,
    pub request_unlock_next_force_field: bool,
    pub water_areas_present: bool,
    pub reactor_destruction_step: u8,
    pub use_secondary_backdrop: bool,
    pub flash_screen: bool,
    pub earthquake_countdown: u8,
    pub earthquake_threshold: u8,

    /// Respawn checkpoint
    pub beacon_activated: bool,
    pub beacon_x: u16,
    pub beacon_y: u16,

    pub is_teleporting: bool,
    pub teleport_target_x: u16,
    pub teleport_target_y: u16,
}

impl SimulationState {
    /// Set up the arena, particle buffers and actor info for a session
    pub fn new(settings: &Settings, actor_info: &[u8]) -> Result<Self, LoadError> {
        let mut arena = MemoryArena::new(settings.arena_capacity, settings.arena_max_chunks);
        let particles = ParticleSystem::init(&mut arena)?;
        let actor_info = ActorInfoTable::load(&mut arena, actor_info)?;

        Ok(Self {
            arena,
            rng: RandomNumberSource::new(),
            particles,
            actor_info,
            player: Player {
                health: PLAYER_MAX_HEALTH,
                actor_id: ACT_DUKE_R,
                ..Default::default()
            },
            camera: Camera::default(),
            level: LevelInfo::default(),
            input: InputState::default(),
            difficulty: Difficulty::default(),
            status: GameStatus::Running,
            actors: Vec::with_capacity(MAX_NUM_ACTORS),
            effects: vec![EffectState::default(); MAX_NUM_EFFECTS],
            player_shots: vec![PlayerShot::default(); MAX_NUM_PLAYER_SHOTS],
            moving_map_parts: vec![MovingMapPart::default(); MAX_NUM_MOVING_MAP_PARTS],
            num_moving_map_parts: 0,
            tile_debris: Vec::new(),
            exploding_section_ticks: 0,
            counters: LevelCounters::default(),
            boss_activated: false,
            player_took_damage: false,
            request_unlock_next_door: false,
            request_unlock_next_force_field: false,
            water_areas_present: false,
            reactor_destruction_step: 0,
            use_secondary_backdrop: false,
            flash_screen: false,
            earthquake_countdown: 0,
            earthquake_threshold: 0,
            beacon_activated: false,
            beacon_x: 0,
            beacon_y: 0,
            is_teleporting: false,
            teleport_target_x: 0,
            teleport_target_y: 0,
        })
    }

    /// Release the whole arena and allocate the session chunks again.
    ///
    /// Level chunks are gone afterwards; a level must be loaded next.
    pub fn rebuild_arena(&mut self, actor_info: &[u8]) -> Result<(), LoadError> {
        self.arena.reset();
        self.particles = ParticleSystem::init(&mut self.arena)?;
        self.actor_info = ActorInfoTable::load(&mut self.arena, actor_info)?;
        self.level.map_data = None;
        self.level.tileset_attributes = None;
        log::info!("Arena reset, {} bytes in use", self.arena.used());
        Ok(())
    }

    /// Reinitialize for a level (re)start.
    ///
    /// When the respawn beacon is active, the level's progress (actors,
    /// counters, health, collected letters, moving map parts) is kept.
    pub fn reset_game_state(&mut self) {
        self.status = GameStatus::Running;
        self.boss_activated = false;
        self.player.body_explosion_step = 0;
        self.player.on_elevator = false;
        self.flash_screen = false;
        self.player.killed_in_ship = false;
        self.rng.reset();
        self.player.animation_frame = 0;
        self.player.state = PlayerState::Normal;
        self.player.mercy_frames_left = INITIAL_MERCY_FRAMES;
        self.is_teleporting = false;
        self.exploding_section_ticks = 0;
        self.player.interact_anim_ticks = 0;
        self.player.block_looking_up = false;
        self.earthquake_countdown = 0;
        self.earthquake_threshold = 0;

        self.reset_effects_and_player_shots();
        clear_particles(self);

        if !self.beacon_activated {
            self.player_took_damage = false;

            self.num_moving_map_parts = 0;
            for part in &mut self.moving_map_parts {
                part.kind = 0;
            }

            self.request_unlock_next_door = false;
            self.player.airlock_death_step = 0;
            self.request_unlock_next_force_field = false;
            self.water_areas_present = false;
            self.player.collected_letters = 0;
            self.player.rapid_fire_time_left = 0;
            self.reactor_destruction_step = 0;
            self.use_secondary_backdrop = false;
            self.player.cloak_time_left = 0;
            self.counters = LevelCounters::default();
            self.actors.clear();
            self.player.health = PLAYER_MAX_HEALTH;
        }
    }

    pub fn reset_effects_and_player_shots(&mut self) {
        for effect in &mut self.effects {
            effect.active = false;
        }
        for shot in &mut self.player_shots {
            shot.active = false;
        }
    }

    /// Place the camera so the player is centered, clamped to the map
    pub fn center_view_on_player(&mut self) {
        let map_width = self.level.map_width as i32;
        let map_bottom = self.level.map_bottom as i32;

        let mut x = self.player.x.wrapping_sub(VIEWPORT_WIDTH / 2 - 1);
        if (x as i16) < 0 {
            x = 0;
        } else if x as i32 > map_width - VIEWPORT_WIDTH as i32 {
            x = (map_width - VIEWPORT_WIDTH as i32) as u16;
        }

        let mut y = self.player.y.wrapping_sub(VIEWPORT_HEIGHT - 1);
        if (y as i16) < 0 {
            y = 0;
        } else if y as i32 > map_bottom - (VIEWPORT_HEIGHT as i32 + 1) {
            y = (map_bottom - (VIEWPORT_HEIGHT as i32 + 1)) as u16;
        }

        self.camera = Camera { x, y };
    }

    fn map_index(&self, x: u16, y: u16) -> usize {
        x as usize + ((y as usize) << self.level.map_width_shift)
    }

    /// Tile value at (x, y). Rows above the map and cells past the map data
    /// read as 0.
    pub fn map_tile(&self, x: u16, y: u16) -> u16 {
        if (y as i16) < 0 {
            return 0;
        }
        let Some(handle) = self.level.map_data else {
            return 0;
        };
        let index = self.map_index(x, y);
        if index < self.arena.word_len(handle) {
            self.arena.word(handle, index)
        } else {
            0
        }
    }

    /// Write a tile value and mirror it into the render map
    pub fn set_map_tile(&mut self, map: &mut LevelMap, tile: u16, x: u16, y: u16) -> Result<(), SimError> {
        if tile >= MAX_TILE_VALUE {
            return Err(SimError::InvalidTileValue(tile));
        }
        if let Some(handle) = self.level.map_data {
            let index = self.map_index(x, y);
            if index < self.arena.word_len(handle) {
                self.arena.set_word(handle, index, tile);
            }
        }
        map.set_tile_at(x, y, tile / 8);
        Ok(())
    }

    /// Collision attribute bits of a tile value
    pub fn tile_attributes(&self, tile: u16) -> u16 {
        let Some(handle) = self.level.tileset_attributes else {
            return 0;
        };
        let index = (tile / 8) as usize;
        if index < self.arena.word_len(handle) {
            self.arena.word(handle, index)
        } else {
            0
        }
    }

    pub fn give_score(&mut self, score: u16) {
        self.player.score = self.player.score.wrapping_add(score as u32);
    }

    /// Turn on the respawn checkpoint at tile (x, y)
    pub fn activate_beacon(&mut self, x: u16, y: u16) {
        self.beacon_activated = true;
        self.beacon_x = x;
        self.beacon_y = y;
    }

    pub fn request_teleport(&mut self, x: u16, y: u16) {
        self.is_teleporting = true;
        self.teleport_target_x = x;
        self.teleport_target_y = y;
    }

    /// Copy the level into the arena and spawn its actors
    pub fn load_level(&mut self, level: &LevelData, tileset_attributes: &[u8]) -> Result<(), LoadError> {
        if tileset_attributes.len() < TILESET_ATTRIBUTES_SIZE {
            return Err(LoadError::Truncated {
                expected: TILESET_ATTRIBUTES_SIZE,
                actual: tileset_attributes.len(),
            });
        }

        self.level.header = level.header.clone();
        self.level.actor_list_size = level.actor_list_size;

        let map_data = self.arena.push_chunk(MAP_DATA_SIZE, ChunkType::MapData)?;
        self.arena.bytes_mut(map_data).copy_from_slice(&level.map_data);

        let attributes = self.arena.push_chunk(TILESET_ATTRIBUTES_SIZE, ChunkType::Czone)?;
        self.arena
            .bytes_mut(attributes)
            .copy_from_slice(&tileset_attributes[..TILESET_ATTRIBUTES_SIZE]);

        self.level.map_data = Some(map_data);
        self.level.tileset_attributes = Some(attributes);
        self.level.map_width = level.map_width;
        self.level.map_width_shift = level.map_width.trailing_zeros() as u16;
        self.level.map_bottom = level.map_height() - 1;
        self.level.viewport_height = VIEWPORT_HEIGHT as u8;
        self.level.flags = level.flags;

        spawn_level_actors(self, &level.actors, self.difficulty)?;

        log::info!(
            "Level loaded: {}x{} tiles, {} actors spawned",
            level.map_width,
            level.map_height(),
            self.actors.len()
        );
        Ok(())
    }
}
