//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - One fixed step per game frame
//! - Table-driven RNG only, reset on every level (re)start
//! - Stable iteration order (by slot index)
//! - No rendering or platform dependencies; output goes through the bridge

pub mod actor_info;
pub mod actors;
pub mod arena;
pub mod bridge;
pub mod effects;
pub mod particles;
pub mod rng;
pub mod state;
pub mod tick;

pub use actor_info::ActorInfoTable;
pub use actors::{ActorDescriptor, ActorState, Difficulty, spawn_actor, spawn_level_actors};
pub use arena::{ChunkHandle, ChunkType, MemoryArena};
pub use bridge::{Bridge, DrawStyle, Host, HostServices, NullServices, RecordingServices};
pub use effects::{EffectMovement, destroy_section, spawn_effect};
pub use particles::{ParticleRecord, ParticleSystem, spawn_particles};
pub use rng::RandomNumberSource;
pub use state::{GameStatus, Player, PlayerState, SimulationState};
pub use tick::{Button, TickInput, damage_player, tick, update_and_draw_game};
