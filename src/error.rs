use thiserror::Error;

use crate::sim::arena::ChunkType;

/// Invariant violations inside the simulation core.
///
/// These are never expected during normal play. The host must treat any of
/// them as the end of the session.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SimError {
    #[error("arena exhausted: {requested} bytes of {tag:?} requested, {available} available")]
    ArenaExhausted {
        requested: usize,
        available: usize,
        tag: ChunkType,
    },

    #[error("arena chunk table full ({max} chunks)")]
    ChunkTableFull { max: usize },

    #[error("unknown actor type id {0}")]
    UnknownActorType(u16),

    #[error("actor id {0} is not an inventory item")]
    UnknownInventoryItem(u16),

    #[error("tile value {0} cannot be written to the map")]
    InvalidTileValue(u16),

    #[error("unknown weapon type {0}")]
    UnknownWeapon(u8),
}

/// Errors raised while bringing a level up.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("invalid or corrupt level file: header size {declared} exceeds {capacity}")]
    HeaderTooLarge { declared: usize, capacity: usize },

    #[error("truncated data: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("map width {0} is not a power of two")]
    InvalidMapWidth(u16),

    #[error("corrupt actor info table: {0}")]
    CorruptActorInfo(String),

    #[error(transparent)]
    Sim(#[from] SimError),
}

impl LoadError {
    /// True when the failure is an invariant violation rather than bad input
    pub fn is_fatal(&self) -> bool {
        matches!(self, LoadError::Sim(_))
    }
}
