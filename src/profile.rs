//! Player profile shared with the host shell
//!
//! The profile outlives a single level: it carries score, health, ammo and
//! weapon between levels, plus the inventory, collected letters and which
//! tutorial hints were already shown. The simulation keeps its own copy of
//! the numeric fields and syncs them back after every frame.

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::SimError;

/// Ammo of a freshly picked up special weapon
pub const MAX_AMMO: u8 = 32;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeaponType {
    #[default]
    Normal,
    Laser,
    Rocket,
    FlameThrower,
}

impl WeaponType {
    pub fn from_index(index: u8) -> Result<Self, SimError> {
        match index {
            0 => Ok(Self::Normal),
            1 => Ok(Self::Laser),
            2 => Ok(Self::Rocket),
            3 => Ok(Self::FlameThrower),
            _ => Err(SimError::UnknownWeapon(index)),
        }
    }

    pub fn index(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryItemType {
    CircuitBoard,
    BlueKey,
    RapidFire,
    SpecialHintGlobe,
    CloakingDevice,
}

impl InventoryItemType {
    /// Map the actor id used by game logic to an inventory item.
    ///
    /// Only five ids name inventory items; anything else means the caller is
    /// broken.
    pub fn from_actor_id(id: u16) -> Result<Self, SimError> {
        match id {
            ACT_CIRCUIT_CARD => Ok(Self::CircuitBoard),
            ACT_BLUE_KEY => Ok(Self::BlueKey),
            ACT_RAPID_FIRE_ICON => Ok(Self::RapidFire),
            ACT_SPECIAL_HINT_GLOBE_ICON => Ok(Self::SpecialHintGlobe),
            ACT_CLOAKING_DEVICE_ICON => Ok(Self::CloakingDevice),
            _ => Err(SimError::UnknownInventoryItem(id)),
        }
    }
}

/// Letters of the bonus word, in the order that earns the big bonus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectableLetterType {
    N,
    U,
    K,
    E,
    M,
}

impl CollectableLetterType {
    pub const ALL: [Self; 5] = [Self::N, Self::U, Self::K, Self::E, Self::M];

    /// Bit used for this letter in the simulation's letter word
    pub fn state_bit(self) -> u16 {
        0x100 << self as u16
    }
}

/// One-time hint messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TutorialMessageId {
    FoundBlueKey,
    FoundCircuitCard,
    FoundRapidFire,
    CloakNeeded,
    HintMachine,
}

impl TutorialMessageId {
    pub fn text(self) -> &'static str {
        match self {
            Self::FoundBlueKey => "FIND THE DOOR THAT*THIS KEY OPENS.",
            Self::FoundCircuitCard => "USE THE CARD TO TURN OFF*FORCE FIELDS.",
            Self::FoundRapidFire => "HOLD DOWN YOUR FIRE BUTTON FOR*RAPID FIRE.",
            Self::CloakNeeded => "OUCH, YOU NEED TO FIND THE CLOAKING*DEVICE TO DISABLE THIS FORCEFIELD.",
            Self::HintMachine => {
                "THIS DEVICE WILL GIVE SPECIFIC HINTS.*FIND THE SPECIAL BLUE GLOBE AND*BRING IT BACK HERE."
            }
        }
    }
}

/// Set of tutorial messages already shown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TutorialMessageState {
    shown: u32,
}

impl TutorialMessageState {
    pub fn has_been_shown(&self, id: TutorialMessageId) -> bool {
        self.shown & (1 << id as u32) != 0
    }

    pub fn mark_as_shown(&mut self, id: TutorialMessageId) {
        self.shown |= 1 << id as u32;
    }
}

/// Profile fields restored when respawning at a checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointState {
    pub weapon: WeaponType,
    pub ammo: u8,
    pub health: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerModel {
    pub score: u32,
    pub health: u8,
    pub ammo: u8,
    pub weapon: WeaponType,
    pub inventory: Vec<InventoryItemType>,
    pub collected_letters: Vec<CollectableLetterType>,
    pub tutorial_messages: TutorialMessageState,
}

impl Default for PlayerModel {
    fn default() -> Self {
        Self {
            score: 0,
            health: PLAYER_MAX_HEALTH,
            ammo: MAX_AMMO,
            weapon: WeaponType::Normal,
            inventory: Vec::new(),
            collected_letters: Vec::new(),
            tutorial_messages: TutorialMessageState::default(),
        }
    }
}

impl PlayerModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_item(&self, item: InventoryItemType) -> bool {
        self.inventory.contains(&item)
    }

    pub fn give_item(&mut self, item: InventoryItemType) {
        self.inventory.push(item);
    }

    /// Remove one instance of `item`. Returns false if there was none.
    pub fn remove_item(&mut self, item: InventoryItemType) -> bool {
        match self.inventory.iter().position(|&i| i == item) {
            Some(index) => {
                self.inventory.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn make_checkpoint(&self) -> CheckpointState {
        CheckpointState {
            weapon: self.weapon,
            ammo: self.ammo,
            health: self.health,
        }
    }

    pub fn restore_from_checkpoint(&mut self, checkpoint: &CheckpointState) {
        self.weapon = checkpoint.weapon;
        self.ammo = checkpoint.ammo;
        self.health = checkpoint.health;
    }
}
