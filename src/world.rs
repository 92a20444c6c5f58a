//! Game session owner
//!
//! `GameWorld` ties the simulation to the host: it keeps the level data around
//! for restarts, syncs the player profile in both directions, and handles the
//! actions that happen between frames (teleport, death, quick save).

use glam::IVec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::{LoadError, SimError};
use crate::level::{LevelData, LevelMap};
use crate::profile::{CheckpointState, CollectableLetterType, PlayerModel, WeaponType};
use crate::settings::Settings;
use crate::sim::actors::Difficulty;
use crate::sim::bridge::{Bridge, Host, HostServices};
use crate::sim::state::{GameStatus, SimulationState};
use crate::sim::tick::{TickInput, relay_input, tick, update_and_draw_game};

/// Raw data a session is started from
#[derive(Debug, Clone, Copy)]
pub struct LevelAssets<'a> {
    pub actor_info: &'a [u8],
    pub level: &'a [u8],
    pub tileset_attributes: &'a [u8],
}

/// Everything needed to resume play exactly where it was saved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickSave {
    pub profile: PlayerModel,
    pub map: LevelMap,
    pub state: SimulationState,
}

/// Copy the profile values the simulation works with into the state
pub fn relay_player_model(state: &mut SimulationState, profile: &PlayerModel) {
    state.player.weapon = profile.weapon.index();
    state.player.score = profile.score;
    state.player.ammo = profile.ammo;
    state.player.health = profile.health;
}

/// Copy the simulation's player values back into the profile
pub fn sync_player_model(state: &SimulationState, profile: &mut PlayerModel) -> Result<(), SimError> {
    profile.weapon = WeaponType::from_index(state.player.weapon)?;
    profile.score = state.player.score;
    profile.ammo = state.player.ammo;
    profile.health = state.player.health;

    let bits = state.player.collected_letters;
    profile.collected_letters = CollectableLetterType::ALL
        .into_iter()
        .filter(|letter| bits & letter.state_bit() != 0)
        .collect();
    Ok(())
}

pub struct GameWorld<S: HostServices> {
    services: S,
    settings: Settings,
    actor_info: Vec<u8>,
    level: LevelData,
    tileset_attributes: Vec<u8>,

    state: SimulationState,
    map: LevelMap,
    bridge: Bridge,

    profile: PlayerModel,
    profile_at_level_start: PlayerModel,
    checkpoint: Option<CheckpointState>,
    quick_save: Option<QuickSave>,
}

impl<S: HostServices> GameWorld<S> {
    /// Start a session on a level and run its first frame.
    ///
    /// `player_position` overrides the start position found in the level.
    pub fn new(
        services: S,
        settings: Settings,
        profile: PlayerModel,
        difficulty: Difficulty,
        assets: LevelAssets<'_>,
        player_position: Option<IVec2>,
    ) -> Result<Self, LoadError> {
        let level = LevelData::parse(assets.level)?;
        let mut state = SimulationState::new(&settings, assets.actor_info)?;

        state.beacon_activated = false;
        state.reset_game_state();
        state.difficulty = difficulty;
        relay_player_model(&mut state, &profile);

        state.load_level(&level, assets.tileset_attributes)?;
        let map = LevelMap::from_level(&level);

        if let Some(position) = player_position {
            state.player.x = position.x as u16;
            state.player.y = position.y as u16;
        }
        state.center_view_on_player();

        let mut world = Self {
            services,
            settings,
            actor_info: assets.actor_info.to_vec(),
            level,
            tileset_attributes: assets.tileset_attributes.to_vec(),
            state,
            map,
            bridge: Bridge::default(),
            profile_at_level_start: profile.clone(),
            profile,
            checkpoint: None,
            quick_save: None,
        };

        relay_input(&mut world.state, &TickInput::default());
        world.update_without_clearing()?;

        log::info!(
            "Session started: {} on {:?}, player at ({}, {})",
            world.level.tileset_name,
            difficulty,
            world.state.player.x,
            world.state.player.y
        );
        Ok(world)
    }

    /// Run one frame of game logic with the given input
    pub fn update_game_logic(&mut self, input: &TickInput) -> Result<(), SimError> {
        let beacon_was_active = self.state.beacon_activated;

        let mut host = Host::new(&mut self.services, &mut self.profile, &mut self.map);
        tick(&mut self.state, &mut self.bridge, &mut host, input)?;
        sync_player_model(&self.state, &mut self.profile)?;

        if self.state.beacon_activated && !beacon_was_active {
            self.checkpoint = Some(self.profile.make_checkpoint());
            log::info!("Checkpoint saved");
        }
        Ok(())
    }

    /// Handle teleport and death requests of the frame just played.
    ///
    /// Called after the host has read the bridge.
    pub fn process_end_of_frame_actions(&mut self) -> Result<(), LoadError> {
        if self.state.is_teleporting {
            self.state.player.y = self.state.teleport_target_y;
            self.state.player.x = self.state.teleport_target_x.wrapping_add(1);
            self.state.center_view_on_player();
            relay_input(&mut self.state, &TickInput::default());
            self.update_without_clearing()?;
            self.state.is_teleporting = false;
        }

        if self.state.status == GameStatus::PlayerDied {
            self.restart_after_death()?;
        }

        self.bridge.set_screen_shift(0);
        Ok(())
    }

    fn restart_after_death(&mut self) -> Result<(), LoadError> {
        self.state.reset_game_state();

        if self.state.beacon_activated {
            if let Some(checkpoint) = &self.checkpoint {
                self.profile.restore_from_checkpoint(checkpoint);
            }
            self.state.player.x = self.state.beacon_x;
            self.state.player.y = self.state.beacon_y;
            self.state.player.actor_id = ACT_DUKE_R;
            log::info!("Respawning at checkpoint ({}, {})", self.state.beacon_x, self.state.beacon_y);
        } else {
            self.profile = self.profile_at_level_start.clone();
            self.state.rebuild_arena(&self.actor_info)?;
            self.state.load_level(&self.level, &self.tileset_attributes)?;
            self.map = LevelMap::from_level(&self.level);
            log::info!("Restarting level");
        }

        relay_player_model(&mut self.state, &self.profile);
        self.state.center_view_on_player();
        relay_input(&mut self.state, &TickInput::default());
        self.update_without_clearing()?;
        Ok(())
    }

    /// One update that adds to the current bridge contents
    fn update_without_clearing(&mut self) -> Result<(), SimError> {
        let mut host = Host::new(&mut self.services, &mut self.profile, &mut self.map);
        update_and_draw_game(&mut self.state, &mut self.bridge, &mut host)
    }

    pub fn can_quick_save(&self) -> bool {
        self.settings.quick_saving_enabled && self.state.status != GameStatus::PlayerDied
    }

    pub fn can_quick_load(&self) -> bool {
        self.settings.quick_saving_enabled && self.quick_save.is_some()
    }

    /// Returns false when quick saving isn't possible right now
    pub fn quick_save(&mut self) -> bool {
        if !self.can_quick_save() {
            return false;
        }

        self.quick_save = Some(QuickSave {
            profile: self.profile.clone(),
            map: self.map.clone(),
            state: self.state.clone(),
        });
        self.services.show_message("Quick saved.");
        log::info!("Quick saved");
        true
    }

    pub fn quick_load(&mut self) -> bool {
        if !self.can_quick_load() {
            return false;
        }
        let Some(save) = self.quick_save.clone() else {
            return false;
        };

        self.profile = save.profile;
        self.map = save.map;
        self.state = save.state;
        self.services.show_message("Quick save restored.");
        log::info!("Quick save restored");
        true
    }

    pub fn level_finished(&self) -> bool {
        matches!(
            self.state.status,
            GameStatus::LevelFinished | GameStatus::EpisodeFinished
        )
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SimulationState {
        &mut self.state
    }

    pub fn profile(&self) -> &PlayerModel {
        &self.profile
    }

    pub fn map(&self) -> &LevelMap {
        &self.map
    }

    pub fn checkpoint(&self) -> Option<&CheckpointState> {
        self.checkpoint.as_ref()
    }

    pub fn services(&self) -> &S {
        &self.services
    }
}
