//! Short-lived visual effects and exploding map sections
//!
//! Effects are sprite animations in a small fixed pool of slots. Exploding
//! map sections turn their tiles into debris that flies along a shared
//! vertical arc while each piece keeps its own horizontal speed.

use serde::{Deserialize, Serialize};

use super::actors::is_sprite_on_screen;
use super::bridge::{Bridge, DrawStyle, Host};
use super::state::SimulationState;
use crate::consts::*;
use crate::error::SimError;

/// Score numbers rise for this many frames
const SCORE_NUMBER_RISE_FRAMES: u16 = 6;
/// Total lifetime of a score number
const SCORE_NUMBER_LIFETIME: u16 = 30;

/// Vertical movement of tile debris, one entry per frame
#[rustfmt::skip]
pub const TILE_DEBRIS_Y_MOVEMENT: [i8; 20] = [
    -3, -3, -2, -2, -1, -1, 0, 0, 1, 1, 2, 2, 3, 3, 3, 3, 3, 3, 3, 3,
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectMovement {
    /// Play the animation once in place
    #[default]
    None,
    /// Rise briefly, then loop the animation until the lifetime ends
    ScoreNumber,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectState {
    pub active: bool,
    pub id: u16,
    pub frame: u16,
    pub x: u16,
    pub y: u16,
    pub movement: EffectMovement,
    /// Frames to wait before the effect appears
    pub spawn_delay: u16,
    pub frames_elapsed: u16,
}

/// A tile flying out of an exploded map section, position in tiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileDebris {
    pub x: u16,
    pub y: u16,
    pub x_velocity: i16,
    pub tile_index: u16,
}

/// Start an effect in the first free slot. Returns false when all slots are
/// busy.
pub fn spawn_effect(
    state: &mut SimulationState,
    id: u16,
    x: u16,
    y: u16,
    movement: EffectMovement,
    spawn_delay: u16,
) -> Result<bool, SimError> {
    // Validates the id even when no slot is free
    state.actor_info.num_frames(&state.arena, id)?;

    let Some(slot) = state.effects.iter_mut().find(|e| !e.active) else {
        return Ok(false);
    };
    *slot = EffectState {
        active: true,
        id,
        frame: 0,
        x,
        y,
        movement,
        spawn_delay,
        frames_elapsed: 0,
    };
    Ok(true)
}

pub fn update_and_draw_effects(state: &mut SimulationState, bridge: &mut Bridge) -> Result<(), SimError> {
    for index in 0..state.effects.len() {
        let mut effect = state.effects[index];
        if !effect.active {
            continue;
        }

        if effect.spawn_delay > 0 {
            effect.spawn_delay -= 1;
            state.effects[index] = effect;
            continue;
        }

        if is_sprite_on_screen(state, effect.id, effect.frame, effect.x, effect.y)? {
            bridge.draw_sprite(effect.id, effect.frame, effect.x, effect.y, DrawStyle::Normal);
        }

        let num_frames = state.actor_info.num_frames(&state.arena, effect.id)?;
        effect.frames_elapsed += 1;

        match effect.movement {
            EffectMovement::None => {
                effect.frame += 1;
                if effect.frame >= num_frames {
                    effect.active = false;
                }
            }
            EffectMovement::ScoreNumber => {
                if effect.frames_elapsed <= SCORE_NUMBER_RISE_FRAMES {
                    effect.y = effect.y.wrapping_sub(1);
                }
                effect.frame += 1;
                if effect.frame >= num_frames {
                    effect.frame = 0;
                }
                if effect.frames_elapsed == SCORE_NUMBER_LIFETIME {
                    effect.active = false;
                }
            }
        }

        state.effects[index] = effect;
    }

    Ok(())
}

/// Blow up the map section [left, right] x [top, bottom] (inclusive).
///
/// Every non-empty tile becomes a piece of debris and is cleared in the map
/// and in the host's render map. Debris of a previous explosion still in
/// flight is dropped.
pub fn destroy_section(
    state: &mut SimulationState,
    host: &mut Host<'_>,
    left: u16,
    top: u16,
    right: u16,
    bottom: u16,
) -> Result<(), SimError> {
    state.tile_debris.clear();

    for y in top..=bottom {
        for x in left..=right {
            let tile = state.map_tile(x, y);
            if tile != 0 && state.tile_debris.len() < MAX_NUM_TILE_DEBRIS {
                let x_velocity = (state.rng.next() % 5) as i16 - 2;
                state.tile_debris.push(TileDebris {
                    x,
                    y,
                    x_velocity,
                    tile_index: tile,
                });
            }
            state.set_map_tile(host.map, 0, x, y)?;
        }
    }

    state.exploding_section_ticks = 1;
    log::debug!(
        "Destroyed map section ({}, {})-({}, {}): {} debris tiles",
        left,
        top,
        right,
        bottom,
        state.tile_debris.len()
    );
    Ok(())
}

/// Move the debris of the current explosion and queue the visible pieces
pub fn update_and_draw_tile_debris(state: &mut SimulationState, bridge: &mut Bridge) {
    if state.exploding_section_ticks == 0 {
        return;
    }

    let step = TILE_DEBRIS_Y_MOVEMENT[state.exploding_section_ticks as usize - 1] as i16 as u16;
    let (camera_x, camera_y) = (state.camera.x, state.camera.y);
    let viewport_height = state.level.viewport_height as i16;

    for debris in &mut state.tile_debris {
        debris.x = debris.x.wrapping_add(debris.x_velocity as u16);
        debris.y = debris.y.wrapping_add(step);

        let screen_x = debris.x.wrapping_sub(camera_x);
        let screen_y = debris.y.wrapping_sub(camera_y);
        if (0..VIEWPORT_WIDTH as i16).contains(&(screen_x as i16))
            && (0..viewport_height).contains(&(screen_y as i16))
        {
            bridge.draw_tile_debris(debris.tile_index, screen_x, screen_y);
        }
    }

    state.exploding_section_ticks += 1;
    if state.exploding_section_ticks as usize > TILE_DEBRIS_Y_MOVEMENT.len() {
        state.exploding_section_ticks = 0;
        state.tile_debris.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::LevelMap;
    use crate::profile::PlayerModel;
    use crate::sim::bridge::NullServices;
    use crate::sim::state::tests::*;

    /// Blow up a section of `map`, going through the host like game logic does
    fn destroy(state: &mut SimulationState, map: &mut LevelMap, left: u16, top: u16, right: u16, bottom: u16) {
        let mut services = NullServices;
        let mut profile = PlayerModel::new();
        let mut host = Host::new(&mut services, &mut profile, map);
        destroy_section(state, &mut host, left, top, right, bottom).unwrap();
    }

    #[test]
    fn test_spawn_uses_free_slots() {
        let mut state = test_state();
        for _ in 0..MAX_NUM_EFFECTS {
            assert_eq!(
                spawn_effect(&mut state, TEST_ACTOR, 1, 1, EffectMovement::None, 0),
                Ok(true)
            );
        }
        assert_eq!(
            spawn_effect(&mut state, TEST_ACTOR, 1, 1, EffectMovement::None, 0),
            Ok(false)
        );
        assert_eq!(
            spawn_effect(&mut state, 999, 1, 1, EffectMovement::None, 0),
            Err(SimError::UnknownActorType(999))
        );
    }

    #[test]
    fn test_animation_plays_once() {
        let mut state = test_state();
        let mut bridge = Bridge::default();
        spawn_effect(&mut state, TEST_ANIMATED_ACTOR, 5, 5, EffectMovement::None, 2).unwrap();

        let mut frames = vec![];
        for _ in 0..8 {
            bridge.clear_frame();
            update_and_draw_effects(&mut state, &mut bridge).unwrap();
            frames.extend(bridge.sprites.iter().map(|s| s.frame));
        }
        // Two frames of delay, then frames 0..4 once
        assert_eq!(frames, vec![0, 1, 2, 3]);
        assert!(!state.effects[0].active);
    }

    #[test]
    fn test_score_number_rises_then_expires() {
        let mut state = test_state();
        let mut bridge = Bridge::default();
        spawn_effect(&mut state, TEST_ACTOR, 5, 15, EffectMovement::ScoreNumber, 0).unwrap();

        for _ in 0..SCORE_NUMBER_LIFETIME - 1 {
            update_and_draw_effects(&mut state, &mut bridge).unwrap();
        }
        assert!(state.effects[0].active);
        assert_eq!(state.effects[0].y, 15 - SCORE_NUMBER_RISE_FRAMES);

        update_and_draw_effects(&mut state, &mut bridge).unwrap();
        assert!(!state.effects[0].active);
    }

    #[test]
    fn test_destroy_section_creates_debris() {
        let mut state = test_state();
        let mut map = LevelMap::new(128, 255);
        state.set_map_tile(&mut map, 16, 4, 4).unwrap();
        state.set_map_tile(&mut map, 24, 5, 4).unwrap();

        destroy(&mut state, &mut map, 3, 3, 5, 5);

        assert_eq!(state.tile_debris.len(), 2);
        assert_eq!(state.tile_debris[1].tile_index, 24);
        assert_eq!(state.map_tile(4, 4), 0);
        assert_eq!(map.tile_at(5, 4), 0);
        assert_eq!(state.rng.index(), 2);
        assert!(state.tile_debris.iter().all(|d| (-2..=2).contains(&d.x_velocity)));
    }

    #[test]
    fn test_debris_flies_then_clears() {
        let mut state = test_state();
        let mut map = LevelMap::new(128, 255);
        let mut bridge = Bridge::default();
        state.set_map_tile(&mut map, 16, 10, 10).unwrap();
        destroy(&mut state, &mut map, 10, 10, 10, 10);
        let x_velocity = state.tile_debris[0].x_velocity;

        update_and_draw_tile_debris(&mut state, &mut bridge);
        assert_eq!(
            bridge.tile_debris[0],
            crate::sim::bridge::TileDebrisDrawCmd {
                tile_index: 16,
                x: (10 + x_velocity) as u16,
                y: 7,
            }
        );

        for _ in 1..TILE_DEBRIS_Y_MOVEMENT.len() {
            update_and_draw_tile_debris(&mut state, &mut bridge);
        }
        assert_eq!(state.exploding_section_ticks, 0);
        assert!(state.tile_debris.is_empty());
    }
}
