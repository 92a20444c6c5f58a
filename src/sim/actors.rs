//! Actor slots, level spawning and the per-frame actor pass
//!
//! Actors placed in a level are spawned in five passes ordered by the draw
//! index of their type, which fixes the order their sprites are drawn in.
//! Actors spawned later during play take the first free slot instead, so
//! their draw order depends on what happened before.

use serde::{Deserialize, Serialize};

use super::bridge::{Bridge, DrawStyle, Host};
use super::effects::{EffectMovement, spawn_effect};
use super::state::{PlayerState, SimulationState, TILE_SOLID_TOP};
use crate::consts::*;
use crate::error::SimError;
use crate::profile::TutorialMessageId;

/// Draw index values, in spawn pass order
const DRAW_INDEX_PASSES: std::ops::RangeInclusive<i16> = -1..=3;

/// Score number effect shown for 500 points
pub const ACT_SCORE_NUMBER_FX_500: u16 = 124;
pub const SND_ITEM_PICKUP: u8 = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Difficulty {
    Easy = 1,
    #[default]
    Medium = 2,
    Hard = 3,
}

impl Difficulty {
    pub fn level(self) -> u8 {
        self as u8
    }
}

/// One entry of a level's actor list, position in tiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorDescriptor {
    pub id: u16,
    pub x: u16,
    pub y: u16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorState {
    pub id: u16,
    pub frame: u16,
    pub x: u16,
    pub y: u16,
    /// 0 means invincible
    pub health: u16,
    pub score_given: u16,
    pub draw_style: DrawStyle,
    pub deleted: bool,
    /// Keep updating while off screen
    pub always_update: bool,
    /// Switch to `always_update` once seen on screen
    pub remain_active: bool,
    pub gravity_affected: bool,
    /// 0 on ground, 1 airborne, 2..=3 falling slowly, 4 falling fast
    pub gravity_state: u8,
}

impl ActorState {
    pub fn new(id: u16, x: u16, y: u16) -> Self {
        Self {
            id,
            x,
            y,
            ..Default::default()
        }
    }
}

/// True if `id` is a difficulty marker that hides the next actor at the
/// given difficulty
pub fn is_excluded_by_difficulty(id: u16, difficulty: Difficulty) -> bool {
    (id == ACT_META_MEDIUMHARD_ONLY && difficulty == Difficulty::Easy)
        || (id == ACT_META_HARD_ONLY && difficulty != Difficulty::Hard)
}

fn is_player(id: u16) -> bool {
    id == ACT_DUKE_L || id == ACT_DUKE_R
}

/// Put a new actor into `slot`, which is either a deleted slot or the next
/// unused one.
///
/// Returns false if no actor occupies the slot afterwards: difficulty
/// markers and sprite-less types never do, the player start only positions
/// the player, and slots past the capacity are refused.
pub fn spawn_actor_in_slot(
    state: &mut SimulationState,
    slot: usize,
    id: u16,
    x: u16,
    y: u16,
) -> Result<bool, SimError> {
    let num_frames = state.actor_info.num_frames(&state.arena, id)?;

    if id == ACT_META_MEDIUMHARD_ONLY || id == ACT_META_HARD_ONLY {
        return Ok(false);
    }

    if is_player(id) {
        state.player.x = x;
        state.player.y = y;
        state.player.actor_id = id;
        return Ok(false);
    }

    if num_frames == 0 || slot >= MAX_NUM_ACTORS || slot > state.actors.len() {
        return Ok(false);
    }

    let actor = ActorState::new(id, x, y);
    if slot == state.actors.len() {
        state.actors.push(actor);
    } else {
        state.actors[slot] = actor;
    }
    Ok(true)
}

/// Spawn the actors of a level in draw index order.
///
/// Each pass walks the whole list and spawns the entries whose type has the
/// pass's draw index. A difficulty marker that excludes the current
/// difficulty also skips the entry right after it.
pub fn spawn_level_actors(
    state: &mut SimulationState,
    descriptors: &[ActorDescriptor],
    difficulty: Difficulty,
) -> Result<(), SimError> {
    for pass in DRAW_INDEX_PASSES {
        let mut i = 0;
        while i < descriptors.len() {
            let desc = descriptors[i];
            if is_excluded_by_difficulty(desc.id, difficulty) {
                i += 2;
                continue;
            }

            if state.actor_info.draw_index(&state.arena, desc.id)? == pass {
                let slot = state.actors.len();
                spawn_actor_in_slot(state, slot, desc.id, desc.x, desc.y)?;
            }
            i += 1;
        }
    }

    log::debug!("Spawned {} of {} level actors", state.actors.len(), descriptors.len());
    Ok(())
}

/// Spawn an actor during play: reuse the first deleted slot, else append.
/// Returns false when all slots are taken.
pub fn spawn_actor(state: &mut SimulationState, id: u16, x: u16, y: u16) -> Result<bool, SimError> {
    let slot = state
        .actors
        .iter()
        .position(|a| a.deleted)
        .unwrap_or(state.actors.len());
    spawn_actor_in_slot(state, slot, id, x, y)
}

/// True if any part of the sprite frame at (x, y) is inside the viewport
pub fn is_sprite_on_screen(
    state: &SimulationState,
    id: u16,
    frame: u16,
    x: u16,
    y: u16,
) -> Result<bool, SimError> {
    let info = state.actor_info.frame(&state.arena, id, frame)?;
    let left = x as i32 + info.x_offset as i32;
    let bottom = y as i32 + info.y_offset as i32;
    let top = bottom - info.height as i32 + 1;
    let camera_x = state.camera.x as i32;
    let camera_y = state.camera.y as i32;

    Ok(left + info.width as i32 > camera_x
        && left < camera_x + VIEWPORT_WIDTH as i32
        && bottom >= camera_y
        && top < camera_y + state.level.viewport_height as i32)
}

pub fn is_actor_on_screen(state: &SimulationState, handle: usize) -> Result<bool, SimError> {
    let actor = &state.actors[handle];
    is_sprite_on_screen(state, actor.id, actor.frame, actor.x, actor.y)
}

/// Bounding box (left, top, right, bottom) in tiles, inclusive
fn sprite_bounds(state: &SimulationState, id: u16, frame: u16, x: u16, y: u16) -> Result<[i32; 4], SimError> {
    let info = state.actor_info.frame(&state.arena, id, frame)?;
    let left = x as i32 + info.x_offset as i32;
    let bottom = y as i32 + info.y_offset as i32;
    Ok([
        left,
        bottom - info.height as i32 + 1,
        left + info.width as i32 - 1,
        bottom,
    ])
}

fn is_touching_player(state: &SimulationState, actor: &ActorState) -> Result<bool, SimError> {
    let [l1, t1, r1, b1] = sprite_bounds(state, actor.id, actor.frame, actor.x, actor.y)?;
    let player = &state.player;
    let [l2, t2, r2, b2] = sprite_bounds(state, player.actor_id, player.animation_frame, player.x, player.y)?;
    Ok(l1 <= r2 && l2 <= r1 && t1 <= b2 && t2 <= b1)
}

/// True if any tile under the sprite's bottom row at (x, y) is solid on top
fn is_standing_on_ground(state: &SimulationState, actor: &ActorState, y: u16) -> Result<bool, SimError> {
    let info = state.actor_info.frame(&state.arena, actor.id, actor.frame)?;
    let left = actor.x.wrapping_add(info.x_offset as u16);
    for dx in 0..info.width {
        let tile = state.map_tile(left.wrapping_add(dx), y);
        if state.tile_attributes(tile) & TILE_SOLID_TOP != 0 {
            return Ok(true);
        }
    }
    Ok(false)
}

fn apply_gravity(state: &mut SimulationState, handle: usize) -> Result<(), SimError> {
    let mut actor = state.actors[handle];

    // Stuck in the ground: move up one tile
    if is_standing_on_ground(state, &actor, actor.y)? {
        actor.y = actor.y.wrapping_sub(1);
        actor.gravity_state = 0;
    }

    if !is_standing_on_ground(state, &actor, actor.y.wrapping_add(1))? {
        if actor.gravity_state < 4 {
            actor.gravity_state += 1;
        }
        if actor.gravity_state > 1 {
            actor.y = actor.y.wrapping_add(1);
        }
        if actor.gravity_state == 4 {
            if !is_standing_on_ground(state, &actor, actor.y.wrapping_add(1))? {
                actor.y = actor.y.wrapping_add(1);
            } else {
                actor.gravity_state = 0;
            }
        }
    } else {
        actor.gravity_state = 0;
    }

    state.actors[handle] = actor;
    Ok(())
}

/// Interaction between the player and an actor they touch
fn update_actor_player_collision(
    state: &mut SimulationState,
    host: &mut Host<'_>,
    handle: usize,
) -> Result<(), SimError> {
    if state.player.state == PlayerState::Dying {
        return Ok(());
    }

    let actor = state.actors[handle];
    if !is_touching_player(state, &actor)? {
        return Ok(());
    }

    if actor.id == ACT_BLUE_KEY || actor.id == ACT_CIRCUIT_CARD {
        host.play_sound(SND_ITEM_PICKUP);
        host.show_tutorial(if actor.id == ACT_BLUE_KEY {
            TutorialMessageId::FoundBlueKey
        } else {
            TutorialMessageId::FoundCircuitCard
        });
        spawn_effect(state, ACT_SCORE_NUMBER_FX_500, actor.x, actor.y, EffectMovement::ScoreNumber, 0)?;
        host.add_inventory_item(actor.id)?;
        state.give_score(500);
        state.actors[handle].deleted = true;
    }

    if actor.id == ACT_RESPAWN_CHECKPOINT
        && !(state.beacon_activated && state.beacon_x == actor.x && state.beacon_y == actor.y)
    {
        state.activate_beacon(actor.x, actor.y);
        log::info!("Checkpoint activated at ({}, {})", actor.x, actor.y);
    }

    Ok(())
}

/// Update all actors and queue the sprites of those on screen.
///
/// Off-screen actors are skipped unless they are flagged to always update.
/// Actors that fell below the map are deleted.
pub fn update_and_draw_actors(
    state: &mut SimulationState,
    bridge: &mut Bridge,
    host: &mut Host<'_>,
) -> Result<(), SimError> {
    for handle in 0..state.actors.len() {
        let saved_draw_style = state.actors[handle].draw_style;
        if state.actors[handle].deleted {
            continue;
        }

        if is_actor_on_screen(state, handle)? {
            let actor = &mut state.actors[handle];
            if actor.remain_active {
                actor.always_update = true;
            }
        } else if !state.actors[handle].always_update {
            continue;
        }

        if state.actors[handle].gravity_affected {
            apply_gravity(state, handle)?;
        }

        let actor = state.actors[handle];
        if !is_player(actor.id) && actor.y > state.level.map_bottom {
            state.actors[handle].deleted = true;
            continue;
        }

        if actor.draw_style != DrawStyle::Invisible {
            update_actor_player_collision(state, host, handle)?;

            // Drawn this frame even if the collision just deleted it
            if is_actor_on_screen(state, handle)? {
                bridge.draw_sprite(actor.id, actor.frame, actor.x, actor.y, actor.draw_style);
            }
            bridge.show_on_radar(state.player.x, state.player.y, actor.x, actor.y);
        }

        state.actors[handle].draw_style = saved_draw_style;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::LevelMap;
    use crate::profile::{InventoryItemType, PlayerModel};
    use crate::sim::bridge::RecordingServices;
    use crate::sim::state::tests::*;

    fn desc(id: u16, x: u16) -> ActorDescriptor {
        ActorDescriptor { id, x, y: 5 }
    }

    /// Ids with draw index -1, 0, 1, 2, 3 in the test actor info
    fn id_for_draw_index(draw_index: i16) -> u16 {
        100 + (draw_index + 1) as u16
    }

    #[test]
    fn test_spawn_passes_follow_draw_index() {
        let mut state = test_state();
        let list: Vec<_> = [2, -1, 0, 2, 1]
            .iter()
            .enumerate()
            .map(|(i, &d)| desc(id_for_draw_index(d), i as u16))
            .collect();

        spawn_level_actors(&mut state, &list, Difficulty::Medium).unwrap();

        // Positions record the list index each actor came from
        let order: Vec<u16> = state.actors.iter().map(|a| a.x).collect();
        assert_eq!(order, vec![1, 2, 4, 0, 3]);
    }

    #[test]
    fn test_medium_hard_marker_on_easy() {
        let list = vec![
            desc(ACT_META_MEDIUMHARD_ONLY, 0),
            desc(TEST_ACTOR, 1),
            desc(TEST_ACTOR, 2),
        ];

        let mut state = test_state();
        spawn_level_actors(&mut state, &list, Difficulty::Easy).unwrap();
        let xs: Vec<u16> = state.actors.iter().map(|a| a.x).collect();
        assert_eq!(xs, vec![2]);

        let mut state = test_state();
        spawn_level_actors(&mut state, &list, Difficulty::Medium).unwrap();
        assert_eq!(state.actors.len(), 2);
    }

    #[test]
    fn test_hard_marker_needs_hard() {
        let list = vec![desc(ACT_META_HARD_ONLY, 0), desc(TEST_ACTOR, 1)];
        for (difficulty, expected) in [
            (Difficulty::Easy, 0),
            (Difficulty::Medium, 0),
            (Difficulty::Hard, 1),
        ] {
            let mut state = test_state();
            spawn_level_actors(&mut state, &list, difficulty).unwrap();
            assert_eq!(state.actors.len(), expected, "{:?}", difficulty);
            assert!(state.actors.iter().all(|a| a.id == TEST_ACTOR));
        }
    }

    #[test]
    fn test_capacity_exhaustion_is_silent() {
        let mut state = test_state();
        let list: Vec<_> = (0..MAX_NUM_ACTORS as u16 + 10).map(|i| desc(TEST_ACTOR, i)).collect();
        spawn_level_actors(&mut state, &list, Difficulty::Medium).unwrap();
        assert_eq!(state.actors.len(), MAX_NUM_ACTORS);
        assert_eq!(spawn_actor(&mut state, TEST_ACTOR, 0, 0), Ok(false));
    }

    #[test]
    fn test_frameless_types_and_player_take_no_slot() {
        let mut state = test_state();
        let list = vec![
            desc(TEST_FRAMELESS_ACTOR, 0),
            ActorDescriptor {
                id: ACT_DUKE_L,
                x: 7,
                y: 9,
            },
        ];
        spawn_level_actors(&mut state, &list, Difficulty::Hard).unwrap();
        assert!(state.actors.is_empty());
        assert_eq!((state.player.x, state.player.y), (7, 9));
        assert_eq!(state.player.actor_id, ACT_DUKE_L);
    }

    #[test]
    fn test_unknown_type_is_fatal() {
        let mut state = test_state();
        assert_eq!(
            spawn_level_actors(&mut state, &[desc(999, 0)], Difficulty::Easy),
            Err(SimError::UnknownActorType(999))
        );
    }

    #[test]
    fn test_spawn_actor_reuses_deleted_slot() {
        let mut state = test_state();
        for x in 0..3 {
            assert_eq!(spawn_actor(&mut state, TEST_ACTOR, x, 0), Ok(true));
        }
        state.actors[1].deleted = true;
        assert_eq!(spawn_actor(&mut state, TEST_ANIMATED_ACTOR, 50, 0), Ok(true));
        assert_eq!(state.actors.len(), 3);
        assert_eq!(state.actors[1].id, TEST_ANIMATED_ACTOR);
        assert!(!state.actors[1].deleted);
    }

    #[test]
    fn test_sprite_on_screen_bounds() {
        let mut state = test_state();
        state.camera.x = 10;
        state.camera.y = 10;
        // 2x2 sprite, bottom-left at (x, y)
        assert!(is_sprite_on_screen(&state, TEST_ACTOR, 0, 9, 10).unwrap());
        assert!(!is_sprite_on_screen(&state, TEST_ACTOR, 0, 8, 10).unwrap());
        assert!(is_sprite_on_screen(&state, TEST_ACTOR, 0, 41, 29).unwrap());
        assert!(!is_sprite_on_screen(&state, TEST_ACTOR, 0, 42, 20).unwrap());
        assert!(is_sprite_on_screen(&state, TEST_ACTOR, 0, 20, 30).unwrap());
        assert!(!is_sprite_on_screen(&state, TEST_ACTOR, 0, 20, 31).unwrap());
        assert!(!is_sprite_on_screen(&state, TEST_ACTOR, 0, 20, 9).unwrap());
    }

    fn run_actor_pass(state: &mut SimulationState, profile: &mut PlayerModel) -> (Bridge, RecordingServices) {
        let mut bridge = Bridge::default();
        let mut services = RecordingServices::default();
        let mut map = LevelMap::new(128, 255);
        let mut host = Host::new(&mut services, profile, &mut map);
        update_and_draw_actors(state, &mut bridge, &mut host).unwrap();
        (bridge, services)
    }

    #[test]
    fn test_actor_pass_draws_visible_actors() {
        let mut state = test_state();
        state.player.x = 60;
        state.player.y = 60;
        spawn_actor(&mut state, TEST_ACTOR, 5, 5).unwrap();
        spawn_actor(&mut state, TEST_ACTOR, 100, 5).unwrap();
        let mut invisible = ActorState::new(TEST_ACTOR, 6, 6);
        invisible.draw_style = DrawStyle::Invisible;
        state.actors.push(invisible);

        let (bridge, _) = run_actor_pass(&mut state, &mut PlayerModel::new());
        assert_eq!(bridge.sprites.len(), 1);
        assert_eq!((bridge.sprites[0].x, bridge.sprites[0].y), (5, 5));
    }

    #[test]
    fn test_remain_active_becomes_always_update() {
        let mut state = test_state();
        let mut actor = ActorState::new(TEST_ACTOR, 5, 5);
        actor.remain_active = true;
        state.actors.push(actor);

        run_actor_pass(&mut state, &mut PlayerModel::new());
        assert!(state.actors[0].always_update);
    }

    #[test]
    fn test_actor_below_map_is_deleted() {
        let mut state = test_state();
        let mut actor = ActorState::new(TEST_ACTOR, 5, state.level.map_bottom + 1);
        actor.always_update = true;
        state.actors.push(actor);

        let (bridge, _) = run_actor_pass(&mut state, &mut PlayerModel::new());
        assert!(state.actors[0].deleted);
        assert!(bridge.sprites.is_empty());
    }

    #[test]
    fn test_gravity_falls_until_ground() {
        let mut state = test_state();
        let mut map = LevelMap::new(128, 255);
        // Solid floor in row 10
        for x in 0..10 {
            state.set_map_tile(&mut map, 8, x, 10).unwrap();
        }
        let mut actor = ActorState::new(TEST_ACTOR, 2, 3);
        actor.gravity_affected = true;
        state.actors.push(actor);

        let mut ys = vec![];
        for _ in 0..8 {
            run_actor_pass(&mut state, &mut PlayerModel::new());
            ys.push(state.actors[0].y);
        }
        assert_eq!(ys, vec![3, 4, 5, 7, 9, 9, 9, 9]);
        assert_eq!(state.actors[0].gravity_state, 0);
    }

    #[test]
    fn test_key_pickup() {
        let mut state = test_state();
        state.player.x = 10;
        state.player.y = 10;
        spawn_actor(&mut state, ACT_BLUE_KEY, 11, 10).unwrap();

        let mut profile = PlayerModel::new();
        let (bridge, services) = run_actor_pass(&mut state, &mut profile);

        assert!(state.actors[0].deleted);
        assert!(profile.has_item(InventoryItemType::BlueKey));
        assert_eq!(state.player.score, 500);
        assert_eq!(services.sounds, vec![SND_ITEM_PICKUP]);
        assert_eq!(services.messages.len(), 1);
        assert!(state.effects[0].active);
        // Still drawn on the frame it was collected
        assert_eq!(bridge.sprites.len(), 1);
    }

    #[test]
    fn test_touching_checkpoint_activates_beacon() {
        let mut state = test_state();
        state.player.x = 10;
        state.player.y = 10;
        spawn_actor(&mut state, ACT_RESPAWN_CHECKPOINT, 11, 10).unwrap();
        spawn_actor(&mut state, ACT_RESPAWN_CHECKPOINT, 40, 10).unwrap();

        run_actor_pass(&mut state, &mut PlayerModel::new());
        assert!(state.beacon_activated);
        assert_eq!((state.beacon_x, state.beacon_y), (11, 10));
        assert!(!state.actors[0].deleted);
    }

    #[test]
    fn test_radar_dots_for_nearby_actors() {
        let mut state = test_state();
        state.player.x = 20;
        state.player.y = 20;
        let mut far = ActorState::new(TEST_ACTOR, 60, 20);
        far.always_update = true;
        state.actors.push(far);
        state.actors.push(ActorState::new(TEST_ACTOR, 25, 18));

        let (bridge, _) = run_actor_pass(&mut state, &mut PlayerModel::new());
        assert_eq!(bridge.radar_dots, vec![glam::IVec2::new(5, -2)]);
    }
}
