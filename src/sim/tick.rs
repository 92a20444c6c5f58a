//! Per-frame simulation step
//!
//! The host relays input, calls [`tick`] once per game frame and then reads
//! the bridge. Frame order: earthquake, player, actors, effects, tile
//! debris, particles.

use serde::{Deserialize, Serialize};

use super::actors::update_and_draw_actors;
use super::bridge::{Bridge, DrawStyle, Host};
use super::effects::{update_and_draw_effects, update_and_draw_tile_debris};
use super::particles::update_and_draw_particles;
use super::state::{
    GameStatus, InputState, PlayerState, SimulationState, TILE_SOLID_LEFT, TILE_SOLID_RIGHT,
};
use crate::consts::*;
use crate::error::SimError;

/// State of a digital button in this frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    /// Held down
    pub pressed: bool,
    /// Went down since the previous frame
    pub triggered: bool,
}

/// Input commands for a single frame (deterministic)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickInput {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub jump: Button,
    pub fire: Button,
}

/// Copy host input into the simulation. A button counts as active when held
/// or freshly pressed.
pub fn relay_input(state: &mut SimulationState, input: &TickInput) {
    state.input = InputState {
        up: input.up,
        down: input.down,
        left: input.left,
        right: input.right,
        jump: input.jump.pressed || input.jump.triggered,
        fire: input.fire.pressed || input.fire.triggered,
    };
}

/// Advance the simulation by one frame.
///
/// The bridge is cleared first, so afterwards it holds exactly this frame's
/// output.
pub fn tick(
    state: &mut SimulationState,
    bridge: &mut Bridge,
    host: &mut Host<'_>,
    input: &TickInput,
) -> Result<(), SimError> {
    bridge.clear_frame();
    relay_input(state, input);
    update_and_draw_game(state, bridge, host)
}

/// Run all subsystems once, appending to whatever the bridge already holds
pub fn update_and_draw_game(
    state: &mut SimulationState,
    bridge: &mut Bridge,
    host: &mut Host<'_>,
) -> Result<(), SimError> {
    update_earthquake(state, bridge, host);
    update_player(state, bridge)?;
    update_and_draw_actors(state, bridge, host)?;
    update_and_draw_effects(state, bridge)?;
    update_and_draw_tile_debris(state, bridge);
    update_and_draw_particles(state, bridge);
    Ok(())
}

/// Hurt the player by one point unless cloaked, in mercy frames or already
/// dying.
pub fn damage_player(state: &mut SimulationState, host: &mut Host<'_>) {
    let player = &mut state.player;
    if player.cloak_time_left != 0 || player.mercy_frames_left != 0 || player.state == PlayerState::Dying {
        return;
    }

    player.health = player.health.wrapping_sub(1);
    state.player_took_damage = true;

    if player.health > 0 && player.health < 12 {
        player.mercy_frames_left = 50 - state.difficulty.level() * 10;
        host.play_sound(SND_DUKE_PAIN);
    } else {
        if player.state == PlayerState::UsingShip {
            player.killed_in_ship = true;
        }
        player.state = PlayerState::Dying;
        player.death_animation_step = 0;
        host.play_sound(SND_DUKE_DEATH);
    }
}

/// Random screen shaking in levels with the earthquake flag
pub fn update_earthquake(state: &mut SimulationState, bridge: &mut Bridge, host: &mut Host<'_>) {
    if !state.level.flags.earthquake {
        return;
    }

    if state.earthquake_countdown == 0 {
        state.earthquake_countdown = state.rng.next();
        state.earthquake_threshold = state.rng.next() % 50;
    }

    if state.earthquake_countdown < state.earthquake_threshold {
        if state.earthquake_countdown + 1 == state.earthquake_threshold {
            host.play_sound(SND_EARTHQUAKE);
        }
        bridge.set_screen_shift(state.rng.next() % 4);
    }

    state.earthquake_countdown = state.earthquake_countdown.wrapping_sub(1);
}

/// True if any tile in `column` next to the player has the given solid side
fn is_wall(state: &SimulationState, column: u16, solid_side: u16) -> bool {
    (0..PLAYER_HEIGHT).any(|dy| {
        let tile = state.map_tile(column, state.player.y.wrapping_sub(dy));
        state.tile_attributes(tile) & solid_side != 0
    })
}

/// Timers, walking, death animation, camera and the player sprite
pub fn update_player(state: &mut SimulationState, bridge: &mut Bridge) -> Result<(), SimError> {
    if state.player.state == PlayerState::Dying {
        if state.player.death_animation_step < PLAYER_DEATH_ANIMATION_STEPS {
            state.player.death_animation_step += 1;
        }
        if state.player.death_animation_step >= PLAYER_DEATH_ANIMATION_STEPS {
            if state.status == GameStatus::Running {
                log::info!("Player died");
            }
            state.status = GameStatus::PlayerDied;
        }
        return Ok(());
    }

    let player = &mut state.player;
    player.mercy_frames_left = player.mercy_frames_left.saturating_sub(1);
    player.cloak_time_left = player.cloak_time_left.saturating_sub(1);
    player.rapid_fire_time_left = player.rapid_fire_time_left.saturating_sub(1);

    let input = state.input;
    if input.left != input.right {
        let (actor_id, column, solid_side) = if input.left {
            (ACT_DUKE_L, state.player.x.wrapping_sub(1), TILE_SOLID_RIGHT)
        } else {
            (ACT_DUKE_R, state.player.x.wrapping_add(PLAYER_WIDTH), TILE_SOLID_LEFT)
        };
        state.player.actor_id = actor_id;
        if !is_wall(state, column, solid_side) {
            state.player.x = if input.left {
                state.player.x.wrapping_sub(1)
            } else {
                state.player.x.wrapping_add(1)
            };
        }
        state.player.animation_frame = state.player.animation_frame % 3 + 1;
    } else {
        state.player.animation_frame = 0;
    }

    state.center_view_on_player();

    // Blink while invulnerable after taking damage
    let player = &state.player;
    if player.mercy_frames_left % 2 == 0 {
        let style = if player.cloak_time_left > 0 {
            DrawStyle::Translucent
        } else {
            DrawStyle::Normal
        };
        bridge.draw_sprite(player.actor_id, player.animation_frame, player.x, player.y, style);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::LevelMap;
    use crate::profile::PlayerModel;
    use crate::sim::actors::Difficulty;
    use crate::sim::bridge::RecordingServices;
    use crate::sim::particles::spawn_particles;
    use crate::sim::rng::RANDOM_NUMBER_TABLE;
    use crate::sim::state::tests::test_state;

    struct Harness {
        services: RecordingServices,
        profile: PlayerModel,
        map: LevelMap,
        bridge: Bridge,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                services: RecordingServices::default(),
                profile: PlayerModel::new(),
                map: LevelMap::new(128, 255),
                bridge: Bridge::default(),
            }
        }

        fn tick(&mut self, state: &mut SimulationState, input: &TickInput) {
            let mut host = Host::new(&mut self.services, &mut self.profile, &mut self.map);
            tick(state, &mut self.bridge, &mut host, input).unwrap();
        }

        fn damage(&mut self, state: &mut SimulationState) {
            let mut host = Host::new(&mut self.services, &mut self.profile, &mut self.map);
            damage_player(state, &mut host);
        }
    }

    fn player_state() -> SimulationState {
        let mut state = test_state();
        state.player.x = 40;
        state.player.y = 30;
        state.player.mercy_frames_left = 0;
        state
    }

    #[test]
    fn test_relay_input_merges_button_edges() {
        let mut state = test_state();
        let input = TickInput {
            left: true,
            jump: Button {
                pressed: false,
                triggered: true,
            },
            fire: Button {
                pressed: true,
                triggered: false,
            },
            ..Default::default()
        };
        relay_input(&mut state, &input);
        assert!(state.input.left && state.input.jump && state.input.fire);
        assert!(!state.input.right && !state.input.up);
    }

    #[test]
    fn test_damage_mercy_frames_by_difficulty() {
        for (difficulty, mercy) in [
            (Difficulty::Easy, 40),
            (Difficulty::Medium, 30),
            (Difficulty::Hard, 20),
        ] {
            let mut state = player_state();
            let mut harness = Harness::new();
            state.difficulty = difficulty;
            harness.damage(&mut state);
            assert_eq!(state.player.health, PLAYER_MAX_HEALTH - 1);
            assert_eq!(state.player.mercy_frames_left, mercy);
            assert!(state.player_took_damage);
            assert_eq!(harness.services.sounds, vec![SND_DUKE_PAIN]);

            // No further damage while mercy frames remain
            harness.damage(&mut state);
            assert_eq!(state.player.health, PLAYER_MAX_HEALTH - 1);
        }
    }

    #[test]
    fn test_damage_ignored_while_cloaked() {
        let mut state = player_state();
        let mut harness = Harness::new();
        state.player.cloak_time_left = 10;
        harness.damage(&mut state);
        assert_eq!(state.player.health, PLAYER_MAX_HEALTH);
        assert!(harness.services.sounds.is_empty());
    }

    #[test]
    fn test_last_hit_kills() {
        let mut state = player_state();
        let mut harness = Harness::new();
        state.player.health = 1;
        state.player.state = PlayerState::UsingShip;
        harness.damage(&mut state);
        assert_eq!(state.player.state, PlayerState::Dying);
        assert!(state.player.killed_in_ship);
        assert_eq!(harness.services.sounds, vec![SND_DUKE_DEATH]);
    }

    #[test]
    fn test_damage_at_zero_health_wraps_and_kills() {
        let mut state = player_state();
        let mut harness = Harness::new();
        state.player.health = 0;
        harness.damage(&mut state);
        assert_eq!(state.player.health, 255);
        assert_eq!(state.player.state, PlayerState::Dying);
    }

    #[test]
    fn test_death_animation_ends_in_player_died() {
        let mut state = player_state();
        let mut harness = Harness::new();
        state.player.state = PlayerState::Dying;
        for _ in 0..PLAYER_DEATH_ANIMATION_STEPS - 1 {
            harness.tick(&mut state, &TickInput::default());
            assert_eq!(state.status, GameStatus::Running);
        }
        harness.tick(&mut state, &TickInput::default());
        assert_eq!(state.status, GameStatus::PlayerDied);
    }

    #[test]
    fn test_death_animation_stops_counting_after_death() {
        let mut state = player_state();
        let mut harness = Harness::new();
        state.player.state = PlayerState::Dying;
        for _ in 0..300 {
            harness.tick(&mut state, &TickInput::default());
        }
        assert_eq!(state.player.death_animation_step, PLAYER_DEATH_ANIMATION_STEPS);
        assert_eq!(state.status, GameStatus::PlayerDied);
    }

    #[test]
    fn test_walking_and_walls() {
        let mut state = player_state();
        let mut harness = Harness::new();
        let right = TickInput {
            right: true,
            ..Default::default()
        };

        harness.tick(&mut state, &right);
        assert_eq!(state.player.x, 41);
        assert_eq!(state.player.actor_id, ACT_DUKE_R);

        // Wall two tiles right of the player's sprite
        state.set_map_tile(&mut harness.map, 8, 45, 28).unwrap();
        harness.tick(&mut state, &right);
        assert_eq!(state.player.x, 42);
        harness.tick(&mut state, &right);
        assert_eq!(state.player.x, 42);

        let left = TickInput {
            left: true,
            ..Default::default()
        };
        harness.tick(&mut state, &left);
        assert_eq!(state.player.x, 41);
        assert_eq!(state.player.actor_id, ACT_DUKE_L);
    }

    #[test]
    fn test_player_blinks_during_mercy_frames() {
        let mut state = player_state();
        let mut harness = Harness::new();
        state.player.mercy_frames_left = 4;
        let mut drawn = vec![];
        for _ in 0..4 {
            harness.tick(&mut state, &TickInput::default());
            drawn.push(harness.bridge.sprites.iter().any(|s| s.id == ACT_DUKE_R));
        }
        assert_eq!(drawn, vec![false, true, false, true]);
    }

    #[test]
    fn test_earthquake_shakes_screen() {
        let mut state = player_state();
        let mut harness = Harness::new();
        state.level.flags.earthquake = true;

        harness.tick(&mut state, &TickInput::default());

        let countdown = RANDOM_NUMBER_TABLE[1];
        let threshold = RANDOM_NUMBER_TABLE[2] % 50;
        if countdown < threshold {
            assert_eq!(harness.bridge.screen_shift, RANDOM_NUMBER_TABLE[3] % 4);
            assert_eq!(state.rng.index(), 3);
        } else {
            assert_eq!(harness.bridge.screen_shift, 0);
            assert_eq!(state.rng.index(), 2);
        }
        assert_eq!(state.earthquake_countdown, countdown.wrapping_sub(1));
    }

    #[test]
    fn test_no_earthquake_without_flag() {
        let mut state = player_state();
        let mut harness = Harness::new();
        harness.tick(&mut state, &TickInput::default());
        assert_eq!(state.rng.index(), 0);
        assert_eq!(state.earthquake_countdown, 0);
    }

    #[test]
    fn test_tick_replaces_previous_output() {
        let mut state = player_state();
        let mut harness = Harness::new();
        spawn_particles(&mut state, 45, 25, 0, 3);
        harness.tick(&mut state, &TickInput::default());
        assert!(!harness.bridge.pixels.is_empty());

        state.particles.groups[0].time_alive = 0;
        harness.tick(&mut state, &TickInput::default());
        assert!(harness.bridge.pixels.is_empty());
    }

    #[test]
    fn test_determinism() {
        // Two states fed the same inputs must end up identical
        let mut state1 = player_state();
        let mut state2 = player_state();
        let mut harness1 = Harness::new();
        let mut harness2 = Harness::new();
        state1.level.flags.earthquake = true;
        state2.level.flags.earthquake = true;

        let inputs = [
            TickInput {
                right: true,
                ..Default::default()
            },
            TickInput {
                fire: Button {
                    pressed: true,
                    triggered: true,
                },
                ..Default::default()
            },
            TickInput {
                left: true,
                ..Default::default()
            },
            TickInput::default(),
        ];

        spawn_particles(&mut state1, 45, 25, 1, 3);
        spawn_particles(&mut state2, 45, 25, 1, 3);
        for _ in 0..10 {
            for input in &inputs {
                harness1.tick(&mut state1, input);
                harness2.tick(&mut state2, input);
                assert_eq!(harness1.bridge, harness2.bridge);
            }
        }

        assert_eq!(state1, state2);
    }
}
