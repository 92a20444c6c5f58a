//! Particle effects
//!
//! Up to 5 groups of 64 single-pixel particles exist at a time. Color and
//! lifetime belong to the group; each particle only has a horizontal velocity
//! and a position along a shared vertical motion arc. The per-particle
//! records live in arena chunks pushed once when the system is initialised.
//!
//! All positions are computed with 16-bit wrapping arithmetic and compared as
//! signed 16-bit values, matching the classic game's integer behavior exactly.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use super::arena::{ChunkHandle, ChunkType, MemoryArena};
use super::bridge::Bridge;
use super::state::SimulationState;
use crate::consts::*;
use crate::error::SimError;
use crate::tile_to_pixel;

/// Vertical motion arc: fly up fast, slow down near the top, stop briefly,
/// then fall slowly and speed up until the maximum speed is reached.
///
/// Entries 41 and 42 are not part of the arc. A particle whose initial cursor
/// is 14 or 15 reaches them on its last frames; they hold the two bytes the
/// classic game happened to read from memory past the end of its table.
#[rustfmt::skip]
pub const MOVEMENT_TABLE: [i8; 43] = [
    -8, -8, -8, -8, -4, -4, -4, -2, -1, 0, 0, 1, 2, 4, 4, 4, 8, 8, 8, 8, 8,
     8,  8,  8,  8,  8,  8,  8,  8,  8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8,
    24, 1,
];

/// One particle, stored as three 16-bit words in the arena
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct ParticleRecord {
    pub x_velocity: i16,
    pub table_index: u16,
    pub y_offset: u16,
}

/// Group-level particle state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticleGroup {
    /// Frames since spawn; 0 means the slot is free
    pub time_alive: u16,
    pub x: u16,
    pub y: u16,
    pub color: u8,
}

impl ParticleGroup {
    pub fn is_active(&self) -> bool {
        self.time_alive != 0
    }
}

/// The five group slots and their arena-backed particle buffers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticleSystem {
    pub groups: [ParticleGroup; NUM_PARTICLE_GROUPS],
    buffers: [ChunkHandle; NUM_PARTICLE_GROUPS],
}

impl ParticleSystem {
    /// Allocate the particle buffers. Done once per arena lifetime.
    pub fn init(arena: &mut MemoryArena) -> Result<Self, SimError> {
        let record_size = std::mem::size_of::<ParticleRecord>();
        let mut push = || arena.push_chunk(PARTICLES_PER_GROUP * record_size, ChunkType::Common);
        let buffers = [push()?, push()?, push()?, push()?, push()?];
        Ok(Self {
            groups: [ParticleGroup::default(); NUM_PARTICLE_GROUPS],
            buffers,
        })
    }

    pub fn buffer(&self, group: usize) -> ChunkHandle {
        self.buffers[group]
    }

    /// Read one particle record of a group
    pub fn particle(&self, arena: &MemoryArena, group: usize, index: usize) -> ParticleRecord {
        arena.read(self.buffers[group], index)
    }

    pub fn active_groups(&self) -> usize {
        self.groups.iter().filter(|g| g.is_active()).count()
    }
}

/// Deactivate every particle group
pub fn clear_particles(state: &mut SimulationState) {
    for group in &mut state.particles.groups {
        group.time_alive = 0;
    }
}

/// Spawn a particle group at tile position (x, y).
///
/// A non-zero `direction` biases every particle's horizontal velocity to that
/// side. Returns false, without drawing any random numbers, when all five
/// groups are in use.
pub fn spawn_particles(state: &mut SimulationState, x: u16, y: u16, direction: i8, color: u8) -> bool {
    let Some(index) = state.particles.groups.iter().position(|g| !g.is_active()) else {
        return false;
    };

    state.particles.groups[index] = ParticleGroup {
        time_alive: 1,
        x,
        y,
        color,
    };

    let buffer = state.particles.buffer(index);
    for i in 0..PARTICLES_PER_GROUP {
        let x_velocity = if direction != 0 {
            direction as i16 * (state.rng.next() % 20 + 1) as i16
        } else {
            10 - (state.rng.next() % 20) as i16
        };
        // Random start along the arc so particles don't move in lockstep
        let table_index = (state.rng.next() & 15) as u16;

        state.arena.write(
            buffer,
            i,
            ParticleRecord {
                x_velocity,
                table_index,
                y_offset: 0,
            },
        );
    }

    true
}

/// True if the pixel position lies inside the in-game viewport
fn is_point_visible(x: u16, y: u16) -> bool {
    let (x, y) = (x as i16, y as i16);
    (PARTICLE_VIEW_LEFT..PARTICLE_VIEW_RIGHT).contains(&x)
        && (PARTICLE_VIEW_TOP..PARTICLE_VIEW_BOTTOM).contains(&y)
}

/// Advance all active groups by one frame and queue their visible pixels
pub fn update_and_draw_particles(state: &mut SimulationState, bridge: &mut Bridge) {
    let (camera_x, camera_y) = (state.camera.x, state.camera.y);

    for index in 0..NUM_PARTICLE_GROUPS {
        let group = state.particles.groups[index];
        if !group.is_active() {
            continue;
        }

        let buffer = state.particles.buffer(index);
        let base_x = tile_to_pixel(group.x.wrapping_sub(camera_x));
        let base_y = tile_to_pixel(group.y.wrapping_sub(camera_y));

        for i in 0..PARTICLES_PER_GROUP {
            let mut particle: ParticleRecord = state.arena.read(buffer, i);

            // Linear horizontal motion, shifted one tile to the right
            let x = base_x
                .wrapping_add((particle.x_velocity as u16).wrapping_mul(group.time_alive))
                .wrapping_add(8);

            let step = MOVEMENT_TABLE[particle.table_index as usize];
            particle.y_offset = particle.y_offset.wrapping_add(step as i16 as u16);
            let y = base_y.wrapping_add(particle.y_offset);

            particle.table_index += 1;
            state.arena.write(buffer, i, particle);

            if is_point_visible(x, y) {
                bridge.set_pixel(x, y, group.color);
            }
        }

        let group = &mut state.particles.groups[index];
        group.time_alive += 1;
        if group.time_alive == PARTICLE_LIFETIME + 1 {
            group.time_alive = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::tests::test_state;

    #[test]
    fn test_spawn_uses_first_free_group() {
        let mut state = test_state();
        state.particles.groups[0].time_alive = 5;
        assert!(spawn_particles(&mut state, 3, 4, 0, 7));
        assert!(!state.particles.groups[2].is_active());
        assert_eq!(
            state.particles.groups[1],
            ParticleGroup {
                time_alive: 1,
                x: 3,
                y: 4,
                color: 7
            }
        );
    }

    #[test]
    fn test_spawn_dropped_when_all_groups_busy() {
        let mut state = test_state();
        for _ in 0..NUM_PARTICLE_GROUPS {
            assert!(spawn_particles(&mut state, 1, 1, 0, 1));
        }
        let groups = state.particles.groups;
        let rng_before = state.rng.index();
        assert!(!spawn_particles(&mut state, 9, 9, 1, 2));
        assert_eq!(state.particles.groups, groups);
        assert_eq!(state.rng.index(), rng_before);
    }

    #[test]
    fn test_spawn_consumes_128_draws() {
        let mut state = test_state();
        spawn_particles(&mut state, 0, 0, 0, 1);
        assert_eq!(state.rng.index(), 128);
    }

    #[test]
    fn test_spawn_fill_matches_random_sequence() {
        use crate::sim::rng::RANDOM_NUMBER_TABLE;

        let mut state = test_state();
        spawn_particles(&mut state, 0, 0, -2, 1);
        for i in 0..PARTICLES_PER_GROUP {
            let velocity_draw = RANDOM_NUMBER_TABLE[2 * i + 1];
            let index_draw = RANDOM_NUMBER_TABLE[2 * i + 2];
            let particle = state.particles.particle(&state.arena, 0, i);
            assert_eq!(particle.x_velocity, -2 * (velocity_draw % 20 + 1) as i16);
            assert_eq!(particle.table_index, (index_draw & 15) as u16);
            assert_eq!(particle.y_offset, 0);
        }
    }

    #[test]
    fn test_undirected_velocity_range() {
        let mut state = test_state();
        spawn_particles(&mut state, 0, 0, 0, 1);
        for i in 0..PARTICLES_PER_GROUP {
            let v = state.particles.particle(&state.arena, 0, i).x_velocity;
            assert!((-9..=10).contains(&v), "velocity {} out of range", v);
        }
    }

    #[test]
    fn test_third_spawn_repeats_first() {
        let mut state = test_state();
        spawn_particles(&mut state, 0, 0, 0, 1);
        spawn_particles(&mut state, 0, 0, 0, 1);
        spawn_particles(&mut state, 0, 0, 0, 1);
        for i in 0..PARTICLES_PER_GROUP {
            assert_eq!(
                state.particles.particle(&state.arena, 0, i),
                state.particles.particle(&state.arena, 2, i)
            );
        }
    }

    #[test]
    fn test_lifecycle_28_frames() {
        let mut state = test_state();
        let mut bridge = Bridge::default();
        spawn_particles(&mut state, 10, 10, 0, 1);
        for frame in 1..=PARTICLE_LIFETIME {
            assert_eq!(state.particles.groups[0].time_alive, frame);
            update_and_draw_particles(&mut state, &mut bridge);
        }
        assert_eq!(state.particles.groups[0].time_alive, 0);

        // Slot is immediately reusable
        assert!(spawn_particles(&mut state, 1, 1, 0, 1));
        assert_eq!(state.particles.groups[0].time_alive, 1);
    }

    #[test]
    fn test_horizontal_position_formula() {
        let mut state = test_state();
        let mut bridge = Bridge::default();
        spawn_particles(&mut state, 10, 10, 0, 4);
        state.particles.groups[0].time_alive = 3;
        let buffer = state.particles.buffer(0);
        state.arena.write(
            buffer,
            0,
            ParticleRecord {
                x_velocity: 2,
                table_index: 9,
                y_offset: 0,
            },
        );

        update_and_draw_particles(&mut state, &mut bridge);

        // tileToPixel(10) + 2 * 3 + 8; table entry 9 is 0, so y stays at 80
        let first = bridge.pixels[0];
        assert_eq!((first.x, first.y, first.color), (80 + 6 + 8, 80, 4));
    }

    #[test]
    fn test_cursor_overrun_reads_sentinels() {
        let mut state = test_state();
        let mut bridge = Bridge::default();
        spawn_particles(&mut state, 10, 10, 0, 1);
        let buffer = state.particles.buffer(0);
        state.arena.write(
            buffer,
            0,
            ParticleRecord {
                x_velocity: 0,
                table_index: 15,
                y_offset: 0,
            },
        );

        let mut expected: u16 = 0;
        for frame in 0..PARTICLE_LIFETIME as usize {
            update_and_draw_particles(&mut state, &mut bridge);
            expected = expected.wrapping_add(MOVEMENT_TABLE[15 + frame] as i16 as u16);
        }

        let particle = state.particles.particle(&state.arena, 0, 0);
        assert_eq!(particle.table_index, 43);
        assert_eq!(particle.y_offset, expected);
        // Last two steps used the sentinel values
        assert_eq!(&MOVEMENT_TABLE[41..], &[24, 1]);
    }

    #[test]
    fn test_offscreen_particles_not_drawn() {
        let mut state = test_state();
        let mut bridge = Bridge::default();
        // Camera far to the right of the group: everything is off screen
        state.camera.x = 200;
        spawn_particles(&mut state, 10, 10, 0, 1);
        update_and_draw_particles(&mut state, &mut bridge);
        assert!(bridge.pixels.is_empty());
        assert_eq!(state.particles.groups[0].time_alive, 2);
    }

    #[test]
    fn test_visibility_bounds() {
        assert!(is_point_visible(8, 8));
        assert!(is_point_visible(263, 159));
        assert!(!is_point_visible(264, 20));
        assert!(!is_point_visible(20, 160));
        assert!(!is_point_visible(7, 20));
        // Negative values wrap to large words and stay invisible
        assert!(!is_point_visible(0xFFF0, 20));
    }
}
