//! Classic World trace runner
//!
//! Plays a scripted input sequence on a generated demo level and prints one
//! JSON line per frame with what the renderer would receive. Useful for
//! diffing simulation output between builds.
//!
//! Usage: classic-world [frames] [settings.json]

#[cfg(not(target_arch = "wasm32"))]
mod trace {
    use std::path::Path;

    use classic_world::consts::*;
    use classic_world::level::{LevelData, LevelFlags};
    use classic_world::profile::PlayerModel;
    use classic_world::sim::actor_info::{ActorInfoEntry, encode_actor_info};
    use classic_world::sim::{ActorDescriptor, Button, Difficulty, RecordingServices, TickInput};
    use classic_world::world::LevelAssets;
    use classic_world::{GameWorld, Settings};
    use serde::Serialize;

    const DEFAULT_FRAMES: u32 = 200;
    const DEMO_MAP_WIDTH: u16 = 64;

    #[derive(Serialize)]
    struct FrameTrace<'a> {
        frame: u32,
        player: (u16, u16),
        health: u8,
        score: u32,
        sprites: usize,
        pixels: usize,
        tile_debris: usize,
        radar_dots: usize,
        screen_shift: u8,
        sounds: &'a [u8],
    }

    fn demo_actor_info() -> Vec<u8> {
        let entries: Vec<ActorInfoEntry> = (0..=ACT_SPECIAL_HINT_GLOBE_ICON)
            .map(|id| match id {
                ACT_DUKE_L | ACT_DUKE_R => ActorInfoEntry {
                    draw_index: 0,
                    frames: vec![(PLAYER_WIDTH, PLAYER_HEIGHT); 4],
                },
                ACT_META_MEDIUMHARD_ONLY | ACT_META_HARD_ONLY => ActorInfoEntry {
                    draw_index: 0,
                    frames: vec![],
                },
                _ => ActorInfoEntry {
                    draw_index: (id % 3) as i16,
                    frames: vec![(2, 2)],
                },
            })
            .collect();
        encode_actor_info(&entries)
    }

    /// A floor, two walls, a key and a checkpoint
    fn demo_level() -> Vec<u8> {
        let height = (MAP_DATA_SIZE / 2) as u16 / DEMO_MAP_WIDTH;
        let mut tiles = vec![0u16; DEMO_MAP_WIDTH as usize * height as usize];
        for x in 0..DEMO_MAP_WIDTH {
            tiles[30 * DEMO_MAP_WIDTH as usize + x as usize] = 8;
        }
        for y in 20..30 {
            tiles[y * DEMO_MAP_WIDTH as usize + 2] = 8;
            tiles[y * DEMO_MAP_WIDTH as usize + 60] = 8;
        }

        let actors = vec![
            ActorDescriptor { id: ACT_DUKE_R, x: 10, y: 29 },
            ActorDescriptor { id: ACT_BLUE_KEY, x: 20, y: 29 },
            ActorDescriptor { id: ACT_RESPAWN_CHECKPOINT, x: 35, y: 29 },
            ActorDescriptor { id: ACT_META_HARD_ONLY, x: 0, y: 0 },
            ActorDescriptor { id: ACT_CIRCUIT_CARD, x: 45, y: 29 },
        ];

        let flags = LevelFlags {
            earthquake: true,
            ..Default::default()
        };
        LevelData::new("CZONE1.MNI", flags, actors, DEMO_MAP_WIDTH, &tiles).to_bytes()
    }

    fn demo_tileset_attributes() -> Vec<u8> {
        let mut attributes = vec![0u8; TILESET_ATTRIBUTES_SIZE];
        attributes[2..4].copy_from_slice(&0x0F_u16.to_le_bytes());
        attributes
    }

    /// Walk right, pause and fire, walk back
    fn scripted_input(frame: u32) -> TickInput {
        let fire = frame % 40 == 0;
        TickInput {
            right: frame % 120 < 70,
            left: frame % 120 >= 90,
            fire: Button {
                pressed: fire,
                triggered: fire,
            },
            ..Default::default()
        }
    }

    pub fn run() -> Result<(), Box<dyn std::error::Error>> {
        let mut args = std::env::args().skip(1);
        let frames = match args.next() {
            Some(arg) => arg.parse()?,
            None => DEFAULT_FRAMES,
        };
        let settings = match args.next() {
            Some(path) => Settings::load(Path::new(&path)),
            None => Settings::default(),
        };

        let actor_info = demo_actor_info();
        let level = demo_level();
        let tileset_attributes = demo_tileset_attributes();

        let mut world = GameWorld::new(
            RecordingServices::default(),
            settings,
            PlayerModel::new(),
            Difficulty::Medium,
            LevelAssets {
                actor_info: &actor_info,
                level: &level,
                tileset_attributes: &tileset_attributes,
            },
            None,
        )?;

        let mut sounds_seen = 0;
        for frame in 0..frames {
            world.update_game_logic(&scripted_input(frame))?;

            let sounds = &world.services().sounds[sounds_seen..];
            let state = world.state();
            let bridge = world.bridge();
            let trace = FrameTrace {
                frame,
                player: (state.player.x, state.player.y),
                health: state.player.health,
                score: state.player.score,
                sprites: bridge.sprites.len(),
                pixels: bridge.pixels.len(),
                tile_debris: bridge.tile_debris.len(),
                radar_dots: bridge.radar_dots.len(),
                screen_shift: bridge.screen_shift,
                sounds,
            };
            println!("{}", serde_json::to_string(&trace)?);
            sounds_seen = world.services().sounds.len();

            world.process_end_of_frame_actions()?;
            if world.level_finished() {
                break;
            }
        }

        for message in &world.services().messages {
            log::info!("Message: {}", message);
        }
        log::info!("Trace finished, final score {}", world.profile().score);
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Classic World trace runner starting...");

    if let Err(err) = trace::run() {
        log::error!("Trace aborted: {}", err);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The library is embedded by a host; there is no standalone wasm binary
}
