//! Boundary between the simulation and its host
//!
//! `Bridge` collects everything a frame produces for the renderer. `Host`
//! gives simulation code access to the services it does not own: sound,
//! messages, and the persistent player profile.

use glam::IVec2;
use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::level::LevelMap;
use crate::profile::{InventoryItemType, PlayerModel, TutorialMessageId};

/// How a sprite is rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrawStyle {
    #[default]
    Normal,
    WhiteFlash,
    Invisible,
    Translucent,
    /// Drawn on top of foreground tiles
    InFront,
}

/// Sprite request, position in tiles (bottom-left of the sprite)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpriteDrawCmd {
    pub id: u16,
    pub frame: u16,
    pub x: u16,
    pub y: u16,
    pub style: DrawStyle,
}

/// Single pixel, position in screen pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelDrawCmd {
    pub x: u16,
    pub y: u16,
    pub color: u8,
}

/// Flying tile, position in screen tiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileDebrisDrawCmd {
    pub tile_index: u16,
    pub x: u16,
    pub y: u16,
}

/// Output of one frame, read by the renderer between frames
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Bridge {
    pub sprites: Vec<SpriteDrawCmd>,
    pub pixels: Vec<PixelDrawCmd>,
    pub tile_debris: Vec<TileDebrisDrawCmd>,
    /// Radar blips relative to the player
    pub radar_dots: Vec<IVec2>,
    /// Horizontal viewport shift in pixels
    pub screen_shift: u8,
}

impl Bridge {
    /// Drop the previous frame's output. The screen shift survives until
    /// the end of the frame.
    pub fn clear_frame(&mut self) {
        self.sprites.clear();
        self.pixels.clear();
        self.tile_debris.clear();
        self.radar_dots.clear();
    }

    pub fn draw_sprite(&mut self, id: u16, frame: u16, x: u16, y: u16, style: DrawStyle) {
        self.sprites.push(SpriteDrawCmd { id, frame, x, y, style });
    }

    pub fn set_pixel(&mut self, x: u16, y: u16, color: u8) {
        self.pixels.push(PixelDrawCmd { x, y, color });
    }

    pub fn draw_tile_debris(&mut self, tile_index: u16, x: u16, y: u16) {
        self.tile_debris.push(TileDebrisDrawCmd { tile_index, x, y });
    }

    pub fn set_screen_shift(&mut self, amount: u8) {
        self.screen_shift = amount;
    }

    /// Add a radar blip for an object at (x, y) if it lies within the radar
    /// window around the player.
    ///
    /// The left/top bound is a signed 16-bit compare, the right/bottom bound
    /// an unsigned one, so objects near the map origin behave like the
    /// classic game.
    pub fn show_on_radar(&mut self, player_x: u16, player_y: u16, x: u16, y: u16) {
        let in_range = |pos: u16, player: u16| {
            pos as i16 > player.wrapping_sub(17) as i16 && (pos as u32) < player as u32 + 16
        };

        if in_range(x, player_x) && in_range(y, player_y) {
            self.radar_dots.push(IVec2::new(
                x.wrapping_sub(player_x) as i16 as i32,
                y.wrapping_sub(player_y) as i16 as i32,
            ));
        }
    }
}

/// Services provided by the host shell
pub trait HostServices {
    fn play_sound(&mut self, id: u8);
    fn show_message(&mut self, text: &str);
}

/// Host that ignores all requests
#[derive(Debug, Default)]
pub struct NullServices;

impl HostServices for NullServices {
    fn play_sound(&mut self, _id: u8) {}
    fn show_message(&mut self, _text: &str) {}
}

/// Host that records all requests, for traces and tests
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecordingServices {
    pub sounds: Vec<u8>,
    pub messages: Vec<String>,
}

impl HostServices for RecordingServices {
    fn play_sound(&mut self, id: u8) {
        self.sounds.push(id);
    }

    fn show_message(&mut self, text: &str) {
        self.messages.push(text.to_string());
    }
}

/// Everything outside the simulation state that game logic may touch
pub struct Host<'a> {
    pub services: &'a mut dyn HostServices,
    pub profile: &'a mut PlayerModel,
    pub map: &'a mut LevelMap,
}

impl<'a> Host<'a> {
    pub fn new(
        services: &'a mut dyn HostServices,
        profile: &'a mut PlayerModel,
        map: &'a mut LevelMap,
    ) -> Self {
        Self {
            services,
            profile,
            map,
        }
    }

    pub fn play_sound(&mut self, id: u8) {
        self.services.play_sound(id);
    }

    pub fn show_message(&mut self, text: &str) {
        self.services.show_message(text);
    }

    /// Show a tutorial hint unless the player has already seen it
    pub fn show_tutorial(&mut self, id: TutorialMessageId) {
        if !self.profile.tutorial_messages.has_been_shown(id) {
            self.services.show_message(id.text());
            self.profile.tutorial_messages.mark_as_shown(id);
        }
    }

    pub fn add_inventory_item(&mut self, actor_id: u16) -> Result<(), SimError> {
        self.profile.give_item(InventoryItemType::from_actor_id(actor_id)?);
        Ok(())
    }

    /// Remove an item. Returns false if the player doesn't have it.
    pub fn remove_from_inventory(&mut self, actor_id: u16) -> Result<bool, SimError> {
        let item = InventoryItemType::from_actor_id(actor_id)?;
        Ok(self.profile.remove_item(item))
    }

    pub fn has_inventory_item(&self, actor_id: u16) -> Result<bool, SimError> {
        Ok(self.profile.has_item(InventoryItemType::from_actor_id(actor_id)?))
    }
}
