use std::collections::HashSet;

use glam::Vec2;
use winit::event::{ElementState, MouseButton, MouseScrollDelta};

/// Per-frame input snapshot.
///
/// Polled (not pushed) by camera controllers and editor input handling. The
/// window layer feeds events in; consumers only ever read. `end_frame` must
/// run once per frame after all consumers, otherwise deltas accumulate.
#[derive(Default, Debug, Clone)]
pub struct Input {
    /// Cursor position in window coordinates
    pub cursor_position: Vec2,
    /// Cursor movement since last frame (dx, dy)
    pub cursor_delta: Vec2,
    /// Scroll amount this frame (x, y)
    pub scroll_delta: Vec2,
    /// Window size in pixels
    pub screen_size: Vec2,
    /// Currently held mouse buttons
    pub mouse_buttons: HashSet<MouseButton>,
}

impl Input {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears per-frame deltas. Without this a held-still cursor would keep
    /// rotating the camera.
    pub fn end_frame(&mut self) {
        self.cursor_delta = Vec2::ZERO;
        self.scroll_delta = Vec2::ZERO;
    }

    pub fn handle_resize(&mut self, width: u32, height: u32) {
        self.screen_size = Vec2::new(width as f32, height as f32);
    }

    pub fn handle_cursor_move(&mut self, x: f64, y: f64) {
        let new_pos = Vec2::new(x as f32, y as f32);
        // First event after startup has no meaningful delta
        if self.cursor_position != Vec2::ZERO {
            self.cursor_delta += new_pos - self.cursor_position;
        }
        self.cursor_position = new_pos;
    }

    pub fn handle_mouse_input(&mut self, state: ElementState, button: MouseButton) {
        match state {
            ElementState::Pressed => {
                self.mouse_buttons.insert(button);
            }
            ElementState::Released => {
                self.mouse_buttons.remove(&button);
            }
        }
    }

    pub fn handle_mouse_wheel(&mut self, delta: MouseScrollDelta) {
        match delta {
            MouseScrollDelta::LineDelta(x, y) => {
                self.scroll_delta += Vec2::new(x, y);
            }
            MouseScrollDelta::PixelDelta(pos) => {
                // PixelDelta values are much larger than line deltas
                self.scroll_delta += Vec2::new(pos.x as f32, pos.y as f32) * 0.1;
            }
        }
    }

    #[must_use]
    pub fn is_button_pressed(&self, button: MouseButton) -> bool {
        self.mouse_buttons.contains(&button)
    }
}
