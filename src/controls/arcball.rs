use glam::{Mat4, Quat, Vec3};
use winit::event::MouseButton;

use crate::app::input::Input;
use crate::math::BoundingBox;

/// Closest the camera may dolly toward its target, in world units.
/// Scroll-in requests that would cross this floor are refused outright.
pub const MIN_DOLLY_DISTANCE: f32 = 1.5;

/// Orbit-style camera controller.
///
/// Maps pointer-drag and scroll deltas onto `position` / `target` / `up` /
/// `speed` state:
///
/// - Left-drag rotates `position` about `target`: pitch about the camera's
///   current right vector first, then yaw about world +Y, each scaled by
///   elapsed time × pixel delta.
/// - Right-drag pans position and target by the same vector in the camera's
///   right/up plane, scaled by elapsed time, pixel delta and `speed / 2`.
/// - Scroll dollies along the view direction by `scroll.y × elapsed × speed`,
///   refusing any move that would land closer than [`MIN_DOLLY_DISTANCE`].
#[derive(Debug, Clone)]
pub struct ArcballController {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub speed: f32,
}

impl Default for ArcballController {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 2.0, 5.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            speed: 5.0,
        }
    }
}

impl ArcballController {
    #[must_use]
    pub fn new(position: Vec3, target: Vec3) -> Self {
        Self {
            position,
            target,
            up: Vec3::Y,
            speed: (position - target).length().max(1.0),
        }
    }

    /// Deterministic framing rule: place the camera at `bounds.max * 1.2`
    /// looking at the box center, world up, speed set to the box extent.
    pub fn frame(&mut self, bounds: &BoundingBox) {
        self.position = bounds.max * 1.2;
        self.target = bounds.center();
        self.up = Vec3::Y;
        self.speed = bounds.extent().length();
    }

    /// Processes one frame of input. Returns `true` if any state changed.
    pub fn update(&mut self, input: &Input, elapsed: f32) -> bool {
        let mut changed = false;

        if input.is_button_pressed(MouseButton::Left) && input.cursor_delta != glam::Vec2::ZERO {
            self.rotate(input.cursor_delta.x, input.cursor_delta.y, elapsed);
            changed = true;
        }

        if input.is_button_pressed(MouseButton::Right) && input.cursor_delta != glam::Vec2::ZERO {
            self.pan(input.cursor_delta.x, input.cursor_delta.y, elapsed);
            changed = true;
        }

        if input.scroll_delta.y != 0.0 {
            changed |= self.dolly(input.scroll_delta.y, elapsed);
        }

        changed
    }

    /// Pitch about the current right vector, then yaw about world +Y, both
    /// pivoting around `target`. Order matters: pitch first.
    fn rotate(&mut self, dx: f32, dy: f32, elapsed: f32) {
        let mut offset = self.position - self.target;

        let forward = -offset.normalize_or(-Vec3::Z);
        let right = forward.cross(self.up).normalize_or(Vec3::X);

        let pitch = Quat::from_axis_angle(right, -dy * elapsed);
        offset = pitch * offset;

        let yaw = Quat::from_rotation_y(-dx * elapsed);
        offset = yaw * offset;

        self.position = self.target + offset;
    }

    /// Translates position and target equally in the camera's right/up plane.
    fn pan(&mut self, dx: f32, dy: f32, elapsed: f32) {
        let forward = (self.target - self.position).normalize_or(-Vec3::Z);
        let right = forward.cross(self.up).normalize_or(Vec3::X);
        let up = right.cross(forward).normalize_or(Vec3::Y);

        let delta = (right * -dx + up * dy) * elapsed * (self.speed * 0.5);
        self.position += delta;
        self.target += delta;
    }

    /// Dollies toward (`amount > 0`) or away from the target. The move is
    /// refused entirely — no state change — if it would bring the camera
    /// closer than [`MIN_DOLLY_DISTANCE`]; backing out is always allowed.
    fn dolly(&mut self, amount: f32, elapsed: f32) -> bool {
        let to_target = self.target - self.position;
        let distance = to_target.length();
        let step = amount * elapsed * self.speed;

        // Only inward moves are gated; a camera already inside the floor can
        // still back out.
        if step > 0.0 && distance - step < MIN_DOLLY_DISTANCE {
            return false;
        }

        self.position += to_target.normalize_or(-Vec3::Z) * step;
        true
    }

    #[inline]
    #[must_use]
    pub fn distance(&self) -> f32 {
        (self.position - self.target).length()
    }

    /// World transform of the camera entity: the inverse of
    /// `look_at(position, target, up)`. The camera's view matrix is in turn
    /// the inverse of this transform.
    #[must_use]
    pub fn world_transform(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up).inverse()
    }
}
