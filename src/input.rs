use std::collections::HashSet;

use glam::Vec2;
use winit::event::{ElementState, MouseButton};
use winit::keyboard::KeyCode;

use crate::camera::OrbitCamera;

/// Radius change per frame of horizontal right-button drag.
pub const ZOOM_SPEED: f32 = 0.05;
/// Radians per pixel of left-button drag.
pub const TURN_SPEED: f32 = 0.005;
/// Pivot shift per pixel of middle-button drag, scaled by the radius.
pub const PAN_SPEED: f32 = 0.001;

/// Keys, buttons and cursor position as last reported by the window.
#[derive(Debug, Default, Clone)]
pub struct InputState {
    keys: HashSet<KeyCode>,
    mouse_buttons: HashSet<MouseButton>,
    mouse_position: Vec2,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_key(&mut self, key: KeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => {
                self.keys.insert(key);
            }
            ElementState::Released => {
                self.keys.remove(&key);
            }
        }
    }

    pub fn set_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        match state {
            ElementState::Pressed => {
                self.mouse_buttons.insert(button);
            }
            ElementState::Released => {
                self.mouse_buttons.remove(&button);
            }
        }
    }

    pub fn set_mouse_position(&mut self, position: Vec2) {
        self.mouse_position = position;
    }

    pub fn is_key_down(&self, key: KeyCode) -> bool {
        self.keys.contains(&key)
    }

    pub fn is_mouse_button_down(&self, button: MouseButton) -> bool {
        self.mouse_buttons.contains(&button)
    }

    pub fn any_mouse_button_down(&self) -> bool {
        !self.mouse_buttons.is_empty()
    }

    pub fn mouse_position(&self) -> Vec2 {
        self.mouse_position
    }

    pub fn exit_requested(&self) -> bool {
        self.is_key_down(KeyCode::Escape)
    }

    /// Forgets held keys and buttons, e.g. when the window loses focus.
    pub fn clear(&mut self) {
        self.keys.clear();
        self.mouse_buttons.clear();
    }
}

/// Shift + drag camera control.
///
/// Without Left-Shift any pressed button only moves the lock point to the
/// cursor. With Left-Shift held the drag since the lock point zooms (right),
/// turns (left) or pans (middle), checked in that order, then the lock point
/// follows the cursor.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct OrbitController {
    lock: Vec2,
}

impl OrbitController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self) -> Vec2 {
        self.lock
    }

    pub fn update(&mut self, input: &InputState, camera: &mut OrbitCamera) {
        let cursor = input.mouse_position();
        if !input.is_key_down(KeyCode::ShiftLeft) {
            if input.any_mouse_button_down() {
                self.lock = cursor;
            }
            return;
        }

        let delta = cursor - self.lock;
        if input.is_mouse_button_down(MouseButton::Right) {
            camera.zoom(-sign(delta.x) * ZOOM_SPEED);
        } else if input.is_mouse_button_down(MouseButton::Left) {
            camera.turn(delta.y * TURN_SPEED, delta.x * TURN_SPEED);
        } else if input.is_mouse_button_down(MouseButton::Middle) {
            camera.pan(delta.x * PAN_SPEED, delta.y * PAN_SPEED);
        }
        self.lock = cursor;
    }
}

/// Sign with zero mapped to zero.
fn sign(value: f32) -> f32 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}
