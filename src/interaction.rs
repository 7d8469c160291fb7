//! Live preview orientation.
//!
//! The orientation only affects what the preview shows. Exports never read
//! it; see [`crate::export::export_document`].

use glam::{DQuat, DVec2};

/// Radians of rotation per pixel of pointer movement.
pub const DRAG_SENSITIVITY: f64 = 0.01;

/// Radians of yaw added per frame while idle.
pub const IDLE_YAW_STEP: f64 = 0.005;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragState {
    Idle,
    Dragging { last_pointer: DVec2 },
}

/// Yaw/pitch orientation driven by pointer drags and idle auto-rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interaction {
    pub yaw: f64,
    pub pitch: f64,
    state: DragState,
    sensitivity: f64,
    idle_step: f64,
}

impl Default for Interaction {
    fn default() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            state: DragState::Idle,
            sensitivity: DRAG_SENSITIVITY,
            idle_step: IDLE_YAW_STEP,
        }
    }
}

impl Interaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_step(mut self, step: f64) -> Self {
        self.idle_step = step;
        self
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    pub fn pointer_down(&mut self, pos: DVec2) {
        self.state = DragState::Dragging { last_pointer: pos };
    }

    /// Rotate by the movement since the last pointer event. Ignored while idle.
    pub fn pointer_move(&mut self, pos: DVec2) {
        if let DragState::Dragging { last_pointer } = self.state {
            let delta = pos - last_pointer;
            self.yaw += delta.x * self.sensitivity;
            self.pitch += delta.y * self.sensitivity;
            self.state = DragState::Dragging { last_pointer: pos };
        }
    }

    pub fn pointer_up(&mut self) {
        self.state = DragState::Idle;
    }

    /// Advance one frame of auto-rotation.
    pub fn tick(&mut self) {
        if self.state == DragState::Idle {
            self.yaw += self.idle_step;
        }
    }

    /// Back to identity orientation. The drag state is kept.
    pub fn reset(&mut self) {
        self.yaw = 0.0;
        self.pitch = 0.0;
    }

    /// Yaw about the vertical axis, then pitch about the horizontal one.
    pub fn orientation(&self) -> DQuat {
        DQuat::from_rotation_x(self.pitch) * DQuat::from_rotation_y(self.yaw)
    }
}
