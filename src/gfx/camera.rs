//! Orbit camera
//!
//! Spherical-coordinate camera orbiting a focus point, with drag-rotate,
//! scroll-zoom and shift-drag pan, plus eased framing of a selected mesh's
//! bounds so selection gestures pull the view toward the anatomy they
//! touched.

use cgmath::{perspective, EuclideanSpace, InnerSpace, Matrix4, Point3, Rad, Vector3, Zero};
use winit::{
    dpi::PhysicalPosition,
    event::{DeviceEvent, ElementState, KeyEvent, MouseScrollDelta},
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.5,
    0.0, 0.0, 0.0, 1.0,
);

/// Camera data as the shader sees it; 16-byte aligned.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_position: [f32; 4],
    pub view_proj: [[f32; 4]; 4],
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self {
            view_position: [0.0; 4],
            view_proj: matrix_to_array(Matrix4::from_scale(1.0)),
        }
    }
}

fn matrix_to_array(matrix: Matrix4<f32>) -> [[f32; 4]; 4] {
    let m: &[f32; 16] = matrix.as_ref();
    [
        [m[0], m[1], m[2], m[3]],
        [m[4], m[5], m[6], m[7]],
        [m[8], m[9], m[10], m[11]],
        [m[12], m[13], m[14], m[15]],
    ]
}

/// Goal state for eased framing of a mesh's bounds
#[derive(Debug, Clone, Copy)]
struct FocusGoal {
    target: Vector3<f32>,
    distance: f32,
}

#[derive(Debug)]
pub struct OrbitCamera {
    pub distance: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub target: Vector3<f32>,
    pub eye: Vector3<f32>,
    pub aspect: f32,
    pub fovy: Rad<f32>,
    pub znear: f32,
    pub zfar: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub uniform: CameraUniform,
    focus: Option<FocusGoal>,
}

impl OrbitCamera {
    pub fn new(distance: f32, pitch: f32, yaw: f32, target: Vector3<f32>, aspect: f32) -> Self {
        let mut camera = Self {
            distance,
            pitch,
            yaw,
            target,
            eye: Vector3::zero(),
            aspect,
            fovy: Rad(std::f32::consts::PI / 4.0),
            znear: 0.1,
            zfar: 2000.0,
            min_distance: 0.2,
            max_distance: 500.0,
            uniform: CameraUniform::default(),
            focus: None,
        };
        camera.update_view_proj();
        camera
    }

    pub fn build_view_projection_matrix(&self) -> Matrix4<f32> {
        let view = Matrix4::look_at_rh(
            Point3::from_vec(self.eye),
            Point3::from_vec(self.target),
            Vector3::unit_z(),
        );
        let proj = OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar);
        proj * view
    }

    /// Recomputes the eye position and the GPU uniform.
    pub fn update_view_proj(&mut self) {
        self.eye = self.target
            + Vector3::new(
                self.distance * self.yaw.cos() * self.pitch.cos(),
                self.distance * self.yaw.sin() * self.pitch.cos(),
                self.distance * self.pitch.sin(),
            );
        self.uniform.view_position = [self.eye.x, self.eye.y, self.eye.z, 1.0];
        self.uniform.view_proj = matrix_to_array(self.build_view_projection_matrix());
    }

    pub fn set_distance(&mut self, distance: f32) {
        self.distance = distance.clamp(self.min_distance, self.max_distance);
        self.update_view_proj();
    }

    pub fn add_distance(&mut self, delta: f32) {
        // Log-scaled so zoom feels uniform near and far
        let corrected = f32::log10(self.distance.max(1.01)) * delta;
        self.set_distance(self.distance + corrected);
    }

    pub fn add_pitch(&mut self, delta: f32) {
        self.pitch = (self.pitch + delta).clamp(-1.54, 1.54);
        self.update_view_proj();
    }

    pub fn add_yaw(&mut self, delta: f32) {
        self.yaw += delta;
        self.update_view_proj();
    }

    /// Moves the focus point in the view plane.
    pub fn pan(&mut self, delta: (f32, f32)) {
        let forward = (self.target - self.eye).normalize();
        let right = forward.cross(Vector3::unit_z()).normalize();
        let up = right.cross(forward).normalize();
        let scale = self.distance * 0.1;
        let movement = right * delta.0 * scale + up * delta.1 * scale;
        self.target += movement;
        self.focus = None; // manual pan overrides pending framing
        self.update_view_proj();
    }

    pub fn resize_projection(&mut self, width: u32, height: u32) {
        if height > 0 {
            self.aspect = width as f32 / height as f32;
            self.update_view_proj();
        }
    }

    pub fn reset_view(&mut self, target: Vector3<f32>, distance: f32) {
        self.target = target;
        self.distance = distance.clamp(self.min_distance, self.max_distance);
        self.pitch = 0.35;
        self.yaw = 0.3;
        self.focus = None;
        self.update_view_proj();
    }

    /// Requests eased framing of a bounding sphere; `ease_focus` walks
    /// toward it over the following frames.
    pub fn frame(&mut self, center: [f32; 3], radius: f32) {
        let distance = (radius * 2.8).clamp(self.min_distance, self.max_distance);
        self.focus = Some(FocusGoal {
            target: Vector3::new(center[0], center[1], center[2]),
            distance,
        });
    }

    /// Advances the framing ease; returns true while still moving.
    pub fn ease_focus(&mut self, dt: f32) -> bool {
        let Some(goal) = self.focus else {
            return false;
        };
        let t = (dt * 6.0).min(1.0);
        self.target += (goal.target - self.target) * t;
        self.distance += (goal.distance - self.distance) * t;
        let settled = (goal.target - self.target).magnitude() < 1e-3
            && (goal.distance - self.distance).abs() < 1e-3;
        if settled {
            self.target = goal.target;
            self.distance = goal.distance;
            self.focus = None;
        }
        self.update_view_proj();
        !settled
    }

    /// Orbit parameters as a restorable snapshot (for undoable view resets).
    pub fn view_snapshot(&self) -> (f32, f32, f32, Vector3<f32>) {
        (self.distance, self.pitch, self.yaw, self.target)
    }

    pub fn restore_view(&mut self, snapshot: (f32, f32, f32, Vector3<f32>)) {
        let (distance, pitch, yaw, target) = snapshot;
        self.distance = distance;
        self.pitch = pitch;
        self.yaw = yaw;
        self.target = target;
        self.focus = None;
        self.update_view_proj();
    }
}

/// Mouse/keyboard handling for the orbit camera
pub struct CameraController {
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    is_mouse_pressed: bool,
    is_shift_held: bool,
}

impl CameraController {
    pub fn new(rotate_speed: f32, zoom_speed: f32) -> Self {
        Self {
            rotate_speed,
            zoom_speed,
            pan_speed: 0.01,
            is_mouse_pressed: false,
            is_shift_held: false,
        }
    }

    pub fn process_event(&mut self, event: &DeviceEvent, window: &Window, camera: &mut OrbitCamera) {
        match event {
            DeviceEvent::Button { button: 0, state } => {
                self.is_mouse_pressed = *state == ElementState::Pressed;
            }
            DeviceEvent::MouseWheel { delta, .. } => {
                let scroll = -match delta {
                    MouseScrollDelta::LineDelta(_, lines) => *lines,
                    MouseScrollDelta::PixelDelta(PhysicalPosition { y, .. }) => *y as f32,
                };
                camera.add_distance(scroll * self.zoom_speed);
                window.request_redraw();
            }
            DeviceEvent::MouseMotion { delta } => {
                if self.is_mouse_pressed {
                    if self.is_shift_held {
                        camera.pan((
                            -delta.0 as f32 * self.pan_speed,
                            delta.1 as f32 * self.pan_speed,
                        ));
                    } else {
                        camera.add_yaw(-delta.0 as f32 * self.rotate_speed);
                        camera.add_pitch(delta.1 as f32 * self.rotate_speed);
                    }
                    window.request_redraw();
                }
            }
            _ => (),
        }
    }

    pub fn process_key_event(&mut self, event: &KeyEvent) {
        if let KeyEvent {
            physical_key: PhysicalKey::Code(KeyCode::ShiftLeft | KeyCode::ShiftRight),
            state,
            ..
        } = event
        {
            self.is_shift_held = *state == ElementState::Pressed;
        }
    }
}

/// Camera plus its controller, as one unit for the scene
pub struct CameraManager {
    pub camera: OrbitCamera,
    pub controller: CameraController,
}

impl CameraManager {
    pub fn new(camera: OrbitCamera, controller: CameraController) -> Self {
        Self { camera, controller }
    }

    pub fn process_event(&mut self, event: &DeviceEvent, window: &Window) {
        self.controller.process_event(event, window, &mut self.camera);
    }

    pub fn process_key_event(&mut self, event: &KeyEvent) {
        self.controller.process_key_event(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_is_clamped() {
        let mut camera = OrbitCamera::new(5.0, 0.3, 0.3, Vector3::zero(), 1.0);
        camera.set_distance(0.0);
        assert_eq!(camera.distance, camera.min_distance);
        camera.set_distance(1e6);
        assert_eq!(camera.distance, camera.max_distance);
    }

    #[test]
    fn test_frame_eases_toward_goal() {
        let mut camera = OrbitCamera::new(5.0, 0.3, 0.3, Vector3::zero(), 1.0);
        camera.frame([10.0, 0.0, 0.0], 2.0);

        let mut steps = 0;
        while camera.ease_focus(0.016) {
            steps += 1;
            assert!(steps < 10_000, "framing never settled");
        }
        assert!((camera.target.x - 10.0).abs() < 1e-2);
        assert!((camera.distance - 5.6).abs() < 1e-2);
    }

    #[test]
    fn test_view_snapshot_round_trip() {
        let mut camera = OrbitCamera::new(5.0, 0.3, 0.3, Vector3::zero(), 1.0);
        let snapshot = camera.view_snapshot();
        camera.add_yaw(1.0);
        camera.pan((0.5, 0.5));
        camera.restore_view(snapshot);
        assert_eq!(camera.view_snapshot(), snapshot);
    }
}
