//! Scene-wide per-frame state: clocks, the orbiting camera, light and fog.
//!
//! [`ViewSettings`] holds the tunable constants (with defaults, optionally
//! overridden from JSON). [`SceneGlobalState`] is advanced once per frame and
//! flattened into [`GlobalUniforms`], the block every shader sees at group 0.

use std::f32::consts::PI;

use cgmath::{InnerSpace, Matrix4, Point3, SquareMatrix, Vector3, Vector4};
use serde::{Deserialize, Serialize};

/// cgmath produces OpenGL clip space (z in -1..1); wgpu expects 0..1.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewSettings {
    pub speed: f32,
    pub target_height: f32,
    pub target_radius: f32,
    pub eye_height: f32,
    pub eye_radius: f32,
    pub eye_speed: f32,
    pub field_of_view: f32,
    pub frustum_offset: [f32; 2],
    pub frustum_offset_mult: f32,
    pub near_plane: f32,
    pub far_plane: f32,
    pub ambient: [f32; 3],
    pub fog_power: f32,
    pub fog_mult: f32,
    pub fog_offset: f32,
    pub fog_color: [f32; 3],
    pub fish_height_range: f32,
    pub fish_height: f32,
    pub fish_speed: f32,
    pub fish_offset: f32,
    pub fish_x_clock: f32,
    pub fish_y_clock: f32,
    pub fish_z_clock: f32,
    pub fish_tail_speed: f32,
    pub refraction_fudge: f32,
    pub eta: f32,
    pub tank_color_fudge: f32,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            speed: 1.0,
            target_height: 63.3,
            target_radius: 91.6,
            eye_height: 7.5,
            eye_radius: 13.2,
            eye_speed: 0.0258,
            field_of_view: 82.699,
            frustum_offset: [0.0, 0.0],
            frustum_offset_mult: 1.21,
            near_plane: 1.0,
            far_plane: 25000.0,
            ambient: [0.218, 0.502, 0.753],
            fog_power: 16.5,
            fog_mult: 1.5,
            fog_offset: 0.738,
            fog_color: [0.338, 0.81, 1.0],
            fish_height_range: 1.0,
            fish_height: 25.0,
            fish_speed: 0.124,
            fish_offset: 0.52,
            fish_x_clock: 1.0,
            fish_y_clock: 0.556,
            fish_z_clock: 1.0,
            fish_tail_speed: 1.0,
            refraction_fudge: 3.0,
            eta: 1.0,
            tank_color_fudge: 0.796,
        }
    }
}

/// Uniform block bound at group 0 for every draw.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GlobalUniforms {
    pub view_projection: [[f32; 4]; 4],
    pub view_inverse: [[f32; 4]; 4],
    pub sky_view_projection: [[f32; 4]; 4],
    pub light_world_pos: [f32; 4],
    pub light_color: [f32; 4],
    pub specular: [f32; 4],
    pub ambient: [f32; 4],
    pub fog_color: [f32; 4],
    /// fog power, fog multiplier, fog offset, unused
    pub fog: [f32; 4],
}

#[derive(Debug, Clone)]
pub struct SceneGlobalState {
    /// Scene time in seconds, scaled by [`ViewSettings::speed`].
    pub clock: f32,
    pub eye_clock: f32,
    pub eye_position: Point3<f32>,
    pub target_position: Point3<f32>,
    pub projection: Matrix4<f32>,
    pub view: Matrix4<f32>,
    /// The view with its translation removed, used for the sky.
    pub sky_view: Matrix4<f32>,
    pub view_projection: Matrix4<f32>,
    pub view_inverse: Matrix4<f32>,
    pub light_world_pos: Vector3<f32>,
}

impl SceneGlobalState {
    pub fn new() -> Self {
        Self {
            clock: 0.0,
            eye_clock: 0.0,
            eye_position: Point3::new(0.0, 0.0, 0.0),
            target_position: Point3::new(0.0, 0.0, 0.0),
            projection: Matrix4::identity(),
            view: Matrix4::identity(),
            sky_view: Matrix4::identity(),
            view_projection: Matrix4::identity(),
            view_inverse: Matrix4::identity(),
            light_world_pos: Vector3::new(0.0, 0.0, 0.0),
        }
    }

    /// Advance the clocks by `elapsed` seconds and rebuild the camera.
    pub fn advance(&mut self, elapsed: f32, settings: &ViewSettings, aspect: f32) {
        self.clock += elapsed * settings.speed;
        self.eye_clock += elapsed * settings.eye_speed;
        self.update_camera(settings, aspect);
    }

    pub fn update_camera(&mut self, settings: &ViewSettings, aspect: f32) {
        self.eye_position = Point3::new(
            self.eye_clock.sin() * settings.eye_radius,
            settings.eye_height,
            self.eye_clock.cos() * settings.eye_radius,
        );
        self.target_position = Point3::new(
            (self.eye_clock + PI).sin() * settings.target_radius,
            settings.target_height,
            (self.eye_clock + PI).cos() * settings.target_radius,
        );

        self.projection = OPENGL_TO_WGPU_MATRIX * asymmetric_frustum(settings, aspect);
        self.view = Matrix4::look_at_rh(
            self.eye_position,
            self.target_position,
            Vector3::unit_y(),
        );
        self.view_inverse = self.view.invert().unwrap_or_else(Matrix4::identity);

        let mut sky_view = self.view;
        sky_view.w = Vector4::new(0.0, 0.0, 0.0, 1.0);
        self.sky_view = sky_view;
        self.view_projection = self.projection * self.view;

        let right = self.view_inverse.x.truncate().normalize();
        let up = self.view_inverse.y.truncate().normalize();
        self.light_world_pos = Vector3::new(
            self.eye_position.x,
            self.eye_position.y,
            self.eye_position.z,
        ) + right * 20.0
            + up * 30.0;
    }

    pub fn uniforms(&self, settings: &ViewSettings) -> GlobalUniforms {
        let [ar, ag, ab] = settings.ambient;
        let [fr, fg, fb] = settings.fog_color;
        GlobalUniforms {
            view_projection: self.view_projection.into(),
            view_inverse: self.view_inverse.into(),
            sky_view_projection: (self.projection * self.sky_view).into(),
            light_world_pos: self.light_world_pos.extend(1.0).into(),
            light_color: [1.0, 1.0, 1.0, 1.0],
            specular: [1.0, 1.0, 1.0, 1.0],
            ambient: [ar, ag, ab, 1.0],
            fog_color: [fr, fg, fb, 1.0],
            fog: [settings.fog_power, settings.fog_mult, settings.fog_offset, 0.0],
        }
    }
}

impl Default for SceneGlobalState {
    fn default() -> Self {
        Self::new()
    }
}

/// Off-centre perspective frustum; the offset shifts the image plane so several
/// screens can show adjacent slices of one wide view.
fn asymmetric_frustum(settings: &ViewSettings, aspect: f32) -> Matrix4<f32> {
    let near = settings.near_plane;
    let far = settings.far_plane;
    let top = (settings.field_of_view.to_radians() * 0.5).tan() * near;
    let bottom = -top;
    let left = aspect * bottom;
    let right = aspect * top;
    let width = (right - left).abs();
    let height = (top - bottom).abs();
    let x_off = width * settings.frustum_offset[0] * settings.frustum_offset_mult;
    let y_off = height * settings.frustum_offset[1] * settings.frustum_offset_mult;
    cgmath::frustum(
        left + x_off,
        right + x_off,
        bottom + y_off,
        top + y_off,
        near,
        far,
    )
}
