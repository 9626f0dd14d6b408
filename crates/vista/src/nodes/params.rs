//! Parameter types carried by scene nodes
//!
//! All of these deserialize from the camelCase object notation used by scene files and asset
//! fragments. Missing fields fall back to the values from each type's [`Default`] implementation.

use bitflags::bitflags;
use glam::{vec3, Vec3};
use serde::{Deserialize, Deserializer};
use std::sync::Arc;

/// Deserializes a `{x, y, z}` object into a [`Vec3`]. Missing components are zero.
pub(crate) fn deserialize_xyz<'de, D: Deserializer<'de>>(d: D) -> Result<Vec3, D::Error> {
    let xyz = Xyz::deserialize(d)?;
    Ok(xyz.or(Vec3::ZERO))
}

/// A partially specified vector, as written in scene files.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Xyz {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub z: Option<f32>,
}

impl Xyz {
    /// Fills in missing components from `fallback`.
    pub fn or(self, fallback: Vec3) -> Vec3 {
        vec3(
            self.x.unwrap_or(fallback.x),
            self.y.unwrap_or(fallback.y),
            self.z.unwrap_or(fallback.z),
        )
    }
}

/// Floating point RGBA color. Alpha defaults to 1 when omitted.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn grey(v: f32) -> Self {
        Self::rgb(v, v, v)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

bitflags! {
    /// Buffers cleared at the start of a render pass.
    #[derive(Default)]
    pub struct ClearMask: u8 {
        const COLOR = 0b001;
        const DEPTH = 0b010;
        const STENCIL = 0b100;
    }
}

#[derive(Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ClearFlags {
    color: bool,
    depth: bool,
    stencil: bool,
}

impl<'de> Deserialize<'de> for ClearMask {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let flags = ClearFlags::deserialize(d)?;
        let mut mask = ClearMask::empty();
        mask.set(ClearMask::COLOR, flags.color);
        mask.set(ClearMask::DEPTH, flags.depth);
        mask.set(ClearMask::STENCIL, flags.stencil);
        Ok(mask)
    }
}

/// Canvas region, in pixels, with the origin in the top left corner.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Viewport {
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && y >= self.y && x < self.x + self.width && y < self.y + self.height
    }
}

/// Parameters of a `renderer` node, which opens a new render pass.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct RendererState {
    pub clear_color: Color,
    /// The whole canvas is used if not specified.
    pub viewport: Option<Viewport>,
    pub clear: ClearMask,
}

impl Default for RendererState {
    fn default() -> Self {
        Self {
            clear_color: Color::BLACK,
            viewport: None,
            clear: ClearMask::empty(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightKind {
    #[default]
    Point,
    Dir,
}

/// A single light source, as declared by a `lights` node.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct LightSource {
    #[serde(rename = "type")]
    pub kind: LightKind,
    pub diffuse: Color,
    pub specular: Color,
    #[serde(deserialize_with = "deserialize_xyz")]
    pub pos: Vec3,
    #[serde(deserialize_with = "deserialize_xyz")]
    pub dir: Vec3,
    pub constant_attenuation: f32,
    pub linear_attenuation: f32,
    pub quadratic_attenuation: f32,
}

impl Default for LightSource {
    fn default() -> Self {
        Self {
            kind: LightKind::Point,
            diffuse: Color::WHITE,
            specular: Color::WHITE,
            pos: Vec3::ZERO,
            dir: Vec3::NEG_Z,
            constant_attenuation: 1.0,
            linear_attenuation: 0.0,
            quadratic_attenuation: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct LightsParams {
    pub sources: Vec<LightSource>,
}

/// Perspective projection, `fovy` is in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Perspective {
    pub fovy: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Perspective {
    fn default() -> Self {
        Self {
            fovy: 60.0,
            aspect: 1.0,
            near: 0.1,
            far: 10000.0,
        }
    }
}

/// Viewing transform, from `eye` towards `look`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LookAt {
    #[serde(deserialize_with = "deserialize_xyz")]
    pub eye: Vec3,
    #[serde(deserialize_with = "deserialize_xyz")]
    pub look: Vec3,
    #[serde(deserialize_with = "deserialize_xyz")]
    pub up: Vec3,
}

impl Default for LookAt {
    fn default() -> Self {
        Self {
            eye: Vec3::Z,
            look: Vec3::ZERO,
            up: Vec3::Y,
        }
    }
}

/// Rotation by `angle` degrees around the `{x, y, z}` axis.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Rotate {
    pub angle: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Default for Rotate {
    fn default() -> Self {
        Self {
            angle: 0.0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }
}

impl Rotate {
    pub fn axis(&self) -> Vec3 {
        vec3(self.x, self.y, self.z)
    }
}

/// Surface properties applied to all geometry below a `material` node.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Material {
    pub ambient: Color,
    pub diffuse: Color,
    pub specular: Color,
    pub shininess: f32,
    pub emission: f32,
    pub alpha: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            ambient: Color::grey(0.2),
            diffuse: Color::grey(0.8),
            specular: Color::BLACK,
            shininess: 0.0,
            emission: 0.0,
            alpha: 1.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct NameParams {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct LoadParams {
    pub uri: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct LoggingParams {
    pub element_id: String,
}

/// UV sphere primitive.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Sphere {
    pub radius: f32,
    pub slices: u32,
    pub rings: u32,
}

impl Default for Sphere {
    fn default() -> Self {
        Self {
            radius: 1.0,
            slices: 30,
            rings: 30,
        }
    }
}

/// Axis aligned box primitive, sized by its half extents.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Cube {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Default for Cube {
    fn default() -> Self {
        Self {
            x: 1.0,
            y: 1.0,
            z: 1.0,
        }
    }
}

/// Raw triangle mesh data. Positions and normals are flat `xyz` arrays.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MeshData {
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    pub indices: Vec<u32>,
}

/// Geometry leaves of the scene graph.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Sphere(Sphere),
    Cube(Cube),
    Mesh(Arc<MeshData>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_objects_use_defaults() {
        let light: LightSource = serde_json::from_str(
            r#"{ "pos": { "x": -600.0, "y": 40.0, "z": 50.0 } }"#,
        )
        .unwrap();
        assert_eq!(light.kind, LightKind::Point);
        assert_eq!(light.pos, vec3(-600.0, 40.0, 50.0));
        assert_eq!(light.diffuse, Color::WHITE);
        assert_eq!(light.constant_attenuation, 1.0);

        let look: LookAt = serde_json::from_str(r#"{ "eye": { "y": 2, "z": 12 } }"#).unwrap();
        assert_eq!(look.eye, vec3(0.0, 2.0, 12.0));
        assert_eq!(look.up, Vec3::Y);

        let color: Color = serde_json::from_str(r#"{ "r": 0.5 }"#).unwrap();
        assert_eq!(color, Color::rgba(0.5, 0.0, 0.0, 1.0));
    }

    #[test]
    fn clear_flags_become_a_mask() {
        let state: RendererState = serde_json::from_str(
            r#"{ "clearColor": { "b": 1 }, "clear": { "depth": true, "color": true } }"#,
        )
        .unwrap();
        assert_eq!(state.clear, ClearMask::COLOR | ClearMask::DEPTH);
        assert_eq!(state.clear_color, Color::rgb(0.0, 0.0, 1.0));
        assert!(state.viewport.is_none());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(serde_json::from_str::<Material>(r#"{ "shine": 3 }"#).is_err());
        assert!(serde_json::from_str::<Viewport>(r#"{ "x": 1 }"#).is_err());
    }
}
