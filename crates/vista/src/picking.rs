//! Named subtrees and pick testing
//!
//! Every `name` node visited during a render is recorded in the frame's [`NameRegistry`], along
//! with the world space bounds of the geometry below it. [`pick`] uses those bounds to find the
//! named geometry under a canvas pixel.

use crate::{
    graphics::{camera::Ray, BoundingSphere, Frame},
    nodes::NamePath,
};
use glam::Vec2;
use std::collections::BTreeMap;
use vista_utils::fnv1a_hash;

/// Derives the pick identifier of a qualified name.
pub fn pick_id(path: &NamePath) -> u32 {
    fnv1a_hash(path.to_string().as_bytes())
}

/// A named subtree, as seen in a single frame.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedEntry {
    pub pick_id: u32,
    /// Index of the render pass the `name` node was first visited in.
    pub pass: Option<usize>,
    /// How many `name` nodes share this path. Instanced assets visit the same path once per
    /// instance.
    pub instances: usize,
    /// World space bounds of all geometry drawn below the name, including nested names.
    pub bounds: Vec<BoundingSphere>,
}

/// Qualified names visited during a render, in lexical order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NameRegistry {
    entries: BTreeMap<NamePath, NamedEntry>,
}

impl NameRegistry {
    /// Records a visited `name` node. Visiting a path again adds another instance to the same
    /// entry, keeping its pick id.
    pub(crate) fn declare(&mut self, path: &NamePath, pass: Option<usize>) {
        self.entries
            .entry(path.clone())
            .and_modify(|entry| entry.instances += 1)
            .or_insert_with(|| NamedEntry {
                pick_id: pick_id(path),
                pass,
                instances: 1,
                bounds: vec![],
            });
    }

    /// Attaches drawn geometry to a path and all of its enclosing names.
    pub(crate) fn add_bounds(&mut self, path: &NamePath, bounds: BoundingSphere) {
        for depth in 1..=path.depth() {
            let prefix = NamePath::from_segments(&path.segments()[..depth]);
            if let Some(entry) = self.entries.get_mut(&prefix) {
                entry.bounds.push(bounds);
            }
        }
    }

    pub fn get(&self, path: &NamePath) -> Option<&NamedEntry> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &NamePath) -> bool {
        self.entries.contains_key(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &NamePath> {
        self.entries.keys()
    }

    /// Names without any other names nested below them.
    pub fn leaves(&self) -> impl Iterator<Item = &NamePath> {
        self.entries.keys().filter(move |path| {
            !self
                .entries
                .keys()
                .any(|other| other.depth() > path.depth() && other.starts_with(path))
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of a successful pick.
#[derive(Debug, Clone, PartialEq)]
pub struct PickHit {
    /// Qualified name of the innermost `name` node enclosing the hit geometry.
    pub name: NamePath,
    pub pick_id: u32,
    /// Distance from the near plane to the hit, in world units.
    pub distance: f32,
    pub pass: usize,
}

/// Finds the named geometry under a canvas pixel.
///
/// Later render passes are drawn over earlier ones, so they're tested first. Within a pass the
/// hit closest to the camera wins. Unnamed geometry can't be picked, and doesn't occlude.
pub fn pick(frame: &Frame, x: f32, y: f32) -> Option<PickHit> {
    let pixel = Vec2::new(x, y);

    frame.passes.iter().enumerate().rev().find_map(|(index, pass)| {
        pass.draws
            .iter()
            .filter_map(|draw| {
                let name = draw.name.as_ref()?;
                let ray = Ray::through_pixel(&pass.viewport, draw.projection, draw.view, pixel)?;
                let bounds = draw.world_bounds();
                let distance = ray.intersect_sphere(bounds.center, bounds.radius)?;
                Some(PickHit {
                    name: name.clone(),
                    pick_id: draw.pick_id.unwrap_or_else(|| pick_id(name)),
                    distance,
                    pass: index,
                })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn path(s: &str) -> NamePath {
        s.parse().unwrap()
    }

    #[test]
    fn registry_tracks_nesting() {
        let mut registry = NameRegistry::default();
        registry.declare(&path("spheres"), Some(0));
        registry.declare(&path("spheres/blueGroup"), Some(0));
        registry.declare(&path("spheres/blueGroup/left"), Some(0));
        registry.declare(&path("spheres/blueGroup/right"), Some(0));

        let bounds = BoundingSphere {
            center: Vec3::X,
            radius: 1.0,
        };
        registry.add_bounds(&path("spheres/blueGroup/left"), bounds);

        assert_eq!(registry.get(&path("spheres")).unwrap().bounds, vec![bounds]);
        assert_eq!(registry.get(&path("spheres/blueGroup")).unwrap().bounds.len(), 1);
        assert!(registry.get(&path("spheres/blueGroup/right")).unwrap().bounds.is_empty());

        let leaves: Vec<_> = registry.leaves().map(ToString::to_string).collect();
        assert_eq!(leaves, ["spheres/blueGroup/left", "spheres/blueGroup/right"]);
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn repeated_paths_become_instances() {
        let mut registry = NameRegistry::default();
        let teapot = path("teapot");
        for (pass, center) in [(0, Vec3::X), (1, Vec3::NEG_X)] {
            registry.declare(&teapot, Some(pass));
            registry.add_bounds(
                &teapot,
                BoundingSphere {
                    center,
                    radius: 1.0,
                },
            );
        }

        let entry = registry.get(&teapot).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(entry.instances, 2);
        assert_eq!(entry.pass, Some(0));
        assert_eq!(entry.pick_id, pick_id(&teapot));
        assert_eq!(entry.bounds.len(), 2);
    }

    #[test]
    fn pick_ids_are_stable() {
        assert_eq!(pick_id(&path("a/b")), pick_id(&path("a/b")));
        assert_ne!(pick_id(&path("a/b")), pick_id(&path("b/a")));
    }
}
