//! Declarative scene nodes
//!
//! A scene is described as a tree of [`Node`]s. Every node has a kind (and the parameters of that
//! kind), and an ordered list of children. Nodes affect the state seen by their children: a
//! `translate` moves everything below it, a `material` colors everything below it, and so on.
//!
//! Trees can be assembled in code:
//! ```
//! use vista::nodes::{Node, params::*};
//!
//! let scene = Node::renderer(
//!     RendererState::default(),
//!     [Node::perspective(
//!         Perspective::default(),
//!         [Node::look_at(
//!             LookAt::default(),
//!             [Node::name("ball", [Node::sphere(Sphere::default())])],
//!         )],
//!     )],
//! );
//! assert_eq!(scene.count(), 5);
//! ```
//!
//! Or parsed from their serialized form, see [`parse_fragment`] and [`parse_scene_toml`].

use glam::Vec3;
use params::*;
use std::sync::Arc;

pub mod params;

#[doc(inline)]
pub use names::*;
mod names;

#[doc(inline)]
pub use desc::*;
mod desc;

/// The kind of a [`Node`], along with its parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Plain grouping node, doesn't affect its children.
    Group,
    /// Opens a new render pass with its own clear state and viewport.
    Renderer(RendererState),
    /// Adds light sources, visible to all geometry below.
    Lights(Vec<LightSource>),
    Perspective(Perspective),
    LookAt(LookAt),
    Translate(Vec3),
    Rotate(Rotate),
    Scale(Vec3),
    Material(Material),
    /// Pushes a name segment, identifying the subtree for picking.
    Name(String),
    Geometry(Geometry),
    /// Asset loader. Fetches a scene fragment from the URI and grafts it in place once loaded.
    Load(String),
    /// Routes log output about the subtree to the given log target.
    Logging(String),
}

impl NodeKind {
    /// Name of the kind, as used in serialized scenes.
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeKind::Group => "node",
            NodeKind::Renderer(_) => "renderer",
            NodeKind::Lights(_) => "lights",
            NodeKind::Perspective(_) => "perspective",
            NodeKind::LookAt(_) => "lookAt",
            NodeKind::Translate(_) => "translate",
            NodeKind::Rotate(_) => "rotate",
            NodeKind::Scale(_) => "scale",
            NodeKind::Material(_) => "material",
            NodeKind::Name(_) => "name",
            NodeKind::Geometry(Geometry::Sphere(_)) => "sphere",
            NodeKind::Geometry(Geometry::Cube(_)) => "cube",
            NodeKind::Geometry(Geometry::Mesh(_)) => "mesh",
            NodeKind::Load(_) => "load",
            NodeKind::Logging(_) => "logging",
        }
    }
}

/// A scene graph node. Immutable once built, a [`crate::Scene`] takes its own copy.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            children: vec![],
        }
    }

    pub fn with_children(kind: NodeKind, children: impl IntoIterator<Item = Node>) -> Self {
        Self {
            kind,
            children: children.into_iter().collect(),
        }
    }

    /// Appends a child node.
    pub fn child(mut self, node: Node) -> Self {
        self.children.push(node);
        self
    }

    /// Total amount of nodes in this subtree, including self.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Node::count).sum::<usize>()
    }

    /// Iterates over this subtree depth-first, parents before children.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }

    pub fn group(children: impl IntoIterator<Item = Node>) -> Self {
        Self::with_children(NodeKind::Group, children)
    }

    pub fn renderer(state: RendererState, children: impl IntoIterator<Item = Node>) -> Self {
        Self::with_children(NodeKind::Renderer(state), children)
    }

    pub fn lights(
        sources: impl IntoIterator<Item = LightSource>,
        children: impl IntoIterator<Item = Node>,
    ) -> Self {
        Self::with_children(NodeKind::Lights(sources.into_iter().collect()), children)
    }

    pub fn perspective(perspective: Perspective, children: impl IntoIterator<Item = Node>) -> Self {
        Self::with_children(NodeKind::Perspective(perspective), children)
    }

    pub fn look_at(look_at: LookAt, children: impl IntoIterator<Item = Node>) -> Self {
        Self::with_children(NodeKind::LookAt(look_at), children)
    }

    pub fn translate(offset: Vec3, children: impl IntoIterator<Item = Node>) -> Self {
        Self::with_children(NodeKind::Translate(offset), children)
    }

    pub fn rotate(rotate: Rotate, children: impl IntoIterator<Item = Node>) -> Self {
        Self::with_children(NodeKind::Rotate(rotate), children)
    }

    pub fn scale(factors: Vec3, children: impl IntoIterator<Item = Node>) -> Self {
        Self::with_children(NodeKind::Scale(factors), children)
    }

    pub fn material(material: Material, children: impl IntoIterator<Item = Node>) -> Self {
        Self::with_children(NodeKind::Material(material), children)
    }

    pub fn name(name: impl ToString, children: impl IntoIterator<Item = Node>) -> Self {
        Self::with_children(NodeKind::Name(name.to_string()), children)
    }

    pub fn logging(element_id: impl ToString, children: impl IntoIterator<Item = Node>) -> Self {
        Self::with_children(NodeKind::Logging(element_id.to_string()), children)
    }

    pub fn load(uri: impl ToString) -> Self {
        Self::new(NodeKind::Load(uri.to_string()))
    }

    pub fn sphere(sphere: Sphere) -> Self {
        Self::new(NodeKind::Geometry(Geometry::Sphere(sphere)))
    }

    pub fn cube(cube: Cube) -> Self {
        Self::new(NodeKind::Geometry(Geometry::Cube(cube)))
    }

    pub fn mesh(data: MeshData) -> Self {
        Self::new(NodeKind::Geometry(Geometry::Mesh(Arc::new(data))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::vec3;

    #[test]
    fn iteration_is_depth_first() {
        let tree = Node::name(
            "root",
            [
                Node::name("a", [Node::name("a1", [])]),
                Node::name("b", []),
            ],
        );

        let order: Vec<_> = tree
            .iter()
            .map(|node| match &node.kind {
                NodeKind::Name(name) => name.as_str(),
                _ => unreachable!(),
            })
            .collect();

        assert_eq!(order, ["root", "a", "a1", "b"]);
        assert_eq!(tree.count(), 4);
    }

    #[test]
    fn builder_helpers() {
        let node = Node::translate(vec3(1.0, 0.0, 0.0), [])
            .child(Node::sphere(Sphere::default()))
            .child(Node::load("http://example.com/asset.js"));

        assert_eq!(node.kind.type_name(), "translate");
        assert_eq!(node.children.len(), 2);
        assert_eq!(node.children[0].kind.type_name(), "sphere");
        assert_eq!(
            node.children[1].kind,
            NodeKind::Load(String::from("http://example.com/asset.js"))
        );
    }
}
