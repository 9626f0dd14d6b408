//! Vista, a declarative scene graph engine
//!
//! Scenes are described as trees of [`nodes::Node`]s: cameras, lights, transforms, materials,
//! names, geometry, and `load` nodes that pull parts of the tree from elsewhere. A
//! [`scene::Scene`] owns such a tree and turns it into [`graphics::Frame`]s, one per
//! [`scene::Scene::render`] call.
//!
//! ## Modules
//!  * [`nodes`] - the node tree, its parameters, and its serialized forms
//!  * [`scene`] - scenes, the render loop, and process tracking
//!  * [`assets`] - asynchronous asset fetching, parsing and caching
//!  * [`graphics`] - frames, meshes, cameras, and render backends
//!  * [`picking`] - named subtrees and pick testing
//!  * [`config`] - the engine configuration file

pub mod assets;
pub mod config;
pub mod graphics;
pub mod nodes;
pub mod picking;
pub mod scene;

pub use scene::{Scene, SceneError, SceneOptions};
