//! Serialized scene descriptions
//!
//! Nodes are written as objects with a `type` tag, the parameters of that type, and an optional
//! `nodes` array holding the children:
//! ```json
//! { "type": "translate", "x": -2, "z": -7, "nodes": [ { "type": "sphere" } ] }
//! ```
//!
//! The same schema is used for JSON asset fragments and TOML scene files. Both are first
//! deserialized into a [`serde_json::Value`], and then converted node by node, which keeps the
//! parameter structs free of any tree handling.

use super::{params::*, Node, NodeKind};
use glam::Vec3;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("expected a node object at `{path}`")]
    NotAnObject { path: String },
    #[error("node at `{path}` has no `type`")]
    MissingType { path: String },
    #[error("node at `{path}` has an unknown type `{kind}`")]
    UnknownType { path: String, kind: String },
    #[error("`nodes` of the node at `{path}` must be an array")]
    BadChildren { path: String },
    #[error("invalid parameters for `{kind}` node at `{path}`: {source}")]
    BadParameters {
        path: String,
        kind: String,
        source: serde_json::Error,
    },
}

/// Parses an asset fragment. The payload is either a single node object, or an array of them.
///
/// ```
/// let json = r#"[{ "type": "sphere" }, { "type": "cube" }]"#;
/// let nodes = vista::nodes::parse_fragment(json).unwrap();
/// assert_eq!(nodes.len(), 2);
/// ```
pub fn parse_fragment(text: &str) -> Result<Vec<Node>, NodeParseError> {
    let value: Value = serde_json::from_str(text)?;
    fragment_from_value(value)
}

/// Converts an already deserialized fragment value, see [`parse_fragment`].
pub fn fragment_from_value(value: Value) -> Result<Vec<Node>, NodeParseError> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| node_from_value(item, &format!("[{index}]")))
            .collect(),
        value => Ok(vec![node_from_value(value, "")?]),
    }
}

/// Parses a TOML scene file. The root table is the root node.
///
/// ```
/// let root = vista::nodes::parse_scene_toml(r#"
///     type = "renderer"
///
///     [[nodes]]
///     type = "sphere"
///     radius = 2.0
/// "#).unwrap();
/// assert_eq!(root.count(), 2);
/// ```
pub fn parse_scene_toml(text: &str) -> Result<Node, NodeParseError> {
    let value: Value = toml::from_str(text)?;
    node_from_value(value, "")
}

fn node_from_value(value: Value, path: &str) -> Result<Node, NodeParseError> {
    let Value::Object(mut object) = value else {
        return Err(NodeParseError::NotAnObject {
            path: display_path(path),
        });
    };

    let kind = match object.remove("type") {
        Some(Value::String(kind)) => kind,
        _ => {
            return Err(NodeParseError::MissingType {
                path: display_path(path),
            })
        }
    };
    let node_path = format!("{path}/{kind}");

    let children = match object.remove("nodes") {
        None => vec![],
        Some(Value::Array(items)) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| node_from_value(item, &format!("{node_path}[{index}]")))
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => return Err(NodeParseError::BadChildren { path: node_path }),
    };

    let kind = kind_from_params(&kind, object, &node_path)?;
    Ok(Node { kind, children })
}

fn kind_from_params(
    kind: &str,
    params: Map<String, Value>,
    path: &str,
) -> Result<NodeKind, NodeParseError> {
    let parsed = match kind {
        "node" => {
            parse_params::<Empty>(kind, params, path)?;
            NodeKind::Group
        }
        "renderer" => NodeKind::Renderer(parse_params(kind, params, path)?),
        "lights" => NodeKind::Lights(parse_params::<LightsParams>(kind, params, path)?.sources),
        "perspective" => NodeKind::Perspective(parse_params(kind, params, path)?),
        "lookAt" => NodeKind::LookAt(parse_params(kind, params, path)?),
        "translate" => NodeKind::Translate(parse_params::<Xyz>(kind, params, path)?.or(Vec3::ZERO)),
        "rotate" => NodeKind::Rotate(parse_params(kind, params, path)?),
        "scale" => NodeKind::Scale(parse_params::<Xyz>(kind, params, path)?.or(Vec3::ONE)),
        "material" => NodeKind::Material(parse_params(kind, params, path)?),
        "name" => NodeKind::Name(parse_params::<NameParams>(kind, params, path)?.name),
        "sphere" => NodeKind::Geometry(Geometry::Sphere(parse_params(kind, params, path)?)),
        "cube" => NodeKind::Geometry(Geometry::Cube(parse_params(kind, params, path)?)),
        "mesh" => {
            NodeKind::Geometry(Geometry::Mesh(Arc::new(parse_params(kind, params, path)?)))
        }
        "load" => NodeKind::Load(parse_params::<LoadParams>(kind, params, path)?.uri),
        "logging" => {
            NodeKind::Logging(parse_params::<LoggingParams>(kind, params, path)?.element_id)
        }
        unknown => {
            return Err(NodeParseError::UnknownType {
                path: display_path(path),
                kind: unknown.to_string(),
            })
        }
    };
    Ok(parsed)
}

#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct Empty {}

fn parse_params<T: DeserializeOwned>(
    kind: &str,
    params: Map<String, Value>,
    path: &str,
) -> Result<T, NodeParseError> {
    serde_json::from_value(Value::Object(params)).map_err(|source| NodeParseError::BadParameters {
        path: display_path(path),
        kind: kind.to_string(),
        source,
    })
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        String::from("/")
    } else {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::vec3;

    const BLUE_GROUP: &str = r#"
    {
        "type": "name", "name": "blueGroup",
        "nodes": [{
            "type": "material",
            "ambient": { "r": 0.2, "g": 0.2, "b": 0.5 },
            "shininess": 10,
            "nodes": [
                { "type": "name", "name": "left",
                  "nodes": [{ "type": "translate", "x": 0.5, "z": -2,
                              "nodes": [{ "type": "sphere" }] }] },
                { "type": "name", "name": "right",
                  "nodes": [{ "type": "translate", "x": 2, "nodes": [{ "type": "sphere" }] }] }
            ]
        }]
    }"#;

    #[test]
    fn parses_nested_json() {
        let nodes = parse_fragment(BLUE_GROUP).unwrap();
        assert_eq!(nodes.len(), 1);

        let group = &nodes[0];
        assert_eq!(group.kind, NodeKind::Name(String::from("blueGroup")));
        assert_eq!(group.count(), 8);

        let NodeKind::Material(material) = &group.children[0].kind else {
            panic!("expected a material node");
        };
        assert_eq!(material.shininess, 10.0);
        assert_eq!(material.ambient, Color::rgb(0.2, 0.2, 0.5));

        let translate = &group.children[0].children[0].children[0];
        assert_eq!(translate.kind, NodeKind::Translate(vec3(0.5, 0.0, -2.0)));
    }

    #[test]
    fn parses_toml_scene() {
        let root = parse_scene_toml(
            r#"
            type = "logging"
            elementId = "logging"

            [[nodes]]
            type = "scale"
            y = 2

            [[nodes.nodes]]
            type = "load"
            uri = "http://example.com/teapot.js"
            "#,
        )
        .unwrap();

        assert_eq!(root.kind, NodeKind::Logging(String::from("logging")));
        assert_eq!(root.children[0].kind, NodeKind::Scale(vec3(1.0, 2.0, 1.0)));
        assert_eq!(
            root.children[0].children[0].kind,
            NodeKind::Load(String::from("http://example.com/teapot.js"))
        );
    }

    #[test]
    fn reports_bad_input() {
        assert!(matches!(
            parse_fragment(r#"{ "name": "x" }"#),
            Err(NodeParseError::MissingType { .. })
        ));
        assert!(matches!(
            parse_fragment(r#"{ "type": "teapot" }"#),
            Err(NodeParseError::UnknownType { kind, .. }) if kind == "teapot"
        ));
        assert!(matches!(
            parse_fragment(r#"{ "type": "node", "nodes": { "type": "sphere" } }"#),
            Err(NodeParseError::BadChildren { .. })
        ));
        let bad_radius = r#"{ "type": "node", "nodes": [{ "type": "sphere", "radius": "big" }] }"#;
        assert!(matches!(
            parse_fragment(bad_radius),
            Err(NodeParseError::BadParameters { path, .. }) if path == "/node[0]/sphere"
        ));
        assert!(matches!(
            parse_fragment(r#"{ "type": "node", "colour": 1 }"#),
            Err(NodeParseError::BadParameters { .. })
        ));
        assert!(matches!(parse_fragment("[1]"), Err(NodeParseError::NotAnObject { .. })));
        assert!(matches!(parse_fragment("{"), Err(NodeParseError::Json(_))));
    }
}
