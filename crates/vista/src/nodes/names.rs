use itertools::Itertools;
use std::fmt::{self, Display};
use thiserror::Error;

/// Separator between segments of a qualified name.
pub const NAME_SEPARATOR: char = '/';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("names can't be empty")]
    Empty,
    #[error("name `{0}` contains the reserved `/` separator")]
    ContainsSeparator(String),
}

/// Checks whether `name` can be used as a single name segment.
pub fn validate_name(name: &str) -> Result<(), NameError> {
    if name.is_empty() {
        Err(NameError::Empty)
    } else if name.contains(NAME_SEPARATOR) {
        Err(NameError::ContainsSeparator(name.to_string()))
    } else {
        Ok(())
    }
}

/// A qualified name, made of the names of all enclosing `name` nodes.
///
/// Two nodes named `left` in different groups end up with different paths, like
/// `spheres/blueGroup/left` and `spheres/greenGroup/left`.
///
/// ```
/// use vista::nodes::NamePath;
///
/// let path: NamePath = "spheres/blueGroup/left".parse().unwrap();
/// assert_eq!(path.leaf(), Some("left"));
/// assert_eq!(path.to_string(), "spheres/blueGroup/left");
/// assert!(path.starts_with(&"spheres".parse().unwrap()));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamePath(Vec<String>);

impl NamePath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// The innermost name segment.
    pub fn leaf(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    pub fn starts_with(&self, prefix: &NamePath) -> bool {
        self.0.starts_with(&prefix.0)
    }

    pub(crate) fn from_segments(segments: &[String]) -> Self {
        Self(segments.to_vec())
    }

    pub(crate) fn push(&mut self, segment: String) {
        self.0.push(segment);
    }

    pub(crate) fn pop(&mut self) -> Option<String> {
        self.0.pop()
    }
}

impl Display for NamePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().join("/"))
    }
}

impl std::str::FromStr for NamePath {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments = s
            .split(NAME_SEPARATOR)
            .map(|segment| validate_name(segment).map(|_| segment.to_string()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self(segments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_validation() {
        assert_eq!(validate_name(""), Err(NameError::Empty));
        assert_eq!(
            validate_name("a/b"),
            Err(NameError::ContainsSeparator(String::from("a/b")))
        );
        assert!(validate_name("blueGroup").is_ok());
    }

    #[test]
    fn paths_parse_and_compare() {
        let mut path = NamePath::new();
        path.push(String::from("spheres"));
        path.push(String::from("redGroup"));
        path.push(String::from("front"));

        assert_eq!(path, "spheres/redGroup/front".parse().unwrap());
        assert_eq!(path.depth(), 3);
        assert_eq!(path.pop().as_deref(), Some("front"));
        assert_eq!(path.leaf(), Some("redGroup"));

        assert!("spheres//front".parse::<NamePath>().is_err());
        assert!("".parse::<NamePath>().is_err());
    }
}
