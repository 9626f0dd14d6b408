//! Asset fragment loading
//!
//! `load` nodes pull parts of a scene from elsewhere. The flow of a single load is:
//!
//! 1. The scene sees an unrequested `load` node during a render, and asks the [`AssetCache`] for
//!    the URI. On a hit, the cached fragment is grafted right away.
//! 2. Otherwise, the scene registers a process and submits a job to the [`AssetLoader`]. The
//!    render continues without waiting.
//! 3. A fetch worker thread asks the [`AssetFetcher`] for the payload, strips any JSONP padding
//!    and parses the nodes, then posts the result back.
//! 4. The next render picks up the result, grafts the nodes, and retires the process.
//!
//! The engine doesn't come with a network stack. [`AssetFetcher`] is the seam where one plugs in,
//! and the bundled [`FileFetcher`] and [`StaticFetcher`] cover local and in-memory sources.

use crate::nodes::NodeParseError;
use thiserror::Error;

pub use url::Url;

#[doc(inline)]
pub use cache::*;
mod cache;

#[doc(inline)]
pub use fetcher::*;
mod fetcher;

#[doc(inline)]
pub use jsonp::*;
mod jsonp;

#[doc(inline)]
pub use loader::*;
mod loader;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to fetch `{uri}`: {message}")]
    Fetch { uri: String, message: String },
    #[error("malformed payload of `{uri}`: {source}")]
    Jsonp { uri: String, source: JsonpError },
    #[error("failed to parse `{uri}`: {source}")]
    Parse { uri: String, source: NodeParseError },
    #[error("couldn't start a fetch worker: {0}")]
    Spawn(std::io::Error),
    #[error("fetch workers are gone")]
    Disconnected,
}
