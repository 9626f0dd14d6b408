//! Various utilities shared by the Vista crates

mod pool;
pub use pool::*;

pub mod fnv1a;
pub use fnv1a::fnv1a_hash;

mod result_ext;
pub use result_ext::AnyhowResultExt;

pub type AnyResult<T = (), E = anyhow::Error> = anyhow::Result<T, E>;

/// Shorthand for `Ok(())`, cause it looks ugly
pub const fn ok<E>() -> Result<(), E> {
    Ok(())
}
