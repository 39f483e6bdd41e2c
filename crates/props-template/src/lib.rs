//! A streaming JSON tree builder.
//!
//! Documents are described by builder calls (`set`, `array`, `child`) made
//! against a [`NodeVisitor`]. The [`RenderVisitor`] writes JSON text as the
//! calls happen, tracking whether each node is an object or an array from the
//! first call made inside it. Nodes can be cached as raw JSON and spliced back
//! on later renders, deferred behind a placeholder for a follow-up request,
//! tagged as fragments, or rendered by a partial. A `dig` option turns the
//! same calls into a search that renders a single node of the tree.

#![allow(missing_docs)]

mod buffer;
mod builder;
mod cache;
mod deferment;
mod error;
mod fragment;
mod options;
mod partial;
mod path;
mod path_segment;
mod render;
mod request;
mod searcher;
mod value;
mod visitor;
mod writer;

#[cfg(test)]
mod tests;

pub use builder::Scope;
pub use cache::{Cache, CacheEntry, CacheKey, CacheOptions, CacheStore, MemoryStore, NullStore};
pub use deferment::{Defer, DeferKind, DeferredDescriptor};
pub use error::{BoxError, Error};
pub use fragment::FragmentDescriptor;
pub use options::{Options, RenderOptions};
pub use partial::{Locals, NoPartials, Partial, PartialRenderer, Partials, TemplateHandle};
pub use path::{Path, TraveledPath};
pub use path_segment::{PathSegment, PathSegmentFrom};
pub use render::{Env, RenderVisitor, Rendered};
pub use request::RequestContext;
pub use searcher::{SearchOutcome, SearchVisitor};
pub use value::{Array, Map, Number, Record, Value};
pub use visitor::{Block, Dsl, Field, ItemBlock, NodeVisitor};

#[doc(hidden)]
pub use std::vec;

/// Macro to build a `Vec<PathSegment>` from a heterogeneous list of keys and
/// indices. String segments are parsed, so `"id=7"` is an id segment and
/// `"1"` an index.
///
/// ```rust
/// # use props_template::{path, PathSegment};
/// let p = path!["posts", 0, "id=7"];
/// assert_eq!(
///     p,
///     vec![
///         PathSegment::Key("posts".into()),
///         PathSegment::Index(0),
///         PathSegment::Id { name: "id".into(), value: "7".into() },
///     ]
/// );
/// ```
#[macro_export]
macro_rules! path {
    ( $( $elem:expr ),* $(,)? ) => {{
        use $crate::PathSegmentFrom;
        $crate::vec![$($crate::PathSegment::from_path_segment($elem)),*]
    }};
}
