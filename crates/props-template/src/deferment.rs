//! Deferred rendering.
//!
//! A deferred node is not rendered. A placeholder takes its place in the
//! document and a [`DeferredDescriptor`] tells the client where to fetch the
//! real value: the current request path with its `props_at` query parameter
//! pointing at the node.
use std::{fmt, sync::Arc};

use url::{Position, Url};

use crate::{Error, value::Value};

type DeriveKind = dyn Fn(&Value) -> Option<String> + Send + Sync;

/// The type a deferred node is tagged with.
#[derive(Clone)]
pub enum DeferKind {
    Literal(String),
    /// Computed from the collection item; `None` renders the node normally.
    Derived(Arc<DeriveKind>),
}

impl fmt::Debug for DeferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(kind) => f.debug_tuple("Literal").field(kind).finish(),
            Self::Derived(_) => f.write_str("Derived(..)"),
        }
    }
}

/// The `defer` option of a node.
#[derive(Debug, Clone)]
pub struct Defer {
    pub(crate) kind: DeferKind,
    pub(crate) placeholder: Option<Value>,
    pub(crate) success_action: Option<String>,
    pub(crate) fail_action: Option<String>,
}

impl Defer {
    pub fn new(kind: impl Into<String>) -> Self {
        Self::with_kind(DeferKind::Literal(kind.into()))
    }

    /// Deferred and fetched by the client as soon as the page loads.
    #[must_use]
    pub fn auto() -> Self {
        Self::new("auto")
    }

    /// Deferred until the client asks for it.
    #[must_use]
    pub fn manual() -> Self {
        Self::new("manual")
    }

    /// Decides the type per collection item. Returning `None` renders the
    /// item normally.
    pub fn derive<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Option<String> + Send + Sync + 'static,
    {
        Self::with_kind(DeferKind::Derived(Arc::new(f)))
    }

    fn with_kind(kind: DeferKind) -> Self {
        Self {
            kind,
            placeholder: None,
            success_action: None,
            fail_action: None,
        }
    }

    /// Value written in place of the node. Defaults to `{}`.
    #[must_use]
    pub fn placeholder(mut self, value: impl Into<Value>) -> Self {
        self.placeholder = Some(value.into());
        self
    }

    #[must_use]
    pub fn success_action(mut self, action: impl Into<String>) -> Self {
        self.success_action = Some(action.into());
        self
    }

    #[must_use]
    pub fn fail_action(mut self, action: impl Into<String>) -> Self {
        self.fail_action = Some(action.into());
        self
    }

    /// Fixes the type against `item`, or returns `None` when the node should
    /// render normally.
    pub(crate) fn resolve(self, item: &Value) -> Option<Self> {
        match &self.kind {
            DeferKind::Literal(_) => Some(self),
            DeferKind::Derived(f) => {
                let kind = f(item)?;
                Some(Self {
                    kind: DeferKind::Literal(kind),
                    ..self
                })
            }
        }
    }

    pub(crate) fn kind_name(&self) -> Option<&str> {
        match &self.kind {
            DeferKind::Literal(kind) => Some(kind),
            DeferKind::Derived(_) => None,
        }
    }
}

impl From<&str> for Defer {
    fn from(kind: &str) -> Self {
        Self::new(kind)
    }
}

/// A record of one deferred node.
#[cfg_attr(
    any(test, feature = "serde"),
    derive(serde::Serialize, serde::Deserialize)
)]
#[cfg_attr(any(test, feature = "serde"), serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredDescriptor {
    /// The request path with `props_at` set to [`DeferredDescriptor::path`].
    pub url: String,
    pub path: String,
    #[cfg_attr(any(test, feature = "serde"), serde(rename = "type"))]
    pub kind: String,
    #[cfg_attr(
        any(test, feature = "serde"),
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub success_action: Option<String>,
    #[cfg_attr(
        any(test, feature = "serde"),
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub fail_action: Option<String>,
}

impl From<&DeferredDescriptor> for Value {
    fn from(d: &DeferredDescriptor) -> Self {
        let mut pairs = vec![
            ("url", Value::from(d.url.as_str())),
            ("path", Value::from(d.path.as_str())),
            ("type", Value::from(d.kind.as_str())),
        ];
        if let Some(action) = &d.success_action {
            pairs.push(("successAction", Value::from(action.as_str())));
        }
        if let Some(action) = &d.fail_action {
            pairs.push(("failAction", Value::from(action.as_str())));
        }
        Value::object(pairs)
    }
}

/// Rewrites `request_path` so its `props_at` query parameter is `path`.
/// Other parameters keep their order; any earlier `props_at` is dropped.
/// Absolute URLs keep their origin, relative ones stay relative.
pub(crate) fn props_at_url(request_path: &str, path: &str) -> Result<String, Error> {
    let (mut url, absolute) = match Url::parse(request_path) {
        Ok(url) => (url, true),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            (Url::parse("http://localhost")?.join(request_path)?, false)
        }
        Err(err) => return Err(err.into()),
    };
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(name, _)| name != "props_at")
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(&kept)
        .append_pair("props_at", path);
    if absolute {
        return Ok(url.into());
    }
    Ok(url[Position::BeforePath..].to_owned())
}
