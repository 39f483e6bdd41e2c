use std::time::Duration;

use crate::{
    Error, PathSegment,
    cache::{Cache, CacheKey},
    deferment::Defer,
    partial::Partial,
    path::Path,
    value::{Record, Value},
};

/// The addressing attribute of collection items.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct IdKey {
    pub(crate) name: String,
    /// The item's attribute value, once resolved.
    pub(crate) value: Option<Value>,
}

/// Extensions attached to a single node.
///
/// ```
/// use props_template::{Defer, Options, Partial, path};
///
/// let options = Options::new()
///     .partial(Partial::new("_post").fragment("post"))
///     .defer(Defer::auto())
///     .id_key("id")
///     .cache("posts-v1");
/// assert!(options.validate().is_ok());
/// assert!(Options::new().validate().is_err());
///
/// let dig = Options::new().dig(path!["data", "posts", 1]);
/// assert!(dig.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub(crate) partial: Option<Partial>,
    pub(crate) defer: Option<Defer>,
    pub(crate) cache: Option<Cache>,
    pub(crate) fragment: Option<String>,
    pub(crate) key: Option<IdKey>,
    pub(crate) search: Option<Path>,
    /// Segments pushed after the node's key. Set on a node found by a search
    /// so paths recorded inside it stay relative to the full tree.
    pub(crate) path_suffix: Path,
}

impl Options {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders the node with a partial instead of its block.
    #[must_use]
    pub fn partial(mut self, partial: impl Into<Partial>) -> Self {
        self.partial = Some(partial.into());
        self
    }

    #[must_use]
    pub fn defer(mut self, defer: impl Into<Defer>) -> Self {
        self.defer = Some(defer.into());
        self
    }

    #[must_use]
    pub fn cache(mut self, cache: impl Into<Cache>) -> Self {
        self.cache = Some(cache.into());
        self
    }

    /// Caches each collection item under a key derived from the item.
    #[must_use]
    pub fn cache_with<F>(self, derive: F) -> Self
    where
        F: Fn(&Value) -> String + Send + Sync + 'static,
    {
        self.cache(Cache::new(CacheKey::derive(derive)))
    }

    /// Caches under `key` for at most `ttl`.
    #[must_use]
    pub fn cache_for(self, key: impl Into<CacheKey>, ttl: Duration) -> Self {
        self.cache(Cache::new(key).expires_in(ttl))
    }

    /// Tags the node as a fragment.
    #[must_use]
    pub fn fragment(mut self, id: impl Into<String>) -> Self {
        self.fragment = Some(id.into());
        self
    }

    /// Addresses collection items by the attribute `name` instead of by
    /// position. The attribute is also added to each rendered item.
    #[must_use]
    pub fn id_key(mut self, name: impl Into<String>) -> Self {
        self.key = Some(IdKey {
            name: name.into(),
            value: None,
        });
        self
    }

    /// Renders only the node at `path`, which starts with the key of the
    /// node carrying this option. An empty path renders normally.
    #[must_use]
    pub fn dig(mut self, path: impl Into<Path>) -> Self {
        self.search = Some(path.into());
        self
    }

    /// Same as [`Options::dig`].
    #[must_use]
    pub fn search(self, path: impl Into<Path>) -> Self {
        self.dig(path)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.partial.is_none()
            && self.defer.is_none()
            && self.cache.is_none()
            && self.fragment.is_none()
            && self.key.is_none()
            && self.search.is_none()
            && self.path_suffix.is_empty()
    }

    /// Checks an explicitly passed option set.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidOption`] when the set is empty or names a partial
    /// without a name.
    pub fn validate(&self) -> Result<(), Error> {
        if self.is_empty() {
            return Err(Error::InvalidOption("options can't be empty"));
        }
        if self.partial.as_ref().is_some_and(|p| p.name.is_empty()) {
            return Err(Error::InvalidOption("the partial option requires a partial name"));
        }
        Ok(())
    }

    /// Whether rendering the node goes through the extension pipeline.
    pub(crate) fn has_extensions(&self) -> bool {
        self.partial.is_some()
            || self.defer.is_some()
            || self.cache.is_some()
            || self.fragment.is_some()
            || self.key.is_some()
    }

    /// Resolves everything that depends on the collection item: the
    /// addressing value, the partial's collection local, a derived defer type
    /// and a derived cache key. Derived defer types are only evaluated when
    /// deferment is enabled.
    pub(crate) fn refine(mut self, item: Option<&Value>, deferments: bool) -> Result<Self, Error> {
        if let Some(item) = item {
            if let Some(key) = &mut self.key {
                key.value = item.field(&key.name).filter(|v| !v.is_null());
            }
            if let Some(partial) = &mut self.partial {
                partial.bind(item)?;
            }
        }

        self.defer = match self.defer.take() {
            Some(defer) if deferments => defer.resolve(item.unwrap_or(&Value::Null)),
            _ => None,
        };

        if let Some(cache) = &mut self.cache {
            if let CacheKey::Derived(_) = cache.key {
                let item = item.ok_or(Error::InvalidOption(
                    "a derived cache key can only be used with a collection",
                ))?;
                cache.key = cache.key.resolve(item);
            }
        }
        Ok(self)
    }

    /// The path segment of a collection item: `name=value` when addressed by
    /// attribute, its position otherwise.
    pub(crate) fn item_segment(&self, index: usize) -> PathSegment {
        match &self.key {
            Some(IdKey {
                name,
                value: Some(value),
            }) => PathSegment::id(name, value),
            _ => PathSegment::Index(index),
        }
    }

    /// The resolved `(name, value)` of the addressing attribute.
    pub(crate) fn key_pair(&self) -> Option<(&str, &Value)> {
        let key = self.key.as_ref()?;
        Some((key.name.as_str(), key.value.as_ref()?))
    }
}

/// Render-wide configuration.
///
/// # Examples
///
/// ```rust
/// use props_template::RenderOptions;
///
/// let options = RenderOptions {
///     perform_caching: false,
///     ..Default::default()
/// };
/// assert!(options.deferments);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Whether `cache` options read from and write to the store.
    ///
    /// When `false`, cached nodes are rendered every time and the store is
    /// never consulted.
    ///
    /// # Default
    ///
    /// `true`
    pub perform_caching: bool,

    /// Prefix of every cache key, joined with `/`.
    ///
    /// # Default
    ///
    /// `"props"`
    pub cache_namespace: String,

    /// Whether `defer` options are honored.
    ///
    /// When `false`, deferred nodes render in place and no descriptors are
    /// recorded.
    ///
    /// # Default
    ///
    /// `true`
    pub deferments: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            perform_caching: true,
            cache_namespace: "props".to_owned(),
            deferments: true,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::path;

    #[test]
    fn empty_options_are_invalid() {
        assert!(matches!(
            Options::new().validate(),
            Err(Error::InvalidOption(_))
        ));
        assert!(matches!(
            Options::new().partial("").validate(),
            Err(Error::InvalidOption(_))
        ));
        assert!(Options::new().fragment("f").validate().is_ok());
    }

    #[test]
    fn refine_resolves_item_dependent_options() {
        let item = Value::object([("id", 7)]);
        let options = Options::new()
            .id_key("id")
            .partial("_post")
            .defer(Defer::derive(|_| Some("auto".to_owned())))
            .cache_with(|item| format!("post-{}", item.to_label()))
            .refine(Some(&item), true)
            .unwrap();

        assert_eq!(options.key_pair(), Some(("id", &Value::from(7))));
        assert_eq!(options.item_segment(3).to_string(), "id=7");
        assert_eq!(options.partial.as_ref().unwrap().locals["post"], item);
        assert_eq!(options.defer.as_ref().unwrap().kind_name(), Some("auto"));
        assert!(matches!(
            &options.cache.as_ref().unwrap().key,
            CacheKey::Literal(k) if k == r#"post-{"id":7}"#
        ));
    }

    #[test]
    fn disabled_deferment_drops_defer() {
        let options = Options::new()
            .defer(Defer::auto())
            .refine(None, false)
            .unwrap();
        assert!(options.defer.is_none());
    }

    #[test]
    fn missing_attribute_falls_back_to_position() {
        let options = Options::new()
            .id_key("id")
            .refine(Some(&Value::object([("name", "x")])), true)
            .unwrap();
        assert_eq!(options.key_pair(), None);
        assert_eq!(options.item_segment(2), PathSegment::Index(2));
    }

    #[test]
    fn derived_cache_keys_need_an_item() {
        let result = Options::new().cache_with(|_| String::new()).refine(None, true);
        assert!(matches!(result, Err(Error::InvalidOption(_))));
        let search = Options::new().dig(path!["a"]);
        assert_eq!(search.search, Some(path!["a"]));
    }
}
