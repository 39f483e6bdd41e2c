//! The rendering visitor.
//!
//! Every node goes through the same pipeline: a `dig` option hands the node
//! to a [`SearchVisitor`], a deferred node writes its placeholder, a cached
//! node splices or stores its JSON, and everything else runs its block (or
//! partial) in a fresh child scope.
use std::{collections::HashMap, fmt, mem};

use tracing::{debug, trace};

use crate::{
    Error, PathSegment,
    builder::{Scope, ScopeBuilder},
    cache::{Cache, CacheEntry, CacheKey, CacheStore, NullStore, expand_key},
    deferment::{Defer, DeferredDescriptor, props_at_url},
    fragment::{FragmentDescriptor, fragment_ids},
    options::{Options, RenderOptions},
    partial::{NoPartials, Partial, PartialRenderer},
    path::{Path, TraveledPath},
    request::RequestContext,
    searcher::SearchVisitor,
    value::Value,
    visitor::{Block, ItemBlock, NodeVisitor},
};

/// The collaborators and configuration of a render.
pub struct Env<'e> {
    pub(crate) partials: &'e dyn PartialRenderer,
    pub(crate) store: &'e dyn CacheStore,
    request: Box<dyn RequestContext + 'e>,
    pub(crate) options: RenderOptions,
}

impl Default for Env<'_> {
    fn default() -> Self {
        Self {
            partials: &NoPartials,
            store: &NullStore,
            request: Box::new("/"),
            options: RenderOptions::default(),
        }
    }
}

impl<'e> Env<'e> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn partials(mut self, partials: &'e dyn PartialRenderer) -> Self {
        self.partials = partials;
        self
    }

    #[must_use]
    pub fn store(mut self, store: &'e dyn CacheStore) -> Self {
        self.store = store;
        self
    }

    /// The request whose path deferment URLs are built from.
    #[must_use]
    pub fn request(mut self, request: impl RequestContext + 'e) -> Self {
        self.request = Box::new(request);
        self
    }

    #[must_use]
    pub fn options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }
}

impl fmt::Debug for Env<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Env")
            .field("request", &self.request.current_path())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Everything one render accumulates.
#[derive(Debug, Default)]
struct RenderState {
    builder: ScopeBuilder,
    path: TraveledPath,
    deferred: Vec<DeferredDescriptor>,
    fragments: Vec<FragmentDescriptor>,
    /// Entries read ahead by a collection's multi-fetch.
    prefetched: HashMap<String, CacheEntry>,
    deferments_disabled: bool,
    found_path: String,
    fragment_context: Option<String>,
}

/// The output of a finished render.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Rendered {
    pub json: String,
    pub deferred: Vec<DeferredDescriptor>,
    pub fragments: Vec<FragmentDescriptor>,
    /// Path of the node found by the last search, relative to its fragment
    /// when it was found inside one.
    pub found_path: String,
    /// The fragment the last search matched inside of.
    pub fragment_context: Option<String>,
}

/// Builds a JSON document from [`Dsl`](crate::Dsl) calls.
///
/// A visitor renders one document at a time. [`RenderVisitor::result`] and
/// [`RenderVisitor::finish`] hand the document out and start the next render
/// from a fresh state.
#[derive(Debug)]
pub struct RenderVisitor<'e> {
    env: Env<'e>,
    state: RenderState,
}

impl<'e> RenderVisitor<'e> {
    #[must_use]
    pub fn new(env: Env<'e>) -> Self {
        Self {
            env,
            state: RenderState::default(),
        }
    }

    /// Closes the document and returns it. The deferred and fragment lists
    /// are discarded; use [`RenderVisitor::finish`] to keep them.
    pub fn result(&mut self) -> String {
        self.finish().json
    }

    /// Closes the document and returns it with everything recorded along
    /// the way.
    pub fn finish(&mut self) -> Rendered {
        let state = mem::take(&mut self.state);
        Rendered {
            json: state.builder.finish(),
            deferred: state.deferred,
            fragments: state.fragments,
            found_path: state.found_path,
            fragment_context: state.fragment_context,
        }
    }

    /// Scope of the node being built.
    #[must_use]
    pub fn scope(&self) -> Scope {
        self.state.builder.scope()
    }

    #[must_use]
    pub fn deferred(&self) -> &[DeferredDescriptor] {
        &self.state.deferred
    }

    #[must_use]
    pub fn fragments(&self) -> &[FragmentDescriptor] {
        &self.state.fragments
    }

    #[must_use]
    pub fn found_path(&self) -> &str {
        &self.state.found_path
    }

    #[must_use]
    pub fn fragment_context(&self) -> Option<&str> {
        self.state.fragment_context.as_deref()
    }

    pub(crate) fn partials(&self) -> &'e dyn PartialRenderer {
        self.env.partials
    }

    fn deferments_enabled(&self) -> bool {
        self.env.options.deferments && !self.state.deferments_disabled
    }

    /// Searches `block` for `target` and renders the match, if any, under
    /// `key`. A miss writes nothing.
    fn search_set(
        &mut self,
        key: &str,
        target: Path,
        options: Options,
        block: &mut Block<'_>,
    ) -> Result<(), Error> {
        let outcome = {
            let mut searcher = SearchVisitor::new(self, key, target);
            searcher.visit_set(key, options, block)?;
            searcher.finish()
        };
        debug!(
            key,
            found = outcome.found,
            found_path = %outcome.found_path,
            "search finished"
        );
        self.state.found_path = outcome.found_path;
        self.state.fragment_context = outcome.fragment_context;
        Ok(())
    }

    /// Writes the value of the node whose slot is open.
    fn block_content(&mut self, mut options: Options, block: &mut Block<'_>) -> Result<(), Error> {
        if !options.has_extensions() {
            return self.content(&options, block);
        }

        if let Some(defer) = options.defer.take() {
            if let Some(kind) = defer.kind_name() {
                let placeholder = self.defer_node(&defer, kind, &options)?;
                self.state.builder.push_value(&placeholder);
                self.record_fragments(&options);
                return Ok(());
            }
        }

        match options.cache.take() {
            Some(cache) if self.env.options.perform_caching => {
                self.with_cache(&cache, |this| this.content(&options, block))
            }
            _ => self.content(&options, block),
        }
    }

    /// Renders the node in a fresh child scope, through its partial when it
    /// has one, then adds the addressing attribute.
    fn content(&mut self, options: &Options, block: &mut Block<'_>) -> Result<(), Error> {
        let enclosing = self.state.builder.open_content();
        self.record_fragments(options);
        match &options.partial {
            Some(partial) => {
                let partials = self.env.partials;
                partial.render(partials, self)?;
            }
            None => block(self)?,
        }
        if let Some((name, value)) = options.key_pair() {
            self.state.builder.set_value(name, value)?;
        }
        self.state.builder.close_content(enclosing);
        Ok(())
    }

    fn record_fragments(&mut self, options: &Options) {
        for id in fragment_ids(options) {
            self.record_fragment(id);
        }
    }

    fn record_fragment(&mut self, id: &str) {
        let path = self.state.path.join();
        trace!(id, path = %path, "fragment");
        self.state.fragments.push(FragmentDescriptor {
            id: id.to_owned(),
            path,
        });
    }

    /// Records the deferment and returns the placeholder to write.
    fn defer_node(&mut self, defer: &Defer, kind: &str, options: &Options) -> Result<Value, Error> {
        let placeholder = match options.key_pair() {
            Some((name, value)) if kind == "auto" => Value::object([(name, value.clone())]),
            _ => defer
                .placeholder
                .clone()
                .unwrap_or_else(|| Value::Object(crate::Map::new())),
        };
        let path = self.state.path.join();
        let url = props_at_url(self.env.request.current_path(), &path)?;
        trace!(kind, path = %path, url = %url, "deferred");
        self.state.deferred.push(DeferredDescriptor {
            url,
            path,
            kind: kind.to_owned(),
            success_action: defer.success_action.clone(),
            fail_action: defer.fail_action.clone(),
        });
        Ok(placeholder)
    }

    /// Splices the cached JSON for `cache`, or renders and stores it.
    ///
    /// On a miss the node renders against empty descriptor lists, so the
    /// entry holds exactly the descriptors recorded inside it. Both paths then
    /// append those descriptors to the enclosing lists.
    fn with_cache<F>(&mut self, cache: &Cache, render: F) -> Result<(), Error>
    where
        F: FnOnce(&mut Self) -> Result<(), Error>,
    {
        let CacheKey::Literal(key) = &cache.key else {
            return Err(Error::InvalidOption(
                "a derived cache key can only be used with a collection",
            ));
        };
        let key = expand_key(&self.env.options.cache_namespace, key);

        let hit = match self.state.prefetched.get(&key) {
            Some(entry) => Some(entry.clone()),
            None => self.env.store.get(&key).map_err(Error::Store)?,
        };
        if let Some(entry) = hit {
            debug!(key = %key, "cache hit");
            self.state.builder.push_json(&entry.raw_json);
            self.state.deferred.extend(entry.deferred);
            self.state.fragments.extend(entry.fragments);
            return Ok(());
        }

        debug!(key = %key, "cache miss");
        let outer_deferred = mem::take(&mut self.state.deferred);
        let outer_fragments = mem::take(&mut self.state.fragments);
        let mark = self.state.builder.mark();
        let rendered = render(self);
        let deferred = mem::replace(&mut self.state.deferred, outer_deferred);
        let fragments = mem::replace(&mut self.state.fragments, outer_fragments);
        rendered?;

        let entry = CacheEntry {
            raw_json: self.state.builder.since(mark).to_owned(),
            deferred,
            fragments,
        };
        self.env
            .store
            .put(&key, &entry, &cache.options)
            .map_err(Error::Store)?;
        debug!(key = %key, bytes = entry.raw_json.len(), "cache write");
        self.state.deferred.extend(entry.deferred);
        self.state.fragments.extend(entry.fragments);
        Ok(())
    }

    /// Refines the options of every item, finds a partial template once for
    /// the whole collection, and reads every cached item in one batch.
    fn refine_all_item_options(
        &mut self,
        collection: &[Value],
        options: &Options,
    ) -> Result<Vec<Options>, Error> {
        if collection.is_empty() {
            return Ok(Vec::new());
        }
        if !options.has_extensions() {
            return Ok(vec![Options::default(); collection.len()]);
        }

        let mut template = options.clone();
        if let Some(partial) = &mut template.partial {
            partial.template = Some(partial.find(self.env.partials)?);
        }

        let deferments = self.deferments_enabled();
        let all = collection
            .iter()
            .map(|item| template.clone().refine(Some(item), deferments))
            .collect::<Result<Vec<_>, _>>()?;

        if self.env.options.perform_caching {
            let namespace = &self.env.options.cache_namespace;
            let keys: Vec<String> = all
                .iter()
                .filter(|options| options.defer.is_none())
                .filter_map(|options| match options.cache.as_ref().map(|c| &c.key) {
                    Some(CacheKey::Literal(key)) => Some(expand_key(namespace, key)),
                    _ => None,
                })
                .collect();
            if !keys.is_empty() {
                let found = self.env.store.get_many(&keys).map_err(Error::Store)?;
                debug!(requested = keys.len(), found = found.len(), "cache multi-fetch");
                self.state.prefetched.extend(found);
            }
        }
        Ok(all)
    }
}

impl NodeVisitor for RenderVisitor<'_> {
    fn visit_value(&mut self, key: &str, value: &Value) -> Result<(), Error> {
        self.state.builder.set_value(key, value)
    }

    fn visit_set(
        &mut self,
        key: &str,
        mut options: Options,
        block: &mut Block<'_>,
    ) -> Result<(), Error> {
        if let Some(target) = options.search.take() {
            if !target.is_empty() {
                self.state.builder.check_object()?;
                return self.search_set(key, target, options, block);
            }
        }

        let options = options.refine(None, self.deferments_enabled())?;
        self.state.builder.begin_set(key)?;
        let depth = self.state.path.len();
        self.state.path.push_key(key);
        self.state.path.extend_from_slice(&options.path_suffix);
        let result = self.block_content(options, block);
        self.state.path.truncate(depth);
        result
    }

    fn visit_array(
        &mut self,
        collection: &[Value],
        options: Options,
        block: &mut ItemBlock<'_>,
    ) -> Result<(), Error> {
        self.state.builder.begin_array(false)?;
        let all = self.refine_all_item_options(collection, &options)?;

        for (index, (item, options)) in collection.iter().zip(all).enumerate() {
            let depth = self.state.path.len();
            self.state.path.push(options.item_segment(index));
            let mut item_block = |visitor: &mut dyn NodeVisitor| block(visitor, item, index);
            self.block_content(options, &mut item_block)?;
            self.state.path.truncate(depth);
        }
        Ok(())
    }

    fn visit_children(&mut self, block: &mut Block<'_>) -> Result<(), Error> {
        self.state.builder.begin_array(true)?;
        block(self)
    }

    fn visit_child(&mut self, block: Option<&mut Block<'_>>) -> Result<(), Error> {
        let index = self.state.builder.begin_child()?;
        let block = block.ok_or(Error::MissingBlock)?;
        let depth = self.state.path.len();
        self.state.path.push(PathSegment::Index(index));
        let enclosing = self.state.builder.open_content();
        block(self)?;
        self.state.builder.close_content(enclosing);
        self.state.path.truncate(depth);
        Ok(())
    }

    fn visit_partial(&mut self, partial: &Partial) -> Result<(), Error> {
        if let Some(id) = &partial.fragment {
            self.record_fragment(id);
        }
        let partials = self.env.partials;
        partial.render(partials, self)
    }

    fn traveled_path(&self) -> String {
        self.state.path.join()
    }

    fn disable_deferments(&mut self) {
        self.state.deferments_disabled = true;
    }
}
