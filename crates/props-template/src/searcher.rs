//! Path search over a builder tree.
//!
//! The searcher is driven by the same builder calls as a render but writes
//! nothing. It descends only into the branch matching the next segment of the
//! target path and, on reaching the last segment, renders the matched node
//! through its host renderer under the key the search started from. Every
//! call after the match is a no-op.
use tracing::trace;

use crate::{
    Error, PathSegment,
    fragment::fragment_ids,
    options::Options,
    partial::Partial,
    path::{Path, TraveledPath, join},
    render::RenderVisitor,
    value::{Record, Value},
    visitor::{Block, ItemBlock, NodeVisitor},
};

/// What a finished search found.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchOutcome {
    pub found: bool,
    /// Segments between the search root and the match.
    pub path_suffix: Path,
    /// Dotted path of the match, restarted at the innermost fragment
    /// traversed on the way.
    pub found_path: String,
    pub fragment_context: Option<String>,
}

/// A [`NodeVisitor`] that looks for one node.
pub struct SearchVisitor<'s, 'e> {
    host: &'s mut RenderVisitor<'e>,
    root_key: String,
    target: Path,
    depth: usize,
    traveled: TraveledPath,
    /// Start of the path reported back, moved past each fragment entered.
    fragment_base: usize,
    fragment_context: Option<String>,
    /// Position of the next `child` call in the enclosing bare array.
    child_index: Option<usize>,
    found: bool,
}

impl<'s, 'e> SearchVisitor<'s, 'e> {
    /// A search for `target` starting at the node `root_key` of `host`.
    /// The first segment of `target` addresses that node.
    pub(crate) fn new(host: &'s mut RenderVisitor<'e>, root_key: &str, target: Path) -> Self {
        Self {
            host,
            root_key: root_key.to_owned(),
            target,
            depth: 0,
            traveled: TraveledPath::new(),
            fragment_base: 0,
            fragment_context: None,
            child_index: None,
            found: false,
        }
    }

    pub(crate) fn finish(self) -> SearchOutcome {
        if !self.found {
            return SearchOutcome::default();
        }
        SearchOutcome {
            found: true,
            path_suffix: self.traveled.as_slice()[1..].to_vec(),
            found_path: join(&self.traveled.as_slice()[self.fragment_base..]),
            fragment_context: self.fragment_context,
        }
    }

    fn segment(&self) -> Option<&PathSegment> {
        self.target.get(self.depth)
    }

    fn at_last_segment(&self) -> bool {
        self.depth + 1 == self.target.len()
    }

    fn enter_fragment(&mut self, options: &Options) {
        if let Some(id) = fragment_ids(options).next() {
            self.fragment_context = Some(id.to_owned());
            self.fragment_base = self.traveled.len();
        }
    }

    /// Runs `search` one level down. A branch that misses restores the
    /// fragment context it started with.
    fn within<F>(&mut self, options: &Options, search: F) -> Result<(), Error>
    where
        F: FnOnce(&mut Self) -> Result<(), Error>,
    {
        let context = self.fragment_context.clone();
        let base = self.fragment_base;
        self.enter_fragment(options);
        let result = search(self);
        if !self.found {
            self.fragment_context = context;
            self.fragment_base = base;
        }
        result
    }

    /// Renders the matched node through the host.
    fn capture(&mut self, mut options: Options, block: &mut Block<'_>) -> Result<(), Error> {
        self.found = true;
        self.enter_fragment(&options);
        options.defer = None;
        options.search = None;
        options.path_suffix = self.traveled.as_slice()[1..].to_vec();
        trace!(path = %self.traveled, "search matched");
        self.host.visit_set(&self.root_key, options, block)
    }

    /// Descends one level into a matched node.
    fn descend(&mut self, options: &Options, block: &mut Block<'_>) -> Result<(), Error> {
        self.within(options, |this| {
            this.depth += 1;
            let enclosing = this.child_index.take();
            let result = match &options.partial {
                Some(partial) => {
                    let partials = this.host.partials();
                    partial.render(partials, this)
                }
                None => block(this),
            };
            this.child_index = enclosing;
            this.depth -= 1;
            result
        })
    }

    fn find_item<'c>(&self, collection: &'c [Value]) -> Option<(usize, &'c Value)> {
        match self.segment()? {
            PathSegment::Id { name, value } => collection
                .iter()
                .enumerate()
                .find(|(_, item)| item.field(name).is_some_and(|v| v.to_label() == **value)),
            segment => {
                let index = segment.as_index()?;
                collection.get(index).map(|item| (index, item))
            }
        }
    }
}

impl NodeVisitor for SearchVisitor<'_, '_> {
    fn visit_value(&mut self, _key: &str, _value: &Value) -> Result<(), Error> {
        Ok(())
    }

    fn visit_set(&mut self, key: &str, options: Options, block: &mut Block<'_>) -> Result<(), Error> {
        if self.found || !self.segment().is_some_and(|s| s.matches_key(key)) {
            return Ok(());
        }
        let len = self.traveled.len();
        self.traveled.push_key(key);
        if self.at_last_segment() {
            return self.capture(options, block);
        }
        self.descend(&options, block)?;
        if !self.found {
            self.traveled.truncate(len);
        }
        Ok(())
    }

    fn visit_array(
        &mut self,
        collection: &[Value],
        options: Options,
        block: &mut ItemBlock<'_>,
    ) -> Result<(), Error> {
        if self.found {
            return Ok(());
        }
        let Some((index, item)) = self.find_item(collection) else {
            return Ok(());
        };
        let options = options.refine(Some(item), false)?;
        let len = self.traveled.len();
        self.traveled.push(options.item_segment(index));

        let mut item_block = |visitor: &mut dyn NodeVisitor| block(visitor, item, index);
        if self.at_last_segment() {
            return self.capture(options, &mut item_block);
        }
        self.descend(&options, &mut item_block)?;
        if !self.found {
            self.traveled.truncate(len);
        }
        Ok(())
    }

    fn visit_children(&mut self, block: &mut Block<'_>) -> Result<(), Error> {
        if self.found {
            return Ok(());
        }
        let enclosing = self.child_index.replace(0);
        let result = block(self);
        self.child_index = enclosing;
        result
    }

    fn visit_child(&mut self, block: Option<&mut Block<'_>>) -> Result<(), Error> {
        if self.found {
            return Ok(());
        }
        let Some(next) = self.child_index.as_mut() else {
            return Err(Error::InvalidScopeForChild);
        };
        let index = *next;
        *next += 1;
        let block = block.ok_or(Error::MissingBlock)?;

        if self.segment().and_then(PathSegment::as_index) != Some(index) {
            return Ok(());
        }
        let len = self.traveled.len();
        self.traveled.push(PathSegment::Index(index));
        if self.at_last_segment() {
            return self.capture(Options::default(), block);
        }
        self.descend(&Options::default(), block)?;
        if !self.found {
            self.traveled.truncate(len);
        }
        Ok(())
    }

    fn visit_partial(&mut self, partial: &Partial) -> Result<(), Error> {
        if self.found {
            return Ok(());
        }
        let tagged = Options::new().partial(partial.clone());
        self.within(&tagged, |this| {
            let partials = this.host.partials();
            partial.render(partials, this)
        })
    }

    fn traveled_path(&self) -> String {
        self.traveled.join()
    }

    fn disable_deferments(&mut self) {}
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{Dsl, Env, path};

    #[test]
    fn outcome_reports_the_match() {
        let mut host = RenderVisitor::new(Env::new());
        let mut searcher = SearchVisitor::new(&mut host, "data", path!["data", "list", 1]);
        searcher
            .object("data", |json| {
                json.object("list", |json| {
                    json.array_children(|json| {
                        json.child(|json| json.set("n", 0))?;
                        json.child(|json| json.set("n", 1))
                    })
                })
            })
            .unwrap();
        let outcome = searcher.finish();
        assert!(outcome.found);
        assert_eq!(outcome.path_suffix, path!["list", 1]);
        assert_eq!(outcome.found_path, "data.list.1");
        assert_eq!(host.result(), r#"{"data":{"n":1}}"#);
    }

    #[test]
    fn misses_report_nothing() {
        let mut host = RenderVisitor::new(Env::new());
        let mut searcher = SearchVisitor::new(&mut host, "data", path!["data", "nope"]);
        searcher
            .object("data", |json| json.object("list", |_| Ok(())))
            .unwrap();
        assert_eq!(searcher.finish(), SearchOutcome::default());
        assert_eq!(host.result(), "{}");
    }
}
