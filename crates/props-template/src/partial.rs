//! Partials: named, reusable builder bodies.
//!
//! A partial receives the visitor of the node it renders into, so under a
//! render its calls emit JSON and under a search they are matched like any
//! other node.
use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    sync::LazyLock,
};

use regex::Regex;
use tracing::trace;

use crate::{Error, error::BoxError, value::Value, visitor::NodeVisitor};

/// Local variables handed to a partial.
pub type Locals = BTreeMap<String, Value>;

/// A template resolved by [`PartialRenderer::find`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TemplateHandle(pub usize);

/// Finds and renders partials.
pub trait PartialRenderer {
    /// Looks up the template `name`. `local_names` are the locals it will be
    /// rendered with. Returns `Ok(None)` when there is no such template.
    ///
    /// # Errors
    ///
    /// Lookup failures other than a missing template.
    fn find(&self, name: &str, local_names: &[&str]) -> Result<Option<TemplateHandle>, BoxError>;

    /// Renders `template` into `visitor`.
    ///
    /// # Errors
    ///
    /// Any error raised by the partial's builder calls.
    fn render(
        &self,
        template: TemplateHandle,
        locals: &Locals,
        visitor: &mut dyn NodeVisitor,
    ) -> Result<(), Error>;
}

/// A renderer without templates; every lookup misses.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPartials;

impl PartialRenderer for NoPartials {
    fn find(&self, _name: &str, _local_names: &[&str]) -> Result<Option<TemplateHandle>, BoxError> {
        Ok(None)
    }

    fn render(
        &self,
        template: TemplateHandle,
        _locals: &Locals,
        _visitor: &mut dyn NodeVisitor,
    ) -> Result<(), Error> {
        Err(Error::MissingPartial(format!("#{}", template.0)))
    }
}

type PartialFn = dyn Fn(&mut dyn NodeVisitor, &Locals) -> Result<(), Error> + Send + Sync;

/// A registry of partials backed by closures.
///
/// ```
/// use props_template::{Dsl, Env, Options, Partial, Partials, RenderVisitor};
///
/// let partials = Partials::new().with("_post", |json, locals| {
///     json.set("title", &locals["post"])
/// });
/// let mut json = RenderVisitor::new(Env::new().partials(&partials));
/// let options = Options::new().partial(Partial::new("_post").local("post", "Hello"));
/// json.set_with("post", options, |_| Ok(())).unwrap();
/// assert_eq!(json.result(), r#"{"post":{"title":"Hello"}}"#);
/// ```
#[derive(Default)]
pub struct Partials {
    names: HashMap<String, usize>,
    templates: Vec<Box<PartialFn>>,
}

impl Partials {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `body` under `name`, replacing any earlier registration.
    #[must_use]
    pub fn with<F>(mut self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut dyn NodeVisitor, &Locals) -> Result<(), Error> + Send + Sync + 'static,
    {
        self.names.insert(name.into(), self.templates.len());
        self.templates.push(Box::new(body));
        self
    }
}

impl fmt::Debug for Partials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Partials")
            .field("names", &self.names)
            .finish_non_exhaustive()
    }
}

impl PartialRenderer for Partials {
    fn find(&self, name: &str, _local_names: &[&str]) -> Result<Option<TemplateHandle>, BoxError> {
        Ok(self.names.get(name).copied().map(TemplateHandle))
    }

    fn render(
        &self,
        template: TemplateHandle,
        locals: &Locals,
        visitor: &mut dyn NodeVisitor,
    ) -> Result<(), Error> {
        let body = self
            .templates
            .get(template.0)
            .ok_or_else(|| Error::MissingPartial(format!("#{}", template.0)))?;
        body(visitor, locals)
    }
}

/// The `partial` option of a node.
#[derive(Debug, Clone, Default)]
pub struct Partial {
    pub(crate) name: String,
    pub(crate) locals: Locals,
    pub(crate) as_name: Option<String>,
    pub(crate) fragment: Option<String>,
    pub(crate) template: Option<TemplateHandle>,
}

impl Partial {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn local(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.locals.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn locals(mut self, locals: Locals) -> Self {
        self.locals.extend(locals);
        self
    }

    /// Name of the local each collection item is bound to. Defaults to the
    /// partial's file name without its leading underscore and extensions.
    #[must_use]
    pub fn as_local(mut self, name: impl Into<String>) -> Self {
        self.as_name = Some(name.into());
        self
    }

    /// Tags the rendered node as a fragment.
    #[must_use]
    pub fn fragment(mut self, id: impl Into<String>) -> Self {
        self.fragment = Some(id.into());
        self
    }

    /// Binds `item` to the collection local.
    pub(crate) fn bind(&mut self, item: &Value) -> Result<(), Error> {
        let name = match &self.as_name {
            Some(name) if IDENTIFIER.is_match(name) => name.clone(),
            Some(name) => return Err(Error::InvalidOptionAs(name.clone())),
            None => retrieve_variable(&self.name)?,
        };
        self.locals.insert(name, item.clone());
        Ok(())
    }

    pub(crate) fn local_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.locals.keys().map(String::as_str).collect();
        if let Some(name) = &self.as_name {
            if !self.locals.contains_key(name) {
                names.push(name);
            }
        }
        names
    }

    /// Resolves the template, reusing the handle found earlier for the same
    /// collection.
    pub(crate) fn find(&self, renderer: &dyn PartialRenderer) -> Result<TemplateHandle, Error> {
        if let Some(handle) = self.template {
            return Ok(handle);
        }
        trace!(partial = %self.name, "finding template");
        renderer
            .find(&self.name, &self.local_names())
            .map_err(Error::Partial)?
            .ok_or_else(|| Error::MissingPartial(self.name.clone()))
    }

    /// Renders the partial into `visitor`.
    pub(crate) fn render(
        &self,
        renderer: &dyn PartialRenderer,
        visitor: &mut dyn NodeVisitor,
    ) -> Result<(), Error> {
        let handle = self.find(renderer)?;
        trace!(partial = %self.name, path = %visitor.traveled_path(), "rendering partial");
        renderer.render(handle, &self.locals, visitor)
    }
}

impl From<&str> for Partial {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Partial {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A[a-z_]\w*\z").expect("identifier pattern compiles"));

static PARTIAL_BASENAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A_?(.*?)(?:\.\w+)*\z").expect("basename pattern compiles"));

/// Derives the collection local from a partial path: `posts/_comment.json`
/// binds `comment`.
pub(crate) fn retrieve_variable(path: &str) -> Result<String, Error> {
    let base = if path.ends_with('/') {
        ""
    } else {
        path.rsplit('/').next().unwrap_or(path)
    };
    let variable = PARTIAL_BASENAME
        .captures(base)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
        .filter(|name| IDENTIFIER.is_match(name))
        .ok_or_else(|| Error::InvalidIdentifier(path.to_owned()))?;
    Ok(variable.to_owned())
}
