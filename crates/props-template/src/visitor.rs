//! The node traversal protocol.
//!
//! Builder code is written once against [`NodeVisitor`] and can be driven by
//! either implementation: [`RenderVisitor`](crate::RenderVisitor) emits JSON,
//! [`SearchVisitor`](crate::SearchVisitor) walks the same calls looking for
//! one node. The ergonomic surface lives in [`Dsl`], which every visitor
//! gets for free.
use crate::{Error, options::Options, partial::Partial, value::Record, value::Value};

/// The body of a node.
pub type Block<'b> = dyn FnMut(&mut dyn NodeVisitor) -> Result<(), Error> + 'b;

/// The body of a collection item: visitor, item and position.
pub type ItemBlock<'b> = dyn FnMut(&mut dyn NodeVisitor, &Value, usize) -> Result<(), Error> + 'b;

/// Object-safe traversal interface.
pub trait NodeVisitor {
    /// Assigns a scalar under `key`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidScopeForObj`] when the node is an array.
    fn visit_value(&mut self, key: &str, value: &Value) -> Result<(), Error>;

    /// Assigns the node built by `block` under `key`.
    ///
    /// # Errors
    ///
    /// Scope violations and any error raised while building the node.
    fn visit_set(&mut self, key: &str, options: Options, block: &mut Block<'_>)
    -> Result<(), Error>;

    /// Turns the node into an array with one element per item.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidScopeForArray`] when the node's scope is already
    /// resolved, and any error raised while building an element.
    fn visit_array(
        &mut self,
        collection: &[Value],
        options: Options,
        block: &mut ItemBlock<'_>,
    ) -> Result<(), Error>;

    /// Turns the node into an array whose elements are added by
    /// [`NodeVisitor::visit_child`].
    ///
    /// # Errors
    ///
    /// [`Error::InvalidScopeForArray`] when the node's scope is already
    /// resolved.
    fn visit_children(&mut self, block: &mut Block<'_>) -> Result<(), Error>;

    /// Appends one element to the enclosing bare array.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidScopeForChild`] outside a bare array,
    /// [`Error::MissingBlock`] without a block.
    fn visit_child(&mut self, block: Option<&mut Block<'_>>) -> Result<(), Error>;

    /// Renders `partial` into the node being built, without opening a key.
    ///
    /// # Errors
    ///
    /// [`Error::MissingPartial`] when there is no such template, and any
    /// error raised by the partial's builder calls.
    fn visit_partial(&mut self, partial: &Partial) -> Result<(), Error>;

    /// Dotted path from the root to the node being built.
    fn traveled_path(&self) -> String;

    /// Renders deferred nodes in place for the rest of the render.
    fn disable_deferments(&mut self);
}

/// A field copied by [`Dsl::extract`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field<'a> {
    Same(&'a str),
    /// `(source, destination)`
    Renamed(&'a str, &'a str),
}

impl<'a> From<&'a str> for Field<'a> {
    fn from(name: &'a str) -> Self {
        Self::Same(name)
    }
}

impl<'a> From<(&'a str, &'a str)> for Field<'a> {
    fn from((source, destination): (&'a str, &'a str)) -> Self {
        Self::Renamed(source, destination)
    }
}

/// The builder DSL.
///
/// ```
/// use props_template::{Dsl, Env, RenderVisitor, Value};
///
/// let mut json = RenderVisitor::new(Env::new());
/// json.object("outer", |json| {
///     json.array(&[Value::from(1), Value::from(2)], |json, n, _| json.set("foo", n))
/// })
/// .unwrap();
/// assert_eq!(json.result(), r#"{"outer":[{"foo":1},{"foo":2}]}"#);
/// ```
pub trait Dsl: NodeVisitor {
    /// # Errors
    ///
    /// See [`NodeVisitor::visit_value`].
    fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<(), Error> {
        self.visit_value(key, &value.into())
    }

    /// # Errors
    ///
    /// See [`NodeVisitor::visit_set`].
    fn object<F>(&mut self, key: &str, mut block: F) -> Result<(), Error>
    where
        F: FnMut(&mut dyn NodeVisitor) -> Result<(), Error>,
    {
        self.visit_set(key, Options::default(), &mut block)
    }

    /// # Errors
    ///
    /// [`Error::InvalidOption`] for an invalid option set, otherwise see
    /// [`NodeVisitor::visit_set`].
    fn set_with<F>(&mut self, key: &str, options: Options, mut block: F) -> Result<(), Error>
    where
        F: FnMut(&mut dyn NodeVisitor) -> Result<(), Error>,
    {
        options.validate()?;
        self.visit_set(key, options, &mut block)
    }

    /// # Errors
    ///
    /// See [`NodeVisitor::visit_array`].
    fn array<F>(&mut self, collection: &[Value], mut block: F) -> Result<(), Error>
    where
        F: FnMut(&mut dyn NodeVisitor, &Value, usize) -> Result<(), Error>,
    {
        self.visit_array(collection, Options::default(), &mut block)
    }

    /// # Errors
    ///
    /// [`Error::InvalidOption`] for an invalid option set, otherwise see
    /// [`NodeVisitor::visit_array`].
    fn array_with<F>(&mut self, collection: &[Value], options: Options, mut block: F) -> Result<(), Error>
    where
        F: FnMut(&mut dyn NodeVisitor, &Value, usize) -> Result<(), Error>,
    {
        options.validate()?;
        self.visit_array(collection, options, &mut block)
    }

    /// # Errors
    ///
    /// See [`NodeVisitor::visit_children`].
    fn array_children<F>(&mut self, mut block: F) -> Result<(), Error>
    where
        F: FnMut(&mut dyn NodeVisitor) -> Result<(), Error>,
    {
        self.visit_children(&mut block)
    }

    /// # Errors
    ///
    /// See [`NodeVisitor::visit_child`].
    fn child<F>(&mut self, mut block: F) -> Result<(), Error>
    where
        F: FnMut(&mut dyn NodeVisitor) -> Result<(), Error>,
    {
        self.visit_child(Some(&mut block))
    }

    /// Renders a partial's contents straight into the node, the way a block
    /// would.
    ///
    /// ```
    /// use props_template::{Dsl, Env, Partial, Partials, RenderVisitor};
    ///
    /// let partials = Partials::new().with("_profile", |json, locals| {
    ///     json.set("email", &locals["email"])
    /// });
    /// let mut json = RenderVisitor::new(Env::new().partials(&partials));
    /// json.partial(Partial::new("_profile").local("email", "joe@joe.com"))
    ///     .unwrap();
    /// assert_eq!(json.result(), r#"{"email":"joe@joe.com"}"#);
    /// ```
    ///
    /// # Errors
    ///
    /// See [`NodeVisitor::visit_partial`].
    fn partial(&mut self, partial: impl Into<Partial>) -> Result<(), Error> {
        self.visit_partial(&partial.into())
    }

    /// Copies `fields` of `record` into the node. Missing fields are `null`.
    ///
    /// # Errors
    ///
    /// See [`NodeVisitor::visit_value`].
    fn extract<'f, R, I>(&mut self, record: &R, fields: I) -> Result<(), Error>
    where
        R: Record + ?Sized,
        I: IntoIterator,
        I::Item: Into<Field<'f>>,
    {
        for field in fields {
            let (source, destination) = match field.into() {
                Field::Same(name) => (name, name),
                Field::Renamed(source, destination) => (source, destination),
            };
            let value = record.field(source).unwrap_or_default();
            self.visit_value(destination, &value)?;
        }
        Ok(())
    }
}

impl<T: NodeVisitor + ?Sized> Dsl for T {}
