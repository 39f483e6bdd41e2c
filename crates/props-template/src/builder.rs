//! The scope state machine.
//!
//! Every node's block starts [`Scope::Undetermined`]. The first structural
//! call made inside it commits the node: `set`/`extract` to an object, `array`
//! to an array. The commitment is write-once for the rest of the block and is
//! reset for every child context opened below it.
use crate::{Error, buffer::Mark, value::Value, writer::JsonWriter};

/// The structural kind a node is committed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    #[default]
    Undetermined,
    Object,
    Array,
}

/// Scope of the enclosing node, saved while a child context is open.
#[derive(Debug)]
#[must_use]
pub(crate) struct Enclosing {
    scope: Scope,
    children: Option<usize>,
}

#[derive(Debug, Default)]
pub(crate) struct ScopeBuilder {
    writer: JsonWriter,
    scope: Scope,
    /// `Some(next index)` while inside an `array!` with no collection.
    children: Option<usize>,
}

impl ScopeBuilder {
    #[cfg(test)]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn scope(&self) -> Scope {
        self.scope
    }

    /// Fails when a key cannot be set on the current node.
    pub(crate) fn check_object(&self) -> Result<(), Error> {
        if self.scope == Scope::Array {
            return Err(Error::InvalidScopeForObj);
        }
        Ok(())
    }

    fn commit_object(&mut self) -> Result<(), Error> {
        self.check_object()?;
        if self.scope == Scope::Undetermined {
            self.scope = Scope::Object;
            self.writer.push_object();
        }
        Ok(())
    }

    /// Assigns a scalar under `key`.
    pub(crate) fn set_value(&mut self, key: &str, value: &Value) -> Result<(), Error> {
        self.commit_object()?;
        self.writer.push_key(key);
        self.writer.push_value(value);
        Ok(())
    }

    /// Writes `key` and leaves its value slot open for a block.
    pub(crate) fn begin_set(&mut self, key: &str) -> Result<(), Error> {
        self.commit_object()?;
        self.writer.push_key(key);
        Ok(())
    }

    /// Commits the node to an array. `bare` arrays accept `child` calls.
    pub(crate) fn begin_array(&mut self, bare: bool) -> Result<(), Error> {
        if self.scope != Scope::Undetermined {
            return Err(Error::InvalidScopeForArray);
        }
        self.scope = Scope::Array;
        self.children = bare.then_some(0);
        self.writer.push_array();
        Ok(())
    }

    /// Claims the next child index of a bare array.
    pub(crate) fn begin_child(&mut self) -> Result<usize, Error> {
        match (self.scope, self.children.as_mut()) {
            (Scope::Array, Some(next)) => {
                let index = *next;
                *next += 1;
                Ok(index)
            }
            _ => Err(Error::InvalidScopeForChild),
        }
    }

    /// Opens a child context: the new node starts undetermined.
    pub(crate) fn open_content(&mut self) -> Enclosing {
        Enclosing {
            scope: core::mem::take(&mut self.scope),
            children: self.children.take(),
        }
    }

    /// Closes the child context, materializing an untouched node as `{}`.
    pub(crate) fn close_content(&mut self, enclosing: Enclosing) {
        if self.scope == Scope::Undetermined {
            self.writer.push_object();
        }
        self.writer.pop();
        self.scope = enclosing.scope;
        self.children = enclosing.children;
    }

    /// Writes a complete value into the current slot (placeholders).
    pub(crate) fn push_value(&mut self, value: &Value) {
        self.writer.push_value(value);
    }

    /// Splices raw JSON into the current slot.
    pub(crate) fn push_json(&mut self, raw: &str) {
        self.writer.push_json(raw);
    }

    pub(crate) fn mark(&mut self) -> Mark {
        self.writer.mark()
    }

    pub(crate) fn since(&self, mark: Mark) -> &str {
        self.writer.since(mark)
    }

    /// Closes the root and returns the document.
    pub(crate) fn finish(mut self) -> String {
        if self.scope == Scope::Undetermined && self.writer.depth() == 0 {
            self.writer.push_object();
        }
        self.writer.into_string()
    }
}
