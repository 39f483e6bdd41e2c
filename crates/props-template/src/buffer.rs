/// A length bookmark into an [`OutputBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Mark(usize);

/// Append-only JSON text.
///
/// Text is only ever appended, so a [`Mark`] taken earlier stays valid and
/// `since` returns exactly what was written after it.
#[derive(Debug, Default)]
pub(crate) struct OutputBuffer {
    text: String,
}

impl OutputBuffer {
    #[cfg(test)]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn push(&mut self, c: char) {
        self.text.push(c);
    }

    #[inline]
    pub(crate) fn push_str(&mut self, s: &str) {
        self.text.push_str(s);
    }

    /// Mutable access for writers that escape in place. Callers must only
    /// append.
    #[inline]
    pub(crate) fn text_mut(&mut self) -> &mut String {
        &mut self.text
    }

    pub(crate) fn mark(&self) -> Mark {
        Mark(self.text.len())
    }

    pub(crate) fn since(&self, mark: Mark) -> &str {
        &self.text[mark.0..]
    }

    pub(crate) fn into_string(self) -> String {
        self.text
    }
}
