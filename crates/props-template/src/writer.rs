//! Streaming JSON writer.
//!
//! The writer appends JSON text left to right and keeps one frame per open
//! container. Separators are driven by an explicit *slot*: a slot is opened
//! (writing any separator the position needs) before a value is written, and
//! closed once the value is complete. Opening a slot is idempotent, which lets
//! callers open it, take a [`Mark`], and later read back exactly the value
//! text without a leading comma.
use crate::{
    buffer::{Mark, OutputBuffer},
    value::{Value, push_quoted},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    Object,
    Array,
}

#[derive(Debug)]
struct Frame {
    kind: Container,
    len: usize,
}

#[derive(Debug, Default)]
pub(crate) struct JsonWriter {
    buf: OutputBuffer,
    frames: Vec<Frame>,
    slot_open: bool,
}

impl JsonWriter {
    #[cfg(test)]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Opens the slot for the next value, writing an array separator when the
    /// value is not the first element.
    pub(crate) fn open_slot(&mut self) {
        if self.slot_open {
            return;
        }
        if let Some(frame) = self.frames.last_mut() {
            if frame.kind == Container::Array {
                if frame.len > 0 {
                    self.buf.push(',');
                }
                frame.len += 1;
            }
        }
        self.slot_open = true;
    }

    pub(crate) fn push_key(&mut self, key: &str) {
        debug_assert!(!self.slot_open, "key written while a value slot is open");
        if let Some(frame) = self.frames.last_mut() {
            debug_assert_eq!(frame.kind, Container::Object);
            if frame.len > 0 {
                self.buf.push(',');
            }
            frame.len += 1;
        }
        push_quoted(self.buf.text_mut(), key);
        self.buf.push(':');
        self.slot_open = true;
    }

    pub(crate) fn push_object(&mut self) {
        self.open_slot();
        self.buf.push('{');
        self.frames.push(Frame {
            kind: Container::Object,
            len: 0,
        });
        self.slot_open = false;
    }

    pub(crate) fn push_array(&mut self) {
        self.open_slot();
        self.buf.push('[');
        self.frames.push(Frame {
            kind: Container::Array,
            len: 0,
        });
        self.slot_open = false;
    }

    pub(crate) fn push_value(&mut self, value: &Value) {
        use core::fmt::Write;

        self.open_slot();
        // Writing into a `String` cannot fail.
        let _ = write!(self.buf.text_mut(), "{value}");
        self.slot_open = false;
    }

    /// Splices already serialized JSON into the current slot.
    pub(crate) fn push_json(&mut self, raw: &str) {
        self.open_slot();
        self.buf.push_str(raw);
        self.slot_open = false;
    }

    /// Closes the innermost open container.
    pub(crate) fn pop(&mut self) {
        if let Some(frame) = self.frames.pop() {
            self.buf.push(match frame.kind {
                Container::Object => '}',
                Container::Array => ']',
            });
        }
        self.slot_open = false;
    }

    /// Opens the slot and bookmarks the position right after its separator.
    pub(crate) fn mark(&mut self) -> Mark {
        self.open_slot();
        self.buf.mark()
    }

    pub(crate) fn since(&self, mark: Mark) -> &str {
        self.buf.since(mark)
    }

    pub(crate) fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Closes every open container and returns the text.
    pub(crate) fn into_string(mut self) -> String {
        while !self.frames.is_empty() {
            self.pop();
        }
        self.buf.into_string()
    }
}
