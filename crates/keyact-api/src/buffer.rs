//! In-memory model of the text field the keyboard is editing.
//!
//! The buffer holds committed text, a cursor, and an optional composing
//! region. The composing region is the previewed-but-uncommitted text of a
//! live input transaction; it is shown at the cursor and is never part of
//! [`InputBuffer::text`].

use std::collections::VecDeque;

use keyact_core::MetaState;
use serde::Serialize;
use unicode_segmentation::UnicodeSegmentation;

/// Forwarded keys kept before the oldest is dropped.
pub const MAX_FORWARDED_KEYS: usize = 256;

/// A key event the keyboard passed through to the editor unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ForwardedKey {
    pub key_code: i32,
    #[serde(serialize_with = "serialize_meta")]
    pub meta_state: MetaState,
}

fn serialize_meta<S: serde::Serializer>(meta: &MetaState, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_i32(meta.bits())
}

/// Text field state.
#[derive(Debug, Default, Clone)]
pub struct InputBuffer {
    text: String,
    /// Byte offset into `text`, always on a grapheme boundary.
    cursor: usize,
    composing: Option<String>,
    /// Most recent forwarded keys, oldest first.
    forwarded: VecDeque<ForwardedKey>,
}

impl InputBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer holding `text` with the cursor at the end.
    pub fn with_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let cursor = text.len();
        Self {
            text,
            cursor,
            ..Self::default()
        }
    }

    // =========================================================================
    // Read Methods
    // =========================================================================

    /// Committed text, without any composing preview.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Text as the user sees it: committed text with the preview at the cursor.
    pub fn display_text(&self) -> String {
        match &self.composing {
            Some(preview) => {
                let mut out = String::with_capacity(self.text.len() + preview.len());
                out.push_str(&self.text[..self.cursor]);
                out.push_str(preview);
                out.push_str(&self.text[self.cursor..]);
                out
            }
            None => self.text.clone(),
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn composing(&self) -> Option<&str> {
        self.composing.as_deref()
    }

    /// The committed character immediately before the cursor.
    pub fn char_before_cursor(&self) -> Option<char> {
        self.text[..self.cursor].chars().next_back()
    }

    /// Key events passed through to the editor, oldest first.
    pub fn forwarded_keys(&self) -> Vec<ForwardedKey> {
        self.forwarded.iter().copied().collect()
    }

    // =========================================================================
    // Composing Region
    // =========================================================================

    /// Replace the preview. An empty preview clears it.
    pub fn set_composing(&mut self, preview: &str) {
        if preview.is_empty() {
            self.composing = None;
        } else {
            self.composing = Some(preview.to_string());
        }
    }

    /// Drop the preview, leaving committed text untouched.
    pub fn clear_composing(&mut self) -> Option<String> {
        self.composing.take()
    }

    // =========================================================================
    // Edits
    // =========================================================================

    /// Insert text at the cursor and move the cursor past it.
    pub fn insert(&mut self, text: &str) {
        self.text.insert_str(self.cursor, text);
        self.cursor += text.len();
    }

    /// Delete up to `count` grapheme clusters before the cursor.
    ///
    /// Returns how many were deleted.
    pub fn delete_before(&mut self, count: usize) -> usize {
        let mut deleted = 0;
        while deleted < count {
            let Some(start) = self.previous_boundary() else {
                break;
            };
            self.text.replace_range(start..self.cursor, "");
            self.cursor = start;
            deleted += 1;
        }
        deleted
    }

    /// Delete up to `count` grapheme clusters after the cursor.
    pub fn delete_after(&mut self, count: usize) -> usize {
        let mut deleted = 0;
        while deleted < count {
            let Some(end) = self.next_boundary() else {
                break;
            };
            self.text.replace_range(self.cursor..end, "");
            deleted += 1;
        }
        deleted
    }

    /// Move the cursor one grapheme left. Returns false at the start.
    pub fn move_left(&mut self) -> bool {
        match self.previous_boundary() {
            Some(pos) => {
                self.cursor = pos;
                true
            }
            None => false,
        }
    }

    /// Move the cursor one grapheme right. Returns false at the end.
    pub fn move_right(&mut self) -> bool {
        match self.next_boundary() {
            Some(pos) => {
                self.cursor = pos;
                true
            }
            None => false,
        }
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.text.len();
    }

    /// Record a key event for the editor.
    pub fn forward_key(&mut self, key_code: i32, meta_state: MetaState) {
        if self.forwarded.len() == MAX_FORWARDED_KEYS {
            self.forwarded.pop_front();
        }
        self.forwarded.push_back(ForwardedKey {
            key_code,
            meta_state,
        });
    }

    fn previous_boundary(&self) -> Option<usize> {
        self.text[..self.cursor]
            .grapheme_indices(true)
            .next_back()
            .map(|(idx, _)| idx)
    }

    fn next_boundary(&self) -> Option<usize> {
        self.text[self.cursor..]
            .graphemes(true)
            .next()
            .map(|g| self.cursor + g.len())
    }
}
