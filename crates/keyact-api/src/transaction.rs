//! Input transactions: staged text edits originating from an action.
//!
//! A transaction moves through `open -> partial* -> committed | cancelled`.
//! Partial text lives in the buffer's composing region and replaces the
//! previous partial on every update. Only one transaction is live per
//! input session; starting another, or editing the buffer directly,
//! supersedes it.
//!
//! ## Leading space
//!
//! `apply_space_if_needed` is resolved lazily. The space is a prefix of the
//! previewed or committed text and only appears when that text is non-empty,
//! so creating a transaction never edits the buffer and `cancel` always
//! restores it exactly.

use std::sync::Arc;

use keyact_core::TransactionError;
use parking_lot::Mutex;

use crate::buffer::InputBuffer;
use crate::host::{HostNotice, NoticeLog};

/// A staged batch of text modification.
///
/// Every method fails once the transaction is terminal.
pub trait ActionInputTransaction: Send {
    /// Replace the previewed text.
    fn update_partial(&mut self, text: &str) -> Result<(), TransactionError>;

    /// Finalize `text` into the input stream, replacing any preview.
    fn commit(&mut self, text: &str) -> Result<(), TransactionError>;

    /// Discard the preview and end the transaction.
    fn cancel(&mut self) -> Result<(), TransactionError>;
}

// =============================================================================
// Input Session
// =============================================================================

/// The buffer plus bookkeeping for the live transaction.
#[derive(Debug, Default)]
pub struct InputSession {
    pub(crate) buffer: InputBuffer,
    live: Option<u64>,
    next_id: u64,
}

/// Input session shared between the host and its transactions.
pub type SharedInput = Arc<Mutex<InputSession>>;

impl InputSession {
    pub fn new(buffer: InputBuffer) -> Self {
        Self {
            buffer,
            live: None,
            next_id: 1,
        }
    }

    pub fn buffer(&self) -> &InputBuffer {
        &self.buffer
    }

    /// Whether a transaction is currently live.
    pub fn has_live(&self) -> bool {
        self.live.is_some()
    }

    /// Start a transaction, superseding any live one.
    pub(crate) fn begin(&mut self) -> u64 {
        self.supersede_live("new transaction");
        let id = self.next_id;
        self.next_id += 1;
        self.live = Some(id);
        tracing::debug!("Input transaction {} started", id);
        id
    }

    /// End the live transaction, discarding its preview.
    ///
    /// Returns true if one was live.
    pub(crate) fn supersede_live(&mut self, reason: &str) -> bool {
        match self.live.take() {
            Some(id) => {
                self.buffer.clear_composing();
                tracing::warn!("Input transaction {} superseded by {}", id, reason);
                true
            }
            None => false,
        }
    }

    fn is_live(&self, id: u64) -> bool {
        self.live == Some(id)
    }

    fn end(&mut self, id: u64) {
        if self.is_live(id) {
            self.live = None;
        }
    }
}

// =============================================================================
// Buffer Transaction
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Open,
    Committed,
    Cancelled,
    Superseded,
}

/// Transaction over the host's input buffer.
pub struct BufferTransaction {
    input: SharedInput,
    notices: NoticeLog,
    id: u64,
    apply_space_if_needed: bool,
    status: Status,
}

impl BufferTransaction {
    /// Begin a new live transaction on the session.
    pub(crate) fn begin(input: SharedInput, notices: NoticeLog, apply_space_if_needed: bool) -> Self {
        let id = input.lock().begin();
        Self {
            input,
            notices,
            id,
            apply_space_if_needed,
            status: Status::Open,
        }
    }

    /// Fail if the transaction can no longer be used.
    ///
    /// Misuse is logged and recorded as a host notice before it is returned.
    fn ensure_open(&mut self, session: &InputSession, op: &str) -> Result<(), TransactionError> {
        if self.status == Status::Open && !session.is_live(self.id) {
            self.status = Status::Superseded;
        }
        let err = match self.status {
            Status::Open => return Ok(()),
            Status::Committed => TransactionError::AlreadyCommitted,
            Status::Cancelled => TransactionError::AlreadyCancelled,
            Status::Superseded => TransactionError::Superseded,
        };
        tracing::error!("Invalid {} on input transaction {}: {}", op, self.id, err);
        self.notices.push(HostNotice::TransactionMisuse {
            transaction: self.id,
            operation: op.to_string(),
            error: err,
        });
        Err(err)
    }

    /// The text as it would land in the buffer, including a leading space.
    fn staged(&self, buffer: &InputBuffer, text: &str) -> String {
        if self.needs_space(buffer, text) {
            format!(" {}", text)
        } else {
            text.to_string()
        }
    }

    fn needs_space(&self, buffer: &InputBuffer, text: &str) -> bool {
        if !self.apply_space_if_needed {
            return false;
        }
        let starts_with_space = text.chars().next().map_or(true, char::is_whitespace);
        let after_word = buffer
            .char_before_cursor()
            .is_some_and(|c| !c.is_whitespace());
        !starts_with_space && after_word
    }
}

impl ActionInputTransaction for BufferTransaction {
    fn update_partial(&mut self, text: &str) -> Result<(), TransactionError> {
        let input = self.input.clone();
        let mut session = input.lock();
        self.ensure_open(&session, "update_partial")?;

        let staged = self.staged(&session.buffer, text);
        session.buffer.set_composing(&staged);
        Ok(())
    }

    fn commit(&mut self, text: &str) -> Result<(), TransactionError> {
        let input = self.input.clone();
        let mut session = input.lock();
        self.ensure_open(&session, "commit")?;

        let staged = self.staged(&session.buffer, text);
        session.buffer.clear_composing();
        session.buffer.insert(&staged);
        session.end(self.id);
        self.status = Status::Committed;
        tracing::debug!("Input transaction {} committed {} bytes", self.id, staged.len());
        Ok(())
    }

    fn cancel(&mut self) -> Result<(), TransactionError> {
        let input = self.input.clone();
        let mut session = input.lock();
        self.ensure_open(&session, "cancel")?;

        session.buffer.clear_composing();
        session.end(self.id);
        self.status = Status::Cancelled;
        tracing::debug!("Input transaction {} cancelled", self.id);
        Ok(())
    }
}

impl Drop for BufferTransaction {
    fn drop(&mut self) {
        if self.status != Status::Open {
            return;
        }
        let mut session = self.input.lock();
        if session.is_live(self.id) {
            session.buffer.clear_composing();
            session.end(self.id);
            tracing::debug!("Input transaction {} dropped while open, cancelled", self.id);
        }
    }
}
