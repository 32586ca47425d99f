// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Logical time for recorded work.

/// A point in the stream of recorded draws.
///
/// Tokens are handed out in increasing order as draws are recorded and consumed in the
/// same order as they execute. A resource tagged with token `T` may be overwritten once
/// every draw up to and including `T` has executed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeferredUploadToken(u64);

impl DeferredUploadToken {
    /// The token older than any recorded draw. Everything tagged with it is safe to reuse.
    pub const fn already_flushed() -> Self {
        Self(0)
    }

    /// The token following this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// The raw sequence number.
    pub const fn sequence_number(self) -> u64 {
        self.0
    }
}

/// Hands out draw tokens and tracks how far execution has progressed.
#[derive(Clone, Debug, Default)]
pub struct TokenTracker {
    last_issued: DeferredUploadToken,
    last_flushed: DeferredUploadToken,
}

impl TokenTracker {
    /// A tracker with nothing recorded and nothing executed.
    pub fn new() -> Self {
        Self::default()
    }

    /// The token the next recorded draw will receive.
    ///
    /// Draws that are being prepared tag the resources they read with this token.
    pub fn next_draw_token(&self) -> DeferredUploadToken {
        self.last_issued.next()
    }

    /// The token of the next draw to execute.
    pub fn next_token_to_flush(&self) -> DeferredUploadToken {
        self.last_flushed.next()
    }

    /// Record a draw, returning its token.
    pub fn issue_draw_token(&mut self) -> DeferredUploadToken {
        self.last_issued = self.last_issued.next();
        self.last_issued
    }

    /// Mark the next draw as executed, returning its token.
    pub fn flush_token(&mut self) -> DeferredUploadToken {
        debug_assert!(
            self.last_flushed < self.last_issued,
            "flushed a draw that was never recorded"
        );
        self.last_flushed = self.last_flushed.next();
        self.last_flushed
    }

    /// The most recently recorded draw.
    pub fn last_issued(&self) -> DeferredUploadToken {
        self.last_issued
    }

    /// Whether every recorded draw has executed.
    pub fn is_idle(&self) -> bool {
        self.last_flushed == self.last_issued
    }
}
