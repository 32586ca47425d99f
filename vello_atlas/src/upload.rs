// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deferred texture uploads.

use std::collections::VecDeque;

use crate::plot::AtlasRect;
use crate::resource::MaskFormat;
use crate::token::{DeferredUploadToken, TokenTracker};

/// A copy of pixel data into a rectangle of one atlas page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureUpload {
    /// Format of the atlas the page belongs to.
    pub format: MaskFormat,
    /// Index of the destination page.
    pub page_index: u32,
    /// Destination rectangle in page texels.
    pub rect: AtlasRect,
    /// Tightly packed rows of `format` pixels covering `rect`.
    pub pixels: Vec<u8>,
}

impl TextureUpload {
    /// Bytes in one row of `pixels`.
    pub fn bytes_per_row(&self) -> usize {
        usize::from(self.rect.width()) * self.format.bytes_per_pixel()
    }
}

/// Accepts uploads to be executed later, ordered against recorded draws.
pub trait DeferredUploadTarget {
    /// Tokens of recorded and executed draws.
    fn token_tracker(&self) -> &TokenTracker;

    /// Schedule `upload` to run right before the next recorded draw executes.
    ///
    /// Returns the token of that draw.
    fn add_inline_upload(&mut self, upload: TextureUpload) -> DeferredUploadToken;

    /// Schedule `upload` to run before any draw of the next flush.
    ///
    /// Returns the token of the first draw of that flush.
    fn add_asap_upload(&mut self, upload: TextureUpload) -> DeferredUploadToken;
}

/// Writes uploaded pixels into the textures they target.
pub trait WritePixels {
    /// Perform `upload`.
    fn write_pixels(&mut self, upload: &TextureUpload);
}

impl<F: FnMut(&TextureUpload)> WritePixels for F {
    fn write_pixels(&mut self, upload: &TextureUpload) {
        self(upload);
    }
}

/// A [`DeferredUploadTarget`] that records draws and uploads until they are executed.
#[derive(Debug, Default)]
pub struct UploadQueue {
    tokens: TokenTracker,
    asap: Vec<TextureUpload>,
    /// Sorted by token; tokens are handed out in increasing order.
    inline: VecDeque<(DeferredUploadToken, TextureUpload)>,
}

impl UploadQueue {
    /// An empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a draw, returning its token.
    ///
    /// Plots the draw reads should have been marked with [`TokenTracker::next_draw_token`]
    /// before this is called.
    pub fn record_draw(&mut self) -> DeferredUploadToken {
        self.tokens.issue_draw_token()
    }

    /// Number of uploads waiting to run before any draw.
    pub fn pending_asap_uploads(&self) -> usize {
        self.asap.len()
    }

    /// Number of uploads waiting to run between draws.
    pub fn pending_inline_uploads(&self) -> usize {
        self.inline.len()
    }

    /// Run everything recorded so far.
    ///
    /// ASAP uploads go first. Then each recorded draw executes in order, preceded by
    /// the inline uploads scheduled for it; `on_draw` is called with its token. Inline
    /// uploads scheduled after the last recorded draw run at the end.
    pub fn execute<W: WritePixels + ?Sized>(
        &mut self,
        writer: &mut W,
        mut on_draw: impl FnMut(DeferredUploadToken),
    ) {
        for upload in self.asap.drain(..) {
            writer.write_pixels(&upload);
        }
        while !self.tokens.is_idle() {
            let token = self.tokens.next_token_to_flush();
            while let Some(upload) = self.pop_inline_up_to(token) {
                writer.write_pixels(&upload);
            }
            on_draw(token);
            self.tokens.flush_token();
        }
        for (_, upload) in self.inline.drain(..) {
            writer.write_pixels(&upload);
        }
    }

    fn pop_inline_up_to(&mut self, token: DeferredUploadToken) -> Option<TextureUpload> {
        if self
            .inline
            .front()
            .is_some_and(|(scheduled, _)| *scheduled <= token)
        {
            self.inline.pop_front().map(|(_, upload)| upload)
        } else {
            None
        }
    }
}

impl DeferredUploadTarget for UploadQueue {
    fn token_tracker(&self) -> &TokenTracker {
        &self.tokens
    }

    fn add_inline_upload(&mut self, upload: TextureUpload) -> DeferredUploadToken {
        let token = self.tokens.next_draw_token();
        self.inline.push_back((token, upload));
        token
    }

    fn add_asap_upload(&mut self, upload: TextureUpload) -> DeferredUploadToken {
        self.asap.push(upload);
        self.tokens.next_token_to_flush()
    }
}
