//! Incrementally emitted output units.
//!
//! Every piece of pipeline output is a [`Chunk`]: a UTF-8 text fragment
//! tagged with a [`ChunkKind`]. Consumers that only want the corpus text
//! concatenate `content` and `error` chunks; `notice` and `completed` chunks
//! exist for progressive display and observability and are excluded from the
//! materialized blob (so a page with nothing to say produces nothing).
//!
//! Chunks travel from the producer to the consumer over an unbounded
//! channel; the stream ends when the producer finishes and drops its sender.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;

/// What a chunk's text represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    /// Diagnostic message (skip notices, progress hints). Stream-only.
    Notice,
    /// Extracted corpus text: section digest, FAQ digest, or OCR output.
    Content,
    /// Human-readable failure annotation, inline in the corpus.
    Error,
    /// Terminal marker for one crawled URL. Stream-only.
    Completed,
}

/// One unit of incrementally emitted output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub kind: ChunkKind,
    pub text: String,
}

impl Chunk {
    pub fn notice(text: impl Into<String>) -> Self {
        Self {
            kind: ChunkKind::Notice,
            text: text.into(),
        }
    }

    pub fn content(text: impl Into<String>) -> Self {
        Self {
            kind: ChunkKind::Content,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: ChunkKind::Error,
            text: text.into(),
        }
    }

    /// Terminal marker for a finished URL.
    pub fn completed(url: &str) -> Self {
        Self {
            kind: ChunkKind::Completed,
            text: format!("[done] {url}"),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == ChunkKind::Error
    }

    /// Whether this chunk belongs in the materialized corpus text.
    pub fn in_corpus(&self) -> bool {
        matches!(self.kind, ChunkKind::Content | ChunkKind::Error) && !self.text.is_empty()
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Producer-side handle for emitting chunks.
///
/// Sends never block (unbounded channel). A departed consumer is not an
/// error: `emit` drops the chunk silently and [`ChunkSender::consumer_alive`]
/// lets the producer stop early instead of crawling into the void.
#[derive(Debug, Clone)]
pub(crate) struct ChunkSender {
    tx: mpsc::UnboundedSender<Chunk>,
}

impl ChunkSender {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<Chunk>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub(crate) fn emit(&self, chunk: Chunk) {
        if self.tx.send(chunk).is_err() {
            tracing::trace!("chunk dropped: consumer is gone");
        }
    }

    pub(crate) fn consumer_alive(&self) -> bool {
        !self.tx.is_closed()
    }
}
