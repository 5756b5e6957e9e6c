//! URL dedup ledgers.
//!
//! Two dedup guards share one claim discipline:
//!
//! * the per-run **visited set** — one fresh [`UrlLedger`] per top-level
//!   website source, shared by reference across that source's recursion;
//! * the **download ledger** — one [`DownloadLedger`] per [`Ingestor`]
//!   (`Arc`-shared), so an asset referenced by many pages, or by many
//!   batches run through the same ingestor, transfers at most once. It
//!   also tallies the transfers that ran to completion, which is the
//!   number the run stats report.
//!
//! [`Ingestor`]: crate::Ingestor

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Append-only set of URLs with atomic first-claim semantics.
///
/// `claim` is check-and-insert under one lock, so the at-most-once
/// guarantees hold even if callers ever run branches concurrently.
#[derive(Debug, Default)]
pub struct UrlLedger {
    inner: Mutex<HashSet<String>>,
}

impl UrlLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `url`. Returns `true` if this call was the first sighting —
    /// the caller now owns whatever one-time work the claim guards.
    pub fn claim(&self, url: &str) -> bool {
        self.inner
            .lock()
            .expect("ledger lock poisoned")
            .insert(url.to_string())
    }

    pub fn contains(&self, url: &str) -> bool {
        self.inner
            .lock()
            .expect("ledger lock poisoned")
            .contains(url)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("ledger lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The ingestor-lifetime download ledger: claim dedup plus a tally of the
/// transfers that actually completed.
///
/// Claims and completions diverge on failure. A URL stays claimed after a
/// failed transfer, so it is skipped rather than retried on the next
/// encounter — but only completed transfers count as downloads.
#[derive(Debug, Default)]
pub struct DownloadLedger {
    urls: UrlLedger,
    completed: AtomicUsize,
}

impl DownloadLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// See [`UrlLedger::claim`].
    pub fn claim(&self, url: &str) -> bool {
        self.urls.claim(url)
    }

    /// Record one transfer that ran to completion.
    pub fn mark_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }
}
