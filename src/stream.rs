//! Streaming delivery of pipeline output.
//!
//! The producer and consumer are decoupled by an unbounded channel: the
//! pipeline pushes chunks as it goes, the consumer drains them on its own
//! schedule, and the end of the batch is signaled by the stream ending (the
//! producer drops its sender). No sentinel values, no polling.

use crate::chunk::{Chunk, ChunkSender};
use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::ingest::Ingestor;
use crate::source::Source;
use futures::Stream;
use std::pin::Pin;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Ordered stream of pipeline output chunks.
///
/// Ends when the batch finishes. Dropping it early is the cancellation
/// mechanism: the producer notices the closed channel before each fetch and
/// winds down, cleanup included.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Chunk> + Send>>;

impl Ingestor {
    /// Process sources and yield chunks as they are produced.
    ///
    /// The producer runs in a spawned task, so the first chunk can arrive
    /// while later sources are still being fetched. Must be called from
    /// within a tokio runtime.
    pub fn stream(&self, sources: Vec<Source>) -> ChunkStream {
        let (tx, rx) = ChunkSender::channel();
        let ingestor = self.clone();
        tokio::spawn(async move {
            ingestor.produce(sources, tx).await;
        });
        Box::pin(UnboundedReceiverStream::new(rx))
    }
}

/// One-shot convenience: build an [`Ingestor`] and stream one batch.
pub async fn ingest_stream(
    sources: Vec<Source>,
    config: IngestConfig,
) -> Result<ChunkStream, IngestError> {
    let ingestor = Ingestor::new(config)?;
    Ok(ingestor.stream(sources))
}
