use crate::error::Result;
use crate::source::SourceDocument;
use crate::stats::{FailureKind, IngestReport, PersistOutcome};
use docindex_vector_store::{
    embed_with_timeout, DocumentMetadata, Embedder, IndexHandle, IngestMode,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone, Debug)]
pub struct IngestOptions {
    pub mode: IngestMode,
    /// Deadline for a single embedder call
    pub embed_timeout: Option<Duration>,
    /// Save the snapshot after each batch that committed something
    pub persist: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            mode: IngestMode::Append,
            embed_timeout: None,
            persist: true,
        }
    }
}

/// Embeds raw documents and commits them to an index
pub struct IngestionPipeline {
    handle: IndexHandle,
    embedder: Arc<dyn Embedder>,
    options: IngestOptions,
}

impl IngestionPipeline {
    pub fn new(handle: IndexHandle, embedder: Arc<dyn Embedder>) -> Self {
        Self::with_options(handle, embedder, IngestOptions::default())
    }

    pub fn with_options(
        handle: IndexHandle,
        embedder: Arc<dyn Embedder>,
        options: IngestOptions,
    ) -> Self {
        Self {
            handle,
            embedder,
            options,
        }
    }

    /// Ingest one batch.
    ///
    /// Per-document failures are recorded and the batch continues; documents committed
    /// before a failure stay committed. Only a broken index invariant returns `Err`.
    /// A failed save is reported in [`IngestReport::persistence`], the in-memory index
    /// keeps the committed documents either way.
    pub async fn ingest(&self, docs: Vec<SourceDocument>) -> Result<IngestReport> {
        let start = Instant::now();
        let mut report = IngestReport::new(docs.len());

        // One batch at a time per index; queries keep running meanwhile.
        let session = self.handle.begin_write().await;

        log::info!(
            "Ingesting {} documents into {} (mode {:?}, model {})",
            docs.len(),
            self.handle.snapshot_path().display(),
            self.options.mode,
            self.embedder.model_id()
        );

        for (position, doc) in docs.into_iter().enumerate() {
            let record = DocumentMetadata::from(doc);
            if let Err(err) = record.validate() {
                log::warn!("Skipping document #{position}: {err}");
                let kind = FailureKind::InvalidDocument;
                report.add_failure(position, &record.id, kind, err.to_string());
                continue;
            }

            // The embedder runs outside the index lock.
            let vector = match embed_with_timeout(
                self.embedder.as_ref(),
                &record.text,
                self.options.embed_timeout,
            )
            .await
            {
                Ok(vector) => vector,
                Err(err) => {
                    log::warn!("Embedding failed for document '{}': {err}", record.id);
                    let kind = FailureKind::Embedder;
                    report.add_failure(position, &record.id, kind, err.to_string());
                    continue;
                }
            };

            let id = record.id.clone();
            match session.commit(&vector, record, self.options.mode).await {
                Ok(committed) => {
                    log::debug!(
                        "Committed '{id}' at ordinal {} (replaced: {})",
                        committed.ordinal,
                        committed.replaced
                    );
                    report.add_committed(committed.replaced);
                }
                Err(err) => match FailureKind::classify(&err) {
                    Some(kind) => {
                        log::warn!("Rejected document '{id}': {err}");
                        report.add_failure(position, &id, kind, err.to_string());
                    }
                    None => return Err(err.into()),
                },
            }
        }

        report.persistence = if report.indexed == 0 || !self.options.persist {
            PersistOutcome::Skipped
        } else {
            match session.persist().await {
                Ok(()) => PersistOutcome::Saved,
                Err(err) => {
                    log::error!(
                        "Failed to save snapshot {}: {err}; {} documents are in memory only",
                        self.handle.snapshot_path().display(),
                        report.indexed
                    );
                    PersistOutcome::Failed {
                        message: err.to_string(),
                    }
                }
            }
        };
        drop(session);

        report.total_documents = self.handle.len().await;
        report.time_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        log::info!(
            "Ingested {}/{} documents ({} replaced, {} failed) in {}ms; index holds {}",
            report.indexed,
            report.requested,
            report.replaced,
            report.failures.len(),
            report.time_ms,
            report.total_documents
        );
        Ok(report)
    }
}
