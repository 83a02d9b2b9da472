//! Catalog import: listing → enrichment → normalize → index.
//!
//! Every listed record is processed independently. A record is either fully
//! indexed or skipped; a failed write is reported and the run continues.

use std::fmt;

use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::catalog::types::RawClass;
use crate::catalog::{CatalogError, CatalogSource, ListingFilter};
use crate::course::normalize;
use crate::index::{IndexError, SearchIndex};

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("index setup failed: {0}")]
    IndexSetup(IndexError),

    #[error("{0}")]
    Source(#[from] CatalogError),
}

#[derive(Debug)]
pub enum RecordOutcome {
    Indexed { id: String },
    MissingEnrichment { id: String },
    /// Undecodable entry, or no catalog number or term to form a document id.
    Invalid,
    Failed { id: String, error: IndexError },
}

#[derive(Debug)]
pub struct FailedRecord {
    pub id: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct ImportReport {
    pub listed: usize,
    pub indexed: Vec<String>,
    pub skipped: Vec<String>,
    pub invalid: usize,
    pub failed: Vec<FailedRecord>,
}

impl ImportReport {
    fn record(&mut self, outcome: RecordOutcome) {
        match outcome {
            RecordOutcome::Indexed { id } => self.indexed.push(id),
            RecordOutcome::MissingEnrichment { id } => self.skipped.push(id),
            RecordOutcome::Invalid => self.invalid += 1,
            RecordOutcome::Failed { id, error } => self.failed.push(FailedRecord {
                id,
                reason: error.to_string(),
            }),
        }
    }
}

impl fmt::Display for ImportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} listed, {} indexed, {} skipped (no enrichment), {} invalid, {} failed",
            self.listed,
            self.indexed.len(),
            self.skipped.len(),
            self.invalid,
            self.failed.len()
        )
    }
}

pub struct Importer<C, I> {
    catalog: C,
    index: I,
    concurrency: usize,
}

impl<C: CatalogSource, I: SearchIndex> Importer<C, I> {
    /// Records are processed one at a time unless [`Importer::with_concurrency`] raises the limit.
    pub fn new(catalog: C, index: I) -> Self {
        Self {
            catalog,
            index,
            concurrency: 1,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Prepare the index, fetch one listing page for `filter`, and import every record.
    ///
    /// Only index setup and the listing request are fatal.
    pub async fn run(&self, filter: &ListingFilter) -> Result<ImportReport, ImportError> {
        let ready = self
            .index
            .ensure_index()
            .await
            .map_err(ImportError::IndexSetup)?;
        debug!(?ready, "index ready");

        let records = self.catalog.fetch_listing(filter).await?;
        info!(records = records.len(), %filter, "listing fetched");

        let outcomes: Vec<RecordOutcome> = stream::iter(&records)
            .map(|entry| self.import_record(entry))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut report = ImportReport {
            listed: records.len(),
            ..Default::default()
        };
        for outcome in outcomes {
            report.record(outcome);
        }
        Ok(report)
    }

    pub async fn import_record(&self, entry: &Value) -> RecordOutcome {
        let raw = match RawClass::from_entry(entry) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "malformed listing record, skipping");
                return RecordOutcome::Invalid;
            }
        };
        let Some(identity) = raw.identity() else {
            warn!("record without catalog number or term, skipping");
            return RecordOutcome::Invalid;
        };
        let id = identity.document_id();

        let enrichment = match self.catalog.fetch_enrichment(&identity).await {
            Ok(enrichment) => enrichment,
            Err(e) => {
                warn!(%id, error = %e, "enrichment lookup failed, treating as missing");
                None
            }
        };

        let Some(doc) = normalize(&raw, enrichment.as_ref()) else {
            debug!(%id, "no enrichment, skipping");
            return RecordOutcome::MissingEnrichment { id };
        };

        match self.index.put_document(&id, &doc).await {
            Ok(()) => {
                info!(
                    %id,
                    course = %doc.course_name,
                    level = doc.course_level.as_str(),
                    "indexed course"
                );
                RecordOutcome::Indexed { id }
            }
            Err(error) => {
                warn!(%id, %error, "index write failed");
                RecordOutcome::Failed { id, error }
            }
        }
    }
}
