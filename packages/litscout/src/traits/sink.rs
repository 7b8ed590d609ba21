//! Persistence sink trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::record::ValidatedRecord;

/// External persistence sink (spreadsheet-like store).
///
/// Receives one record at a time; a failure for one record must never
/// block submission of the others. The orchestrator aggregates per-record
/// failures into the run report.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Submit one validated record with its processing timestamp.
    async fn submit(&self, record: &ValidatedRecord, processed_at: DateTime<Utc>) -> Result<()>;

    /// Short sink name for logs.
    fn name(&self) -> &str;
}
