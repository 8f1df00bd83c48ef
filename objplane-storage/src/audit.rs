//! Audit records for cross-entity operations.

use chrono::{DateTime, Utc};
use objplane_types::OperationId;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::{error, info, warn, Level};

/// Final status of an audited operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    Success,
    Failed,
    Partial,
    /// Rejected by the permission pre-check; nothing was written.
    Denied,
}

impl AuditStatus {
    /// Log severity for this status.
    pub fn level(&self) -> Level {
        match self {
            Self::Success => Level::INFO,
            Self::Partial => Level::WARN,
            Self::Failed | Self::Denied => Level::ERROR,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Partial => "partial",
            Self::Denied => "denied",
        }
    }
}

/// A finalized, immutable audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationLog {
    pub id: OperationId,
    pub plugin_id: String,
    pub user_id: u64,
    pub user_name: String,
    pub operation: String,
    pub affected_count: usize,
    pub entities: Vec<String>,
    pub status: AuditStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_ms: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub details: serde_json::Value,
}

/// Receives finalized audit records.
pub trait AuditSink: Send + Sync {
    fn record(&self, log: &OperationLog);
}

/// Emits each record as a `tracing` event at the status' severity.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, log: &OperationLog) {
        let entities = log.entities.join(",");
        match log.status.level() {
            Level::ERROR => error!(
                operation_id = %log.id,
                plugin_id = %log.plugin_id,
                user = %log.user_name,
                operation = %log.operation,
                affected = log.affected_count,
                entities = %entities,
                status = log.status.as_str(),
                duration_ms = log.duration_ms,
                error = log.error.as_deref().unwrap_or(""),
                "Cross-entity operation audit"
            ),
            Level::WARN => warn!(
                operation_id = %log.id,
                plugin_id = %log.plugin_id,
                user = %log.user_name,
                operation = %log.operation,
                affected = log.affected_count,
                entities = %entities,
                status = log.status.as_str(),
                duration_ms = log.duration_ms,
                "Cross-entity operation audit"
            ),
            _ => info!(
                operation_id = %log.id,
                plugin_id = %log.plugin_id,
                user = %log.user_name,
                operation = %log.operation,
                affected = log.affected_count,
                entities = %entities,
                status = log.status.as_str(),
                duration_ms = log.duration_ms,
                "Cross-entity operation audit"
            ),
        }
    }
}

/// Keeps every record in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    logs: Mutex<Vec<OperationLog>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logs(&self) -> Vec<OperationLog> {
        self.logs.lock().map(|logs| logs.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.logs.lock().map(|logs| logs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn last(&self) -> Option<OperationLog> {
        self.logs.lock().ok().and_then(|logs| logs.last().cloned())
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, log: &OperationLog) {
        match self.logs.lock() {
            Ok(mut logs) => logs.push(log.clone()),
            Err(_) => warn!(operation_id = %log.id, "Audit sink lock poisoned, record dropped"),
        }
    }
}
