use crate::diff::model::Family;
use crate::model::ChangeOrderKind;
use jobdelta_core_types::{RequestContext, RequestId, TraceId};
use thiserror::Error;

/// Result type alias using JobDeltaError
pub type Result<T> = std::result::Result<T, JobDeltaError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that callers (persistence layer,
/// presentation layer) can branch on without matching engine enums.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Structural
    InconsistentIdentity,
    InvalidDelta,
    DeltaTargetMissing,
    InvalidRecordShape,

    // Data quality (non-fatal, surfaced as warnings)
    MissingCatalogMapping,

    // Change-order lifecycle
    EmptyChangeOrder,
    StaleCommittedState,
    PendingChangeOrderConflict,

    // Integration
    Config,
    Io,
    Serialization,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InconsistentIdentity => "ERR_INCONSISTENT_IDENTITY",
            ExErrorKind::InvalidDelta => "ERR_INVALID_DELTA",
            ExErrorKind::DeltaTargetMissing => "ERR_DELTA_TARGET_MISSING",
            ExErrorKind::InvalidRecordShape => "ERR_INVALID_RECORD_SHAPE",
            ExErrorKind::MissingCatalogMapping => "ERR_MISSING_CATALOG_MAPPING",
            ExErrorKind::EmptyChangeOrder => "ERR_EMPTY_CHANGE_ORDER",
            ExErrorKind::StaleCommittedState => "ERR_STALE_COMMITTED_STATE",
            ExErrorKind::PendingChangeOrderConflict => "ERR_PENDING_CHANGE_ORDER_CONFLICT",
            ExErrorKind::Config => "ERR_CONFIG",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
        }
    }

    /// Whether the failure must abort the whole reconciliation.
    ///
    /// Only data-quality kinds degrade per item; everything else propagates.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ExErrorKind::MissingCatalogMapping)
    }
}

/// Canonical structured error type
///
/// Carries classification fields for programmatic handling plus the
/// reconciliation context (family, identity, job) for debugging.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    family: Option<String>,
    entity_id: Option<String>,
    job_id: Option<i64>,
    request_id: Option<RequestId>,
    trace_id: Option<TraceId>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            family: None,
            entity_id: None,
            job_id: None,
            request_id: None,
            trace_id: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity family context
    pub fn with_family(mut self, family: impl Into<String>) -> Self {
        self.family = Some(family.into());
        self
    }

    /// Add entity identity context
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add job context
    pub fn with_job_id(mut self, job_id: i64) -> Self {
        self.job_id = Some(job_id);
        self
    }

    /// Add request ID context
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Add trace ID context
    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    /// Add the correlation ids (and job, when not already set) of a request
    pub fn with_context(mut self, ctx: &RequestContext) -> Self {
        self = self.with_request_id(ctx.request_id.clone());
        if let Some(trace_id) = &ctx.trace_id {
            self = self.with_trace_id(trace_id.clone());
        }
        if self.job_id.is_none() {
            self.job_id = ctx.job_id;
        }
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn family(&self) -> Option<&str> {
        self.family.as_deref()
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    pub fn job_id(&self) -> Option<i64> {
        self.job_id
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    pub fn trace_id(&self) -> Option<&TraceId> {
        self.trace_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(family) = &self.family {
            write!(f, " (family: {})", family)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (identity: {})", entity_id)?;
        }
        if let Some(job_id) = self.job_id {
            write!(f, " (job_id: {})", job_id)?;
        }
        if let Some(request_id) = &self.request_id {
            write!(f, " (request_id: {})", request_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Error taxonomy for reconciliation operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JobDeltaError {
    /// Two items of one family share an identity key on the same side of a diff
    #[error("Inconsistent identity: {family} {identity} appears more than once in the {side} state")]
    InconsistentIdentity {
        family: Family,
        identity: String,
        side: &'static str,
    },

    /// The diff produced no deltas for a change order the user attempted
    #[error("Change order of kind {kind} has no changes against the committed state")]
    EmptyChangeOrder { kind: ChangeOrderKind },

    /// The committed state moved on after the diff was computed
    #[error("Committed state is stale: diffed against version {diffed_against}, current is {current}")]
    StaleCommittedState { diffed_against: u64, current: u64 },

    /// A delta cannot be interpreted for its family
    #[error("Invalid {family} delta: {reason}")]
    InvalidDelta { family: Family, reason: String },

    /// A Change delta names a record that does not exist in the baseline
    #[error("{family} {identity} not found for Change")]
    DeltaTargetMissing { family: Family, identity: String },

    /// A source record did not have the shape expected at this boundary
    #[error("Invalid record shape: {reason}")]
    InvalidRecordShape { reason: String },

    /// Another change order is already open for the job
    #[error("Change order {open_id} ({open_kind}) is already pending; cannot open a {requested_kind} change order")]
    PendingChangeOrderConflict {
        open_id: i64,
        open_kind: ChangeOrderKind,
        requested_kind: ChangeOrderKind,
    },

    /// Configuration could not be loaded
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// I/O failure at the CLI/config boundary
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Serialization error (JSON encoding/decoding)
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl From<JobDeltaError> for ExError {
    fn from(err: JobDeltaError) -> Self {
        let message = err.to_string();
        match err {
            JobDeltaError::InconsistentIdentity {
                family, identity, ..
            } => ExError::new(ExErrorKind::InconsistentIdentity)
                .with_family(family.as_str())
                .with_entity_id(identity)
                .with_message(message),

            JobDeltaError::EmptyChangeOrder { .. } => {
                ExError::new(ExErrorKind::EmptyChangeOrder).with_message(message)
            }

            JobDeltaError::StaleCommittedState { .. } => {
                ExError::new(ExErrorKind::StaleCommittedState).with_message(message)
            }

            JobDeltaError::InvalidDelta { family, .. } => ExError::new(ExErrorKind::InvalidDelta)
                .with_family(family.as_str())
                .with_message(message),

            JobDeltaError::DeltaTargetMissing { family, identity } => {
                ExError::new(ExErrorKind::DeltaTargetMissing)
                    .with_family(family.as_str())
                    .with_entity_id(identity)
                    .with_message(message)
            }

            JobDeltaError::InvalidRecordShape { .. } => {
                ExError::new(ExErrorKind::InvalidRecordShape).with_message(message)
            }

            JobDeltaError::PendingChangeOrderConflict { open_id, .. } => {
                ExError::new(ExErrorKind::PendingChangeOrderConflict)
                    .with_entity_id(open_id.to_string())
                    .with_message(message)
            }

            JobDeltaError::Config { .. } => ExError::new(ExErrorKind::Config).with_message(message),
            JobDeltaError::Io { .. } => ExError::new(ExErrorKind::Io).with_message(message),
            JobDeltaError::Serialization { .. } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }
        }
    }
}

impl From<serde_json::Error> for JobDeltaError {
    fn from(err: serde_json::Error) -> Self {
        JobDeltaError::Serialization {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_unique() {
        let kinds = [
            ExErrorKind::InconsistentIdentity,
            ExErrorKind::InvalidDelta,
            ExErrorKind::DeltaTargetMissing,
            ExErrorKind::InvalidRecordShape,
            ExErrorKind::MissingCatalogMapping,
            ExErrorKind::EmptyChangeOrder,
            ExErrorKind::StaleCommittedState,
            ExErrorKind::PendingChangeOrderConflict,
            ExErrorKind::Config,
            ExErrorKind::Io,
            ExErrorKind::Serialization,
        ];
        let mut codes: Vec<&str> = kinds.iter().map(|k| k.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
    }

    #[test]
    fn test_only_missing_mapping_is_non_fatal() {
        assert!(!ExErrorKind::MissingCatalogMapping.is_fatal());
        assert!(ExErrorKind::InconsistentIdentity.is_fatal());
        assert!(ExErrorKind::EmptyChangeOrder.is_fatal());
    }

    #[test]
    fn test_display_includes_context() {
        let err = ExError::new(ExErrorKind::DeltaTargetMissing)
            .with_op("apply")
            .with_family("choice")
            .with_entity_id("100")
            .with_job_id(7);
        let rendered = err.to_string();
        assert!(rendered.starts_with("[ERR_DELTA_TARGET_MISSING]"));
        assert!(rendered.contains("operation 'apply'"));
        assert!(rendered.contains("family: choice"));
        assert!(rendered.contains("identity: 100"));
        assert!(rendered.contains("job_id: 7"));
    }

    #[test]
    fn test_serde_error_converts() {
        let err: JobDeltaError = serde_json::from_str::<u32>("\"x\"").unwrap_err().into();
        assert!(matches!(err, JobDeltaError::Serialization { .. }));
    }
}
