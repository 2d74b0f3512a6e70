//! Canonical schema constants for structured logging and events
//!
//! Every engine operation logs through these keys so that log pipelines can
//! rely on one vocabulary regardless of which family or operation emitted it.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_REQUEST_ID: &str = "request_id";
pub const FIELD_TRACE_ID: &str = "trace_id";

// Reconciliation context
pub const FIELD_JOB_ID: &str = "job_id";
pub const FIELD_CHANGE_ORDER_ID: &str = "change_order_id";
pub const FIELD_CHANGE_ORDER_KIND: &str = "change_order_kind";
pub const FIELD_FAMILY: &str = "family";
pub const FIELD_IDENTITY: &str = "identity";
pub const FIELD_BASE_VERSION: &str = "base_version";

// Collection sizes
pub const FIELD_DELTA_COUNT: &str = "delta_count";
pub const FIELD_LOCKED_COUNT: &str = "locked_count";
pub const FIELD_WARNING_COUNT: &str = "warning_count";

// Error fields
pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
