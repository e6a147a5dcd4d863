use serde_json::json;

use crate::client::ClientError;
use crate::reconcile::ReconcileError;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<ClientError> for HandlerErr {
    fn from(e: ClientError) -> Self {
        match &e {
            ClientError::Transport { .. } => HandlerErr::new("network_error", e.to_string()),
            ClientError::Status { status, .. } => HandlerErr {
                code: "backend_error",
                message: e.to_string(),
                details: Some(json!({ "status": status })),
            },
            ClientError::Decode { .. } => HandlerErr::new("decode_error", e.to_string()),
        }
    }
}

impl From<ReconcileError> for HandlerErr {
    fn from(e: ReconcileError) -> Self {
        match e {
            ReconcileError::Validation(range) => HandlerErr {
                code: "validation_failed",
                message: range.to_string(),
                details: Some(json!({
                    "field": range.field,
                    "max": range.max,
                    "value": range.value,
                })),
            },
            ReconcileError::Write(source) => HandlerErr {
                code: "write_failed",
                message: source.to_string(),
                details: None,
            },
            // The write landed; only the refresh is broken. Report which
            // aggregates did publish so the host can show a stale-data
            // warning with a retry affordance instead of a failed save.
            ReconcileError::Refetch {
                kind,
                source,
                published,
            } => HandlerErr {
                code: "refetch_failed",
                message: format!("saved, but refreshing {:?} failed: {}", kind, source),
                details: Some(json!({
                    "published": published,
                    "retry": "grades.refreshAggregates",
                })),
            },
        }
    }
}
