use serde_json::Value;

use crate::cache::{AggregateKind, ViewStateCache};
use crate::client::ClientError;
use crate::ipc::error::HandlerErr;
use crate::model::AcademicPeriod;

pub fn get_required_str(params: &Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::new("bad_params", format!("missing {}", key)))
}

pub fn get_required_i64(params: &Value, key: &str) -> Result<i64, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| HandlerErr::new("bad_params", format!("missing {}", key)))
}

pub fn get_optional_i64(params: &Value, key: &str) -> Option<i64> {
    params.get(key).and_then(|v| v.as_i64())
}

pub fn get_f64(params: &Value, key: &str) -> Result<f64, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| HandlerErr::new("bad_params", format!("missing {}", key)))
}

/// Periods arrive embedded in the class detail as `periods_detail`. Rows
/// that fail to parse or are structurally off are logged and skipped so one
/// bad period cannot take down the whole view.
pub fn parse_periods(class_detail: &Value) -> Vec<AcademicPeriod> {
    let Some(raw) = class_detail.get("periods_detail").and_then(|v| v.as_array()) else {
        return Vec::new();
    };
    let mut periods = Vec::with_capacity(raw.len());
    for item in raw {
        match serde_json::from_value::<AcademicPeriod>(item.clone()) {
            Ok(period) => {
                if !period.is_well_formed() {
                    tracing::warn!(period_id = period.id, "malformed academic period from backend");
                }
                periods.push(period);
            }
            Err(e) => {
                tracing::warn!(error = %e, "skipping unparseable period in class detail");
            }
        }
    }
    periods
}

/// Serves from the cache when the entry is populated, otherwise fetches
/// and publishes it. Returns the payload with its cache version so the
/// host can key rendering on `(kind, version)`.
pub fn get_or_fetch(
    cache: &mut ViewStateCache,
    class_id: i64,
    period_id: Option<i64>,
    kind: AggregateKind,
    fetch: impl FnOnce() -> Result<Value, ClientError>,
) -> Result<(Value, u64), HandlerErr> {
    if let Some(entry) = cache.get(class_id, period_id, kind) {
        return Ok((entry.payload.clone(), entry.version));
    }
    let payload = fetch()?;
    let version = cache.put(class_id, period_id, kind, payload.clone());
    Ok((payload, version))
}
