use chrono::NaiveDate;
use serde_json::json;

use crate::cache::AggregateKind;
use crate::codec::AttendanceStatus;
use crate::ipc::error::{err, ok, HandlerErr};
use crate::ipc::helpers::{get_or_fetch, get_required_i64, get_required_str, parse_periods};
use crate::ipc::types::{AppState, Request};
use crate::model::{AcademicPeriod, AttendanceEntry};
use crate::reconcile::{BulkWrite, Reconciler};
use crate::window;

fn parse_date_param(params: &serde_json::Value, key: &str) -> Result<Option<NaiveDate>, HandlerErr> {
    let Some(raw) = params.get(key).and_then(|v| v.as_str()) else {
        return Ok(None);
    };
    window::parse_ui_date(raw)
        .map(Some)
        .ok_or_else(|| HandlerErr::new("bad_params", format!("{} must be YYYY-MM-DD", key)))
}

fn find_period(periods: &[AcademicPeriod], period_id: i64) -> Option<&AcademicPeriod> {
    periods.iter().find(|p| p.id == period_id)
}

/// Day rows come back with domain-language status codes; translate them to
/// UI codes before they reach the host. Unknown codes take the documented
/// default rather than failing the view.
fn decode_status_rows(raw: serde_json::Value) -> serde_json::Value {
    let serde_json::Value::Array(items) = raw else {
        return raw;
    };
    let decoded: Vec<serde_json::Value> = items
        .into_iter()
        .map(|mut item| {
            if let Some(code) = item.get("status").and_then(|v| v.as_str()) {
                item["status"] = json!(AttendanceStatus::decode(code).ui_code());
            }
            item
        })
        .collect();
    serde_json::Value::Array(decoded)
}

fn handle_attendance_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(session) = state.session.as_ref() else {
        return err(&req.id, "no_session", "set a session first", None);
    };
    let class_id = match get_required_i64(&req.params, "classId") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let period_id = match get_required_i64(&req.params, "periodId") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let requested = match parse_date_param(&req.params, "date") {
        Ok(v) => v.unwrap_or_else(|| chrono::Local::now().date_naive()),
        Err(e) => return e.response(&req.id),
    };

    let class_detail = match session.client.class_detail(class_id) {
        Ok(v) => v,
        Err(e) => return HandlerErr::from(e).response(&req.id),
    };
    let periods = parse_periods(&class_detail);

    // Clamp into the selected period's window; without a period to gate
    // against the requested date stands (fail-open).
    let effective = match find_period(&periods, period_id) {
        Some(period) => window::clamp_to_period(requested, period),
        None => requested,
    };

    let rows = match session
        .client
        .attendances_by_class_and_period(class_id, period_id, Some(effective))
    {
        Ok(v) => decode_status_rows(v),
        Err(e) => return HandlerErr::from(e).response(&req.id),
    };

    let stats = get_or_fetch(
        &mut state.cache,
        class_id,
        Some(period_id),
        AggregateKind::AttendanceStats,
        || session.client.attendance_stats(class_id, Some(period_id)),
    );
    let (stats, stats_version) = match stats {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };

    ok(
        &req.id,
        json!({
            "class": class_detail,
            "periods": periods,
            "date": effective,
            "dateAdjusted": effective != requested,
            "rows": rows,
            "attendanceStats": { "payload": stats, "version": stats_version },
        }),
    )
}

fn parse_attendance_rows(params: &serde_json::Value) -> Result<Vec<AttendanceEntry>, HandlerErr> {
    let Some(raw) = params.get("rows").and_then(|v| v.as_array()) else {
        return Err(HandlerErr::new("bad_params", "missing rows"));
    };
    let mut rows = Vec::with_capacity(raw.len());
    for item in raw {
        let student_id = get_required_str(item, "studentId")?;
        let status_code = get_required_str(item, "status")?;
        let Some(status) = AttendanceStatus::from_ui_code(&status_code) else {
            return Err(HandlerErr::new(
                "bad_params",
                format!("unknown attendance status: {}", status_code),
            ));
        };
        rows.push(AttendanceEntry { student_id, status });
    }
    Ok(rows)
}

fn handle_attendance_bulk_save(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(session) = state.session.as_ref() else {
        return err(&req.id, "no_session", "set a session first", None);
    };
    if !session.profile.user_type.can_manage() {
        return err(&req.id, "permission_denied", "attendance management requires a staff role", None);
    }
    let class_id = match get_required_i64(&req.params, "classId") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let period_id = match get_required_i64(&req.params, "periodId") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let date = match parse_date_param(&req.params, "date") {
        Ok(Some(v)) => v,
        Ok(None) => return err(&req.id, "bad_params", "missing date", None),
        Err(e) => return e.response(&req.id),
    };
    let rows = match parse_attendance_rows(&req.params) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };

    let class_detail = match session.client.class_detail(class_id) {
        Ok(v) => v,
        Err(e) => return HandlerErr::from(e).response(&req.id),
    };
    let periods = parse_periods(&class_detail);
    if let Some(period) = find_period(&periods, period_id) {
        if let Err(gate) = window::check_in_window(date, period) {
            return err(
                &req.id,
                "gate_violation",
                gate.to_string(),
                Some(json!({ "start": gate.start, "end": gate.end })),
            );
        }
    }

    let write = BulkWrite::Attendance {
        class_id,
        period_id,
        date,
        rows,
    };
    let mut reconciler = Reconciler::new(session.client.as_ref(), &mut state.cache, &state.reconcile);
    let outcome = match reconciler.run(&write) {
        Ok(v) => v,
        Err(e) => return HandlerErr::from(e).response(&req.id),
    };

    let rows = match session
        .client
        .attendances_by_class_and_period(class_id, period_id, Some(date))
    {
        Ok(v) => decode_status_rows(v),
        Err(e) => return HandlerErr::from(e).response(&req.id),
    };

    ok(
        &req.id,
        json!({
            "runId": outcome.run_id.to_string(),
            "ack": outcome.ack,
            "published": outcome.published,
            "rows": rows,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attendance.open" => Some(handle_attendance_open(state, req)),
        "attendance.bulkSave" => Some(handle_attendance_bulk_save(state, req)),
        _ => None,
    }
}
