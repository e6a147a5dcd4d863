use serde_json::json;

use crate::aggregate::{compute_status, compute_total, validate_component, validate_components, ComponentField};
use crate::cache::AggregateKind;
use crate::ipc::error::{err, ok, HandlerErr};
use crate::ipc::helpers::{get_f64, get_or_fetch, get_required_i64, get_required_str, parse_periods};
use crate::ipc::types::{AppState, Request};
use crate::model::{GradeComponents, GradeEntry, GradeRecord};
use crate::reconcile::{BulkWrite, Reconciler};

fn parse_grade_rows(params: &serde_json::Value) -> Result<Vec<GradeEntry>, HandlerErr> {
    let Some(raw) = params.get("grades").and_then(|v| v.as_array()) else {
        return Err(HandlerErr::new("bad_params", "missing grades"));
    };
    let mut rows = Vec::with_capacity(raw.len());
    for item in raw {
        let student_id = get_required_str(item, "studentId")?;
        rows.push(GradeEntry {
            student_id,
            components: parse_components(item)?,
        });
    }
    Ok(rows)
}

fn parse_components(params: &serde_json::Value) -> Result<GradeComponents, HandlerErr> {
    Ok(GradeComponents {
        ser: get_f64(params, "ser")?,
        saber: get_f64(params, "saber")?,
        hacer: get_f64(params, "hacer")?,
        decidir: get_f64(params, "decidir")?,
        autoevaluacion: get_f64(params, "autoevaluacion")?,
    })
}

/// Indexes the fetched grade rows by student id the way the editing grid
/// consumes them. Rows that do not parse are logged and left out rather
/// than failing the view.
fn grade_map(payload: &serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
    let mut map = serde_json::Map::new();
    let Some(items) = payload.as_array() else {
        return map;
    };
    for item in items {
        match serde_json::from_value::<GradeRecord>(item.clone()) {
            Ok(rec) => {
                map.insert(
                    rec.student.to_string(),
                    json!({
                        "id": rec.id,
                        "components": rec.components,
                        "notaTotal": rec.nota_total,
                        "estado": rec.estado,
                    }),
                );
            }
            Err(e) => tracing::warn!(error = %e, "skipping unparseable grade row"),
        }
    }
    map
}

fn handle_grades_open(state: &mut AppState, req: &Request) -> serde_json::Value {
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

    let class_detail = match session.client.class_detail(class_id) {
        Ok(v) => v,
        Err(e) => return HandlerErr::from(e).response(&req.id),
    };
    let periods = parse_periods(&class_detail);

    let grades = get_or_fetch(
        &mut state.cache,
        class_id,
        Some(period_id),
        AggregateKind::Grades,
        || session.client.grades_by_class_and_period(class_id, period_id),
    );
    let (grades, grades_version) = match grades {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };

    let stats = get_or_fetch(
        &mut state.cache,
        class_id,
        Some(period_id),
        AggregateKind::GradeStats,
        || session.client.grade_stats(class_id, Some(period_id)),
    );
    let (stats, stats_version) = match stats {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };

    let finals = get_or_fetch(&mut state.cache, class_id, None, AggregateKind::FinalGrades, || {
        session.client.final_grades_by_class(class_id)
    });
    let (finals, finals_version) = match finals {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };

    let grade_map = grade_map(&grades);
    ok(
        &req.id,
        json!({
            "class": class_detail,
            "periods": periods,
            "grades": { "payload": grades, "version": grades_version },
            "gradeMap": grade_map,
            "gradeStats": { "payload": stats, "version": stats_version },
            "finalGrades": { "payload": finals, "version": finals_version },
        }),
    )
}

/// Local preview of one row: validated components, their total, and the
/// resulting status, without touching the network or any stored state.
fn handle_grades_preview(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let components = match parse_components(&req.params) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    if let Err(e) = validate_components(&components) {
        return err(
            &req.id,
            "validation_failed",
            e.to_string(),
            Some(json!({ "field": e.field, "max": e.max, "value": e.value })),
        );
    }
    let total = compute_total(&components);
    ok(
        &req.id,
        json!({
            "notaTotal": total,
            "estado": compute_status(total),
        }),
    )
}

fn handle_grades_validate(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let field_name = match get_required_str(&req.params, "field") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let Some(field) = ComponentField::from_str(&field_name) else {
        return err(
            &req.id,
            "bad_params",
            format!("unknown component field: {}", field_name),
            None,
        );
    };
    let value = match get_f64(&req.params, "value") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    match validate_component(field, value) {
        Ok(()) => ok(&req.id, json!({ "valid": true, "max": field.max() })),
        Err(e) => err(
            &req.id,
            "validation_failed",
            e.to_string(),
            Some(json!({ "field": e.field, "max": e.max, "value": e.value })),
        ),
    }
}

fn handle_grades_bulk_save(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(session) = state.session.as_ref() else {
        return err(&req.id, "no_session", "set a session first", None);
    };
    if !session.profile.user_type.can_manage() {
        return err(&req.id, "permission_denied", "grade management requires a staff role", None);
    }
    let class_id = match get_required_i64(&req.params, "classId") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let period_id = match get_required_i64(&req.params, "periodId") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let rows = match parse_grade_rows(&req.params) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };

    let write = BulkWrite::Grades {
        class_id,
        period_id,
        rows,
    };
    let mut reconciler = Reconciler::new(session.client.as_ref(), &mut state.cache, &state.reconcile);
    match reconciler.run(&write) {
        Ok(outcome) => ok(
            &req.id,
            json!({
                "runId": outcome.run_id.to_string(),
                "ack": outcome.ack,
                "published": outcome.published,
            }),
        ),
        Err(e) => HandlerErr::from(e).response(&req.id),
    }
}

fn handle_grades_refresh(state: &mut AppState, req: &Request) -> serde_json::Value {
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
    let mut reconciler = Reconciler::new(session.client.as_ref(), &mut state.cache, &state.reconcile);
    match reconciler.refresh_grade_aggregates(class_id, period_id) {
        Ok(published) => ok(&req.id, json!({ "published": published })),
        Err(e) => HandlerErr::from(e).response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grades.open" => Some(handle_grades_open(state, req)),
        "grades.preview" => Some(handle_grades_preview(state, req)),
        "grades.validate" => Some(handle_grades_validate(state, req)),
        "grades.bulkSave" => Some(handle_grades_bulk_save(state, req)),
        "grades.refreshAggregates" => Some(handle_grades_refresh(state, req)),
        _ => None,
    }
}
