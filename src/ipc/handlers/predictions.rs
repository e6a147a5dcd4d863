use serde_json::json;

use crate::cache::AggregateKind;
use crate::ipc::error::{err, ok, HandlerErr};
use crate::ipc::helpers::{get_optional_i64, get_or_fetch, get_required_i64};
use crate::ipc::types::{AppState, Request};

fn handle_predictions_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(session) = state.session.as_ref() else {
        return err(&req.id, "no_session", "set a session first", None);
    };
    let class_id = match get_required_i64(&req.params, "classId") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };

    let predictions = get_or_fetch(&mut state.cache, class_id, None, AggregateKind::Predictions, || {
        session.client.predictions_by_class(class_id)
    });
    let (predictions, version) = match predictions {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };

    // History and the reality-vs-prediction comparison are rendered once
    // per visit and are cheap server-side; fetched fresh, not cached.
    let history = match session.client.prediction_history_by_class(class_id) {
        Ok(v) => v,
        Err(e) => return HandlerErr::from(e).response(&req.id),
    };
    let comparison = match session.client.prediction_comparison_stats(class_id) {
        Ok(v) => v,
        Err(e) => return HandlerErr::from(e).response(&req.id),
    };

    ok(
        &req.id,
        json!({
            "predictions": { "payload": predictions, "version": version },
            "history": history,
            "comparisonStats": comparison,
        }),
    )
}

fn handle_predictions_refresh(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(session) = state.session.as_ref() else {
        return err(&req.id, "no_session", "set a session first", None);
    };
    if !session.profile.user_type.can_manage() {
        return err(&req.id, "permission_denied", "prediction refresh requires a staff role", None);
    }
    let class_id = match get_required_i64(&req.params, "classId") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let period_id = get_optional_i64(&req.params, "periodId");

    let ack = match session.client.update_class_predictions(class_id, period_id) {
        Ok(v) => v,
        Err(e) => return HandlerErr::from(e).response(&req.id),
    };

    state.cache.invalidate(class_id, AggregateKind::Predictions);
    let payload = match session.client.predictions_by_class(class_id) {
        Ok(v) => v,
        Err(e) => return HandlerErr::from(e).response(&req.id),
    };
    let version = state
        .cache
        .put(class_id, None, AggregateKind::Predictions, payload.clone());

    ok(
        &req.id,
        json!({
            "ack": ack,
            "predictions": { "payload": payload, "version": version },
        }),
    )
}

fn handle_predictions_retrospective(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(session) = state.session.as_ref() else {
        return err(&req.id, "no_session", "set a session first", None);
    };
    if !session.profile.user_type.can_manage() {
        return err(&req.id, "permission_denied", "retrospective generation requires a staff role", None);
    }
    let class_id = match get_required_i64(&req.params, "classId") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let period_id = get_optional_i64(&req.params, "periodId");

    let ack = match session
        .client
        .generate_retrospective_predictions(class_id, period_id)
    {
        Ok(v) => v,
        Err(e) => return HandlerErr::from(e).response(&req.id),
    };
    let history = match session.client.prediction_history_by_class(class_id) {
        Ok(v) => v,
        Err(e) => return HandlerErr::from(e).response(&req.id),
    };

    ok(&req.id, json!({ "ack": ack, "history": history }))
}

fn handle_predictions_retrain(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(session) = state.session.as_ref() else {
        return err(&req.id, "no_session", "set a session first", None);
    };
    if !session.profile.user_type.can_manage() {
        return err(&req.id, "permission_denied", "model retraining requires a staff role", None);
    }
    let class_id = match get_required_i64(&req.params, "classId") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    match session.client.retrain_model(class_id) {
        Ok(ack) => ok(&req.id, json!({ "ack": ack })),
        Err(e) => HandlerErr::from(e).response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "predictions.open" => Some(handle_predictions_open(state, req)),
        "predictions.refresh" => Some(handle_predictions_refresh(state, req)),
        "predictions.retrospective" => Some(handle_predictions_retrospective(state, req)),
        "predictions.retrain" => Some(handle_predictions_retrain(state, req)),
        _ => None,
    }
}
