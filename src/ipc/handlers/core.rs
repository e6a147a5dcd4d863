use serde_json::json;

use crate::client::HttpAcademicClient;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{get_required_i64, get_required_str};
use crate::ipc::types::{AppState, Request, Session};
use crate::model::UserProfile;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "hasSession": state.session.is_some(),
            "username": state.session.as_ref().map(|s| s.profile.username.clone()),
        }),
    )
}

fn handle_session_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    let base_url = match get_required_str(&req.params, "baseUrl") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let token = match get_required_str(&req.params, "token") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let profile: UserProfile = match req
        .params
        .get("profile")
        .cloned()
        .ok_or("missing profile")
        .and_then(|v| serde_json::from_value(v).map_err(|_| "bad profile"))
    {
        Ok(p) => p,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };

    tracing::info!(username = %profile.username, "session installed");
    let role = profile.user_type;
    state.session = Some(Session {
        client: Box::new(HttpAcademicClient::new(&base_url, &token)),
        profile,
    });
    ok(&req.id, json!({ "role": role }))
}

fn handle_session_clear(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.session = None;
    ok(&req.id, json!({ "cleared": true }))
}

fn handle_cache_invalidate(state: &mut AppState, req: &Request) -> serde_json::Value {
    let class_id = match get_required_i64(&req.params, "classId") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    state.cache.invalidate_class(class_id);
    ok(&req.id, json!({ "invalidated": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "session.set" => Some(handle_session_set(state, req)),
        "session.clear" => Some(handle_session_clear(state, req)),
        "cache.invalidate" => Some(handle_cache_invalidate(state, req)),
        _ => None,
    }
}
