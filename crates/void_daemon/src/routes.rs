use crate::state::AppState;
use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{
        sse::{Event, Sse},
        Json,
    },
    routing::{get, post},
    Router,
};
use std::convert::Infallible;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use void_core::{ClickOutcome, GameView, PurchaseOutcome};
use void_store::unix_millis;

#[cfg(test)]
pub fn make_router(state: AppState) -> Router {
    make_router_with_cors(state, "http://localhost:5173").expect("static origin parses")
}

pub fn make_router_with_cors(state: AppState, cors_origin: &str) -> Result<Router> {
    let origin = cors_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("invalid CORS origin: {cors_origin}"))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Ok(Router::new()
        .route("/api/v1/view", get(view_handler))
        .route("/api/v1/export", get(export_handler))
        .route("/api/v1/stream", get(stream_handler))
        .route("/api/v1/click", post(click_handler))
        .route("/api/v1/structures/:id/buy", post(buy_structure_handler))
        .route("/api/v1/upgrades/:id/buy", post(buy_upgrade_handler))
        .route("/api/v1/import", post(import_handler))
        .route("/api/v1/reset", post(reset_handler))
        .route("/api/v1/prestige", post(prestige_handler))
        .route("/api/v1/save", post(save_handler))
        .route("/api/v1/pause", post(pause_handler))
        .route("/api/v1/resume", post(resume_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

fn purchase_status(outcome: &PurchaseOutcome) -> StatusCode {
    match outcome {
        PurchaseOutcome::Purchased { .. } => StatusCode::OK,
        PurchaseOutcome::Unaffordable { .. } | PurchaseOutcome::MaxLevel => StatusCode::CONFLICT,
        PurchaseOutcome::UnknownId => StatusCode::NOT_FOUND,
    }
}

pub async fn view_handler(State(app_state): State<AppState>) -> Json<GameView> {
    let sim = app_state.sim.lock();
    Json(sim.game.view())
}

pub async fn export_handler(
    State(app_state): State<AppState>,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    let sim = app_state.sim.lock();
    match sim.game.export_snapshot() {
        Ok(json) => {
            drop(sim);
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/json")],
                json,
            )
        }
        Err(err) => {
            tracing::error!("export serialization failed: {err}");
            drop(sim);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "application/json")],
                r#"{"error":"serialization failed"}"#.to_string(),
            )
        }
    }
}

pub async fn click_handler(State(app_state): State<AppState>) -> Json<ClickOutcome> {
    let mut sim = app_state.sim.lock();
    let outcome = sim.game.handle_manual_click();
    let events = sim.game.take_events();
    drop(sim);
    app_state.publish(events);
    Json(outcome)
}

pub async fn buy_structure_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> (StatusCode, Json<PurchaseOutcome>) {
    let mut sim = app_state.sim.lock();
    let outcome = sim.game.purchase_structure(&id);
    let events = sim.game.take_events();
    drop(sim);
    app_state.publish(events);
    (purchase_status(&outcome), Json(outcome))
}

pub async fn buy_upgrade_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> (StatusCode, Json<PurchaseOutcome>) {
    let mut sim = app_state.sim.lock();
    let outcome = sim.game.purchase_upgrade(&id);
    let events = sim.game.take_events();
    drop(sim);
    app_state.publish(events);
    (purchase_status(&outcome), Json(outcome))
}

/// Body is raw export text. A rejected import leaves the running game as is.
pub async fn import_handler(
    State(app_state): State<AppState>,
    body: String,
) -> (StatusCode, Json<serde_json::Value>) {
    let mut sim = app_state.sim.lock();
    let result = sim.game.import_snapshot(&body);
    let events = sim.game.take_events();
    drop(sim);
    app_state.publish(events);
    match result {
        Ok(warnings) => (
            StatusCode::OK,
            Json(serde_json::json!({ "warnings": warnings })),
        ),
        Err(err) => {
            tracing::warn!("import rejected: {err}");
            (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": err.to_string() })),
            )
        }
    }
}

pub async fn reset_handler(State(app_state): State<AppState>) -> Json<GameView> {
    let mut sim = app_state.sim.lock();
    sim.game.reset_all();
    let events = sim.game.take_events();
    let view = sim.game.view();
    drop(sim);
    app_state.publish(events);
    Json(view)
}

pub async fn prestige_handler(State(app_state): State<AppState>) -> Json<GameView> {
    let mut sim = app_state.sim.lock();
    sim.game.reset_for_prestige();
    let events = sim.game.take_events();
    let view = sim.game.view();
    drop(sim);
    app_state.publish(events);
    Json(view)
}

pub async fn save_handler(
    State(app_state): State<AppState>,
) -> (StatusCode, Json<serde_json::Value>) {
    let mut guard = app_state.sim.lock();
    let sim = &mut *guard;
    let saved = sim.scheduler.save_now(&mut sim.game, unix_millis());
    let path = sim.scheduler.store().path().display().to_string();
    let last_save_time = sim.game.last_save_time();
    let events = sim.game.take_events();
    drop(guard);

    let reason = events.iter().find_map(|event| match event {
        void_core::Event::SaveFailed { reason } => Some(reason.clone()),
        _ => None,
    });
    app_state.publish(events);

    if saved {
        (
            StatusCode::OK,
            Json(serde_json::json!({"path": path, "last_save_time": last_save_time})),
        )
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({
                "error": reason.unwrap_or_else(|| "save failed".to_string()),
                "path": path,
            })),
        )
    }
}

pub async fn pause_handler(State(app_state): State<AppState>) -> Json<serde_json::Value> {
    app_state.paused.store(true, Ordering::Relaxed);
    Json(serde_json::json!({"paused": true}))
}

pub async fn resume_handler(State(app_state): State<AppState>) -> Json<serde_json::Value> {
    app_state.paused.store(false, Ordering::Relaxed);
    Json(serde_json::json!({"paused": false}))
}

pub async fn stream_handler(
    State(app_state): State<AppState>,
) -> Sse<impl futures_core::Stream<Item = Result<Event, Infallible>>> {
    let mut rx = app_state.event_tx.subscribe();
    let sim = app_state.sim.clone();
    let paused = app_state.paused.clone();

    let stream = async_stream::stream! {
        let mut heartbeat = tokio::time::interval(Duration::from_millis(500));
        heartbeat.tick().await; // discard the immediate first tick
        let mut flush = tokio::time::interval(Duration::from_millis(50));
        flush.tick().await; // discard the immediate first tick
        let mut pending: Vec<void_core::Event> = Vec::new();
        loop {
            tokio::select! {
                result = rx.recv() => {
                    match result {
                        Ok(events) => pending.extend(events),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::debug!(skipped, "stream subscriber lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
                _ = flush.tick() => {
                    if !pending.is_empty() {
                        let data = serde_json::to_string(&pending).unwrap_or_default();
                        pending.clear();
                        yield Ok(Event::default().event("events").data(data));
                    }
                }
                _ = heartbeat.tick() => {
                    let (void_energy, heat) = {
                        let sim = sim.lock();
                        (sim.game.ledger().void_energy(), sim.game.clicker().heat())
                    };
                    let hb = serde_json::json!({
                        "heartbeat": true,
                        "void_energy": void_energy,
                        "heat": heat,
                        "paused": paused.load(Ordering::Relaxed),
                    });
                    yield Ok(Event::default().event("heartbeat").data(hb.to_string()));
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("ping"),
    )
}
