use axum::{
    Router,
    http::{Request, header::HeaderName},
    middleware,
    routing::get,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::{DefaultOnFailure, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, field};

use utils::text::non_empty;

use crate::{AppState, error::ApiError, middleware::require_session};

pub mod auth;
pub mod board_documents;
pub mod boards;
pub mod card_documents;
pub mod discord;
pub mod goals;
pub mod health;
pub mod kpi;
pub mod meta;
pub mod notes;
pub mod overview;
pub mod project_boards;
pub mod project_documents;
pub mod projects;
pub mod standalone_documents;
pub mod tiktok;
pub mod twitter;
pub mod youtube;

/// Body returned by every create endpoint.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Created {
    pub id: i64,
}

/// Trimmed, non-empty title or a 400 with `message`.
pub(crate) fn required(value: Option<&str>, message: &str) -> Result<String, ApiError> {
    non_empty(value).ok_or_else(|| ApiError::bad_request(message))
}

pub fn router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<_>| {
            let request_id = request
                .extensions()
                .get::<RequestId>()
                .and_then(|id| id.header_value().to_str().ok());
            let span = tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = field::Empty,
                user_id = field::Empty
            );
            if let Some(request_id) = request_id {
                span.record("request_id", field::display(request_id));
            }
            span
        })
        .on_response(DefaultOnResponse::new().level(Level::INFO))
        .on_failure(DefaultOnFailure::new().level(Level::ERROR));

    let public = Router::<AppState>::new()
        .route("/health", get(health::health_check))
        .merge(auth::public_router())
        .merge(twitter::callback_router());

    let protected = Router::<AppState>::new()
        .merge(auth::protected_router())
        .merge(boards::router(&state))
        .merge(board_documents::router(&state))
        .merge(card_documents::router())
        .merge(discord::router(&state))
        .merge(notes::router())
        .merge(standalone_documents::router())
        .merge(projects::router(&state))
        .merge(goals::router(&state))
        .merge(kpi::router(&state))
        .merge(project_boards::router(&state))
        .merge(project_documents::router(&state))
        .merge(tiktok::router(&state))
        .merge(twitter::router(&state))
        .merge(youtube::router(&state))
        .merge(youtube::user_router())
        .merge(meta::router(&state))
        .merge(overview::router(&state))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    Router::<AppState>::new()
        .nest("/api", public.merge(protected))
        .layer(CorsLayer::permissive())
        .layer(trace_layer)
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
            "x-request-id",
        )))
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static("x-request-id"),
            MakeRequestUuid {},
        ))
        .with_state(state)
}
