//! Router assembly.

use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method, Request};
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::{info_span, Span};
use uuid::Uuid;

use crate::handlers::{admin, auth, submissions, system, uploads, users, vocabs};
use crate::state::AppState;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// Request span carrying the `x-request-id` set by [`SetRequestIdLayer`].
fn request_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");
    info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id,
    )
}

/// The `/api` routes.
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/identifier", get(vocabs::identifier))
        .route("/genres", get(vocabs::genres))
        .route("/types", get(vocabs::record_types))
        .route("/transfer-methods", get(vocabs::transfer_methods))
        .route("/media-carriers", get(vocabs::media_carriers))
        .route("/submit", post(submissions::submit))
        .route("/upload", post(uploads::upload))
        .route("/upload/:file", delete(uploads::delete_upload))
        .route("/users/lookup", get(users::lookup))
        .route("/users", post(users::create))
        .route("/verify/:token", post(users::verify))
        .route("/resend/verification", post(users::resend_verification))
        .route("/admin/accessions", get(admin::list_accessions))
        .route("/admin/accessions/:id", get(admin::get_accession))
        .route(
            "/admin/accessions/:id/notes",
            get(admin::list_notes).post(admin::add_note),
        )
}

/// Build the full application router with middleware.
pub fn build_router(state: AppState) -> Router {
    let public_dir = state.config.public_dir.clone();
    let index = public_dir.join("index.html");
    let allowed_origins = state.config.origin_headers();
    let max_upload_bytes = state.config.max_upload_bytes;

    Router::new()
        .route("/version", get(system::version))
        .route("/healthcheck", get(system::healthcheck))
        .route("/authenticate", get(auth::authenticate))
        .nest("/api", api_routes())
        // Front-end routes are resolved client side.
        .fallback_service(ServeDir::new(public_dir).fallback(ServeFile::new(index)))
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(allowed_origins))
                .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
                .allow_credentials(true)
                .max_age(std::time::Duration::from_secs(3600)),
        )
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .with_state(state)
}
