use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};
use service_core::observability::REQUEST_ID_HEADER;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{
    anamnesis::{get_anamnesis, save_anamnesis},
    app::{health_check, login_page},
    auth::{login_handler, logout_handler, session_handler},
    clients::{create_client, get_client, list_clients},
    courses::list_courses,
    knowledge::{list_categories, list_items, toggle_favorite},
    photos::{delete_photo, list_photos, upload_photo, MAX_UPLOAD_BYTES},
};
use crate::middleware::auth::require_session;
use crate::AppState;

pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/clientes", get(list_clients).post(create_client))
        .route("/clientes/:id", get(get_client))
        .route(
            "/clientes/:id/anamnese",
            get(get_anamnesis).put(save_anamnesis),
        )
        .route(
            "/clientes/:id/fotos",
            get(list_photos)
                .post(upload_photo)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/clientes/:id/fotos/:photo_id", delete(delete_photo))
        .route("/conhecimento/categorias", get(list_categories))
        .route("/conhecimento/itens", get(list_items))
        .route("/conhecimento/itens/:id/favorito", post(toggle_favorite))
        .route("/cursos", get(list_courses))
        .route_layer(from_fn_with_state(state.clone(), require_session));

    Router::new()
        .route("/health", get(health_check))
        .route("/login", get(login_page).post(login_handler))
        .route("/logout", post(logout_handler))
        .route("/session", get(session_handler))
        .merge(protected)
        // Add tracing layer
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                    user_id = tracing::field::Empty,
                )
            }),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}
