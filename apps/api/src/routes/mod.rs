pub mod health;

use axum::{
    routing::{get, patch, post, put},
    Router,
};

use crate::preview::handlers as sessions;
use crate::state::AppState;
use crate::variants::handlers as variants;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Preview sessions
        .route("/api/v1/sessions", post(sessions::handle_create_session))
        .route(
            "/api/v1/sessions/:id",
            get(sessions::handle_get_session).delete(sessions::handle_delete_session),
        )
        .route(
            "/api/v1/sessions/:id/inputs",
            patch(sessions::handle_update_inputs),
        )
        .route(
            "/api/v1/sessions/:id/overrides/reset",
            post(sessions::handle_reset_overrides),
        )
        .route(
            "/api/v1/sessions/:id/overrides/:section/:entity_id",
            put(sessions::handle_toggle_override),
        )
        .route(
            "/api/v1/sessions/:id/library/reload",
            post(sessions::handle_reload_library),
        )
        .route(
            "/api/v1/sessions/:id/retry/:channel",
            post(sessions::handle_retry),
        )
        .route(
            "/api/v1/sessions/:id/document",
            get(sessions::handle_get_document),
        )
        // Variants
        .route(
            "/api/v1/sessions/:id/variants",
            post(variants::handle_save_variant),
        )
        .route(
            "/api/v1/sessions/:id/variants/:variant_id/inspect",
            post(variants::handle_inspect_variant),
        )
        .route(
            "/api/v1/sessions/:id/variants/:variant_id/export",
            post(variants::handle_export_variant),
        )
        .route("/api/v1/variants", get(variants::handle_list_variants))
        .route(
            "/api/v1/variants/:id",
            get(variants::handle_get_variant)
                .put(variants::handle_update_variant)
                .delete(variants::handle_delete_variant),
        )
        .with_state(state)
}
