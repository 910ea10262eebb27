pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::auth::{handlers as auth, require_auth};
use crate::challenge::handlers as challenge;
use crate::character::handlers as character;
use crate::profile::handlers as profile;
use crate::quest::handlers as quest;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let gate = middleware::from_fn_with_state(state.clone(), require_auth);

    // Auth API: session issuance is public, the rest sits behind the gate
    let auth_public = Router::new()
        .route("/register", post(auth::handle_register))
        .route("/login", post(auth::handle_login))
        .route("/token/refresh", post(auth::handle_refresh))
        .route("/logout", post(auth::handle_logout))
        .route("/forgot-password", post(auth::handle_forgot_password))
        .route("/reset-password", post(auth::handle_reset_password))
        .route("/onboard", post(auth::handle_onboard));
    let auth_gated = Router::new()
        .route("/sync", post(auth::handle_sync))
        .route("/me", get(auth::handle_get_me).put(auth::handle_update_me))
        .route_layer(gate.clone());

    let profiles = Router::new()
        .route(
            "/profile",
            get(profile::handle_get_profile)
                .post(profile::handle_create_profile)
                .patch(profile::handle_update_profile),
        )
        .route(
            "/challenge",
            get(challenge::handle_list_challenges).post(challenge::handle_create_challenge),
        )
        .route(
            "/challenge/:id",
            get(challenge::handle_get_challenge)
                .patch(challenge::handle_update_challenge)
                .delete(challenge::handle_delete_challenge),
        )
        .route(
            "/quest/:challenge_id",
            get(quest::handle_list_quests).post(quest::handle_create_quest),
        )
        .route(
            "/quest/:challenge_id/:id",
            get(quest::handle_get_quest)
                .patch(quest::handle_update_quest)
                .delete(quest::handle_delete_quest),
        )
        .route_layer(gate.clone());

    // Character catalogue: reads are public, writes need a bearer token
    let characters_public = Router::new()
        .route("/character", get(character::handle_list_characters))
        .route("/character/:id", get(character::handle_get_character));
    let upload_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);
    let characters_gated = Router::new()
        .route(
            "/character",
            post(character::handle_create_character).layer(upload_limit),
        )
        .route(
            "/character/:id",
            put(character::handle_replace_character)
                .layer(upload_limit)
                .delete(character::handle_delete_character),
        )
        .route_layer(gate);

    Router::new()
        .route("/health", get(health::health_handler))
        .nest("/auth", auth_public.merge(auth_gated))
        .merge(profiles)
        .merge(characters_public)
        .merge(characters_gated)
        .with_state(state)
}
