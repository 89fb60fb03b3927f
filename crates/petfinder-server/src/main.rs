mod config;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use petfinder_api::auth::{self, AppState, AppStateInner};
use petfinder_api::middleware::require_auth;
use petfinder_api::token::TokenService;
use petfinder_api::{comments, forum, lost_found, pets, users};
use petfinder_mail::SmtpMailer;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "petfinder=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let config = Config::from_env()?;

    // Init database
    let db = petfinder_db::Database::open(&PathBuf::from(&config.db_path))?;

    // Mail transport + shared state
    let mailer =
        SmtpMailer::new(&config.mail).map_err(|e| anyhow::anyhow!("mailer init failed: {}", e))?;
    let state: AppState = Arc::new(AppStateInner {
        db,
        tokens: TokenService::new(config.jwt_secret.clone()),
        mailer: Arc::new(mailer),
    });

    // Routes
    let public_routes = Router::new()
        .route("/users/register", post(auth::register))
        .route("/users/verify", post(auth::verify_code))
        .route("/auth/login", post(auth::login))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/reset-password", post(auth::reset_password))
        .route("/auth/verify-email-change", post(users::verify_email_change))
        .route("/pets", get(pets::get_pets))
        .route("/pets/adoptable", get(pets::get_adoptable_pets))
        .route("/pets/lost", get(pets::get_lost_pets))
        .route("/pets/{id}", get(pets::get_pet_by_id))
        .route("/lost-found", get(lost_found::get_reports))
        .route("/forum", get(forum::get_posts))
        .route("/forum/{id}", get(forum::get_post_by_id))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/users", get(users::get_users))
        .route("/users/me", get(users::get_profile))
        .route("/users/me", put(users::update_profile))
        .route("/users/me/email-change", post(users::request_email_change))
        .route("/users/me/email-change/confirm", post(users::confirm_email_change))
        .route("/users/{id}", get(users::get_user_by_id))
        .route("/users/{id}", delete(users::delete_user))
        .route("/auth/refresh", post(auth::refresh))
        .route("/pets", post(pets::create_pet))
        .route("/pets/{id}", put(pets::update_pet))
        .route("/pets/{id}", delete(pets::delete_pet))
        .route("/comments/{pet_id}", get(comments::get_comments))
        .route("/comments/{pet_id}", post(comments::create_comment))
        .route("/lost-found", post(lost_found::create_report))
        .route("/forum", post(forum::create_post))
        .route("/forum/{id}", put(forum::update_post))
        .route("/forum/{id}", delete(forum::delete_post))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    let app = Router::new()
        .nest("/api/v1", public_routes.merge(protected_routes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Pet Finder API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
