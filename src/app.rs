use crate::auth::{self, SessionStore};
use crate::config::{self, AppConfig};
use crate::export;
use crate::views;
use axum::extract::FromRef;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use axum_extra::extract::cookie::Key;
use handlebars::Handlebars;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

/// Shared application state. Cloned per request; the heavyweight pieces sit
/// behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub templates: Arc<Handlebars<'static>>,
    pub cookie_key: Key,
    pub sessions: Arc<SessionStore>,
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Key {
        state.cookie_key.clone()
    }
}

pub fn router(state: AppState) -> Router {
    let guarded = Router::new()
        .route("/dashboard", get(views::dashboard))
        .route("/uploaded-inquiry", get(views::uploaded_inquiry))
        .route("/uploaded-inquiry-auth", post(views::uploaded_inquiry_auth))
        .route("/office-wallets", get(views::office_wallets))
        .route("/reconciliations", get(views::reconciliations))
        .route("/targets", get(views::targets))
        .route("/new-riders", get(views::new_riders))
        .route("/order-responses", get(views::order_responses))
        .route("/new-riders-responses", get(views::new_riders_responses))
        .route("/rejected-inquiry", get(views::rejected_inquiry))
        .route("/download", get(export::download))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    Router::new()
        .route("/", get(views::login_page))
        .route("/login", post(auth::handle_login))
        .route("/logout", get(auth::handle_logout))
        .merge(guarded)
        .nest_service("/static", ServeDir::new("static"))
        .with_state(state)
}

pub async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut templates = Handlebars::new();
    templates.register_templates_directory(".hbs", "templates")?;

    let port = config.port;
    let state = AppState {
        config: Arc::new(config),
        templates: Arc::new(templates),
        cookie_key: config::session_key(),
        sessions: Arc::new(SessionStore::default()),
    };

    let app = router(state);

    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    log::info!("listening on http://0.0.0.0:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}
