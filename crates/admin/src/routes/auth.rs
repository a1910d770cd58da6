//! Login and logout.

use askama::Template;
use axum::{
    Form, Router,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::middleware::{LOGIN_PATH, clear_current_admin, set_current_admin};
use crate::services::{AuthError, auth::admin_sign_in};
use crate::state::AppState;

/// Where a successful sign-in lands.
const DASHBOARD_PATH: &str = "/admin";

/// Login page template.
#[derive(Template)]
#[template(path = "login.html")]
struct LoginPageTemplate {
    email: String,
    error: Option<String>,
}

/// Login form body.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(LOGIN_PATH, get(login_page).post(login))
        .route("/logout", post(logout))
}

fn render_login(status: StatusCode, email: String, error: Option<String>) -> Response {
    match (LoginPageTemplate { email, error }).render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => AppError::Internal(format!("login template: {e}")).into_response(),
    }
}

/// GET /login
async fn login_page() -> Response {
    render_login(StatusCode::OK, String::new(), None)
}

/// POST /login
///
/// Signs in, checks the admin role, then stores the admin in the session.
#[instrument(skip(state, session, form), fields(email = %form.email))]
async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let admin = match admin_sign_in(
        state.identity(),
        state.roles(),
        &form.email,
        &form.password,
    )
    .await
    {
        Ok(admin) => admin,
        Err(AuthError::Documents(e)) => return AppError::Documents(e).into_response(),
        Err(e) => {
            let message = match e {
                AuthError::NotAdministrator => "This account is not an administrator.",
                _ => "Invalid email or password.",
            };
            return render_login(
                StatusCode::UNAUTHORIZED,
                form.email,
                Some(message.to_string()),
            );
        }
    };

    if let Err(e) = set_current_admin(&session, &admin).await {
        return AppError::Session(e).into_response();
    }
    set_sentry_user(admin.uid.as_str(), Some(admin.email.as_str()));

    Redirect::to(DASHBOARD_PATH).into_response()
}

/// POST /logout
async fn logout(session: Session) -> impl IntoResponse {
    if let Err(e) = clear_current_admin(&session).await {
        tracing::warn!(error = %e, "Failed to clear admin session");
    }
    clear_sentry_user();

    Redirect::to(LOGIN_PATH)
}
