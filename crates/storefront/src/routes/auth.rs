//! Authentication route handlers.
//!
//! Handles login, registration and logout against the self-hosted profile
//! store. The signed-in user is kept as a snapshot in the browser session.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use secrecy::SecretString;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use mocktail_core::user::PREFERENCE_OPTIONS;

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::routes::{MessageQuery, Nav, redirect_with};
use crate::services::Registration;
use crate::state::{AppState, session_storage};

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// A preference checkbox.
#[derive(Debug, Clone)]
pub struct PreferenceView {
    pub name: &'static str,
    pub checked: bool,
}

/// Checkbox list for the preference options, ticking `chosen`.
pub(crate) fn preference_options(chosen: &[String]) -> Vec<PreferenceView> {
    PREFERENCE_OPTIONS
        .iter()
        .map(|&name| PreferenceView {
            name,
            checked: chosen.iter().any(|c| c == name),
        })
        .collect()
}

/// Keep only known preferences, in option order, without repeats.
pub(crate) fn known_preferences<'a>(values: impl Iterator<Item = &'a str> + Clone) -> Vec<String> {
    PREFERENCE_OPTIONS
        .iter()
        .filter(|&&option| values.clone().any(|v| v == option))
        .map(|&option| option.to_owned())
        .collect()
}

/// Value of the first field named `key`.
pub(crate) fn field<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Registration form as submitted.
///
/// Read from raw pairs because the preference checkboxes repeat their name.
fn registration_from(pairs: &[(String, String)]) -> Registration {
    let text = |key: &str| field(pairs, key).unwrap_or_default().to_owned();
    Registration {
        email: text("email"),
        password: SecretString::from(text("password")),
        password_confirm: SecretString::from(text("password_confirm")),
        first_name: text("first_name"),
        last_name: text("last_name"),
        phone: text("phone"),
        address: text("address"),
        date_of_birth: text("date_of_birth"),
        preferences: known_preferences(
            pairs
                .iter()
                .filter(|(k, _)| k == "preferences")
                .map(|(_, v)| v.as_str()),
        ),
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub nav: Nav,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Values echoed back into the registration form. Passwords never are.
#[derive(Debug, Clone, Default)]
pub struct RegisterValues {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: String,
    pub date_of_birth: String,
}

impl From<&Registration> for RegisterValues {
    fn from(r: &Registration) -> Self {
        Self {
            email: r.email.clone(),
            first_name: r.first_name.clone(),
            last_name: r.last_name.clone(),
            phone: r.phone.clone(),
            address: r.address.clone(),
            date_of_birth: r.date_of_birth.clone(),
        }
    }
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub nav: Nav,
    pub error: Option<String>,
    pub values: RegisterValues,
    pub preferences: Vec<PreferenceView>,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<MessageQuery>,
) -> Result<Response> {
    if user.is_some() {
        return Ok(Redirect::to("/account").into_response());
    }
    Ok(LoginTemplate {
        nav: Nav::load(&session, None).await?,
        error: query.error,
        success: query.success,
    }
    .into_response())
}

/// Handle login form submission.
///
/// Every credential failure shows the same message.
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Redirect> {
    let storage = session_storage(&session);
    let password = SecretString::from(form.password);

    match state.profiles(&storage).login(&form.email, &password).await {
        Ok(user) => {
            set_sentry_user(&user.id, Some(user.email.as_str()));
            Ok(Redirect::to("/account"))
        }
        Err(e) => match e.user_message() {
            Some(message) => {
                tracing::info!(error = %e, "Login failed");
                Ok(redirect_with("/auth/login", "error", &message))
            }
            None => Err(AppError::Auth(e)),
        },
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<MessageQuery>,
) -> Result<Response> {
    if user.is_some() {
        return Ok(Redirect::to("/account").into_response());
    }
    Ok(RegisterTemplate {
        nav: Nav::load(&session, None).await?,
        error: query.error,
        values: RegisterValues::default(),
        preferences: preference_options(&[]),
    }
    .into_response())
}

/// Handle registration form submission.
///
/// Validation failures re-render the form with the entered values.
#[instrument(skip(state, session, pairs))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response> {
    let registration = registration_from(&pairs);
    let storage = session_storage(&session);

    match state.profiles(&storage).register(&registration).await {
        Ok(user) => {
            set_sentry_user(&user.id, Some(user.email.as_str()));
            Ok(redirect_with("/account", "success", "Welcome to Mocktail Bar!").into_response())
        }
        Err(e) => match e.user_message() {
            Some(message) => {
                tracing::info!(error = %e, "Registration rejected");
                Ok(RegisterTemplate {
                    nav: Nav::load(&session, None).await?,
                    error: Some(message),
                    values: RegisterValues::from(&registration),
                    preferences: preference_options(&registration.preferences),
                }
                .into_response())
            }
            None => Err(AppError::Auth(e)),
        },
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Handle logout. The cart stays with the browser.
#[instrument(skip(state, session))]
pub async fn logout(State(state): State<AppState>, session: Session) -> Result<Redirect> {
    let storage = session_storage(&session);
    state.profiles(&storage).logout().await?;
    clear_sentry_user();
    Ok(Redirect::to("/"))
}
