//! Account route handlers.
//!
//! These routes require authentication.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::Redirect,
};
use tower_sessions::Session;
use tracing::instrument;

use mocktail_core::{Order, OrderStatus, ProfileUpdate, User};

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::routes::auth::{PreferenceView, field, known_preferences, preference_options};
use crate::routes::{MessageQuery, Nav, redirect_with};
use crate::state::{AppState, session_storage};

/// Orders shown on the account overview.
const RECENT_ORDER_COUNT: usize = 5;

/// User display data for templates.
#[derive(Debug, Clone)]
pub struct UserView {
    pub email: String,
    pub full_name: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: String,
    pub date_of_birth: String,
    pub preferences: Vec<String>,
    pub member_since: String,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.to_string(),
            full_name: user.full_name(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            phone: user.phone.clone(),
            address: user.address.clone(),
            date_of_birth: user.date_of_birth.clone(),
            preferences: user.preferences.clone(),
            member_since: user.created_at.format("%B %Y").to_string(),
        }
    }
}

/// Order display data for templates.
#[derive(Debug, Clone)]
pub struct OrderView {
    pub id: String,
    pub name: String,
    pub ingredients: String,
    pub price: String,
    pub status: &'static str,
    pub date: String,
    pub notes: Option<String>,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.to_string(),
            name: order.name.clone(),
            ingredients: order.ingredients.join(", "),
            price: order.price.to_string(),
            status: order.status.as_str(),
            date: order.order_date.format("%b %-d, %Y").to_string(),
            notes: order.special_instructions.clone(),
        }
    }
}

/// Order counts for the overview.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderStats {
    pub total: usize,
    pub completed: usize,
}

impl OrderStats {
    fn of(orders: &[Order]) -> Self {
        Self {
            total: orders.len(),
            completed: orders
                .iter()
                .filter(|o| o.status == OrderStatus::Completed)
                .count(),
        }
    }
}

/// Newest first.
fn newest_first(orders: &[Order]) -> Vec<OrderView> {
    let mut sorted: Vec<&Order> = orders.iter().collect();
    sorted.sort_by(|a, b| b.order_date.cmp(&a.order_date).then_with(|| b.id.cmp(&a.id)));
    sorted.into_iter().map(OrderView::from).collect()
}

/// Account overview page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/index.html")]
pub struct AccountIndexTemplate {
    pub nav: Nav,
    pub user: UserView,
    pub stats: OrderStats,
    pub recent_orders: Vec<OrderView>,
    pub success: Option<String>,
}

/// Profile edit template.
#[derive(Template, WebTemplate)]
#[template(path = "account/edit.html")]
pub struct AccountEditTemplate {
    pub nav: Nav,
    pub user: UserView,
    pub preferences: Vec<PreferenceView>,
    pub error: Option<String>,
}

/// Order history template.
#[derive(Template, WebTemplate)]
#[template(path = "account/orders.html")]
pub struct AccountOrdersTemplate {
    pub nav: Nav,
    pub orders: Vec<OrderView>,
}

/// Display account overview page.
#[instrument(skip(state, session, user))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Query(query): Query<MessageQuery>,
) -> Result<AccountIndexTemplate> {
    let storage = session_storage(&session);
    let orders = state.profiles(&storage).user_orders().await?;

    let mut recent = newest_first(&orders);
    recent.truncate(RECENT_ORDER_COUNT);

    Ok(AccountIndexTemplate {
        nav: Nav::load(&session, Some(&user)).await?,
        user: UserView::from(&user),
        stats: OrderStats::of(&orders),
        recent_orders: recent,
        success: query.success,
    })
}

/// Display the profile form.
#[instrument(skip(session, user))]
pub async fn edit_page(
    session: Session,
    RequireAuth(user): RequireAuth,
    Query(query): Query<MessageQuery>,
) -> Result<AccountEditTemplate> {
    Ok(AccountEditTemplate {
        nav: Nav::load(&session, Some(&user)).await?,
        preferences: preference_options(&user.preferences),
        user: UserView::from(&user),
        error: query.error,
    })
}

/// Profile edit as submitted. Email is not editable.
fn profile_update_from(pairs: &[(String, String)]) -> ProfileUpdate {
    let text = |key: &str| field(pairs, key).map(|v| v.trim().to_owned());
    ProfileUpdate {
        first_name: text("first_name"),
        last_name: text("last_name"),
        phone: text("phone"),
        address: text("address"),
        date_of_birth: text("date_of_birth"),
        preferences: Some(known_preferences(
            pairs
                .iter()
                .filter(|(k, _)| k == "preferences")
                .map(|(_, v)| v.as_str()),
        )),
    }
}

/// Save the profile form.
#[instrument(skip(state, session, user, pairs))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Redirect> {
    let update = profile_update_from(&pairs);
    if update.first_name.as_deref().is_some_and(str::is_empty) {
        return Ok(redirect_with("/account/edit", "error", "First name is required"));
    }
    if update.last_name.as_deref().is_some_and(str::is_empty) {
        return Ok(redirect_with("/account/edit", "error", "Last name is required"));
    }

    let storage = session_storage(&session);
    state
        .profiles(&storage)
        .update_profile(&update)
        .await?
        .ok_or_else(|| AppError::Unauthorized("session ended".to_string()))?;

    tracing::info!(user_id = %user.id, "Profile updated");
    Ok(redirect_with("/account", "success", "Profile updated"))
}

/// Display the full order history.
#[instrument(skip(state, session, user))]
pub async fn orders(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<AccountOrdersTemplate> {
    let storage = session_storage(&session);
    let orders = state.profiles(&storage).user_orders().await?;

    Ok(AccountOrdersTemplate {
        nav: Nav::load(&session, Some(&user)).await?,
        orders: newest_first(&orders),
    })
}
