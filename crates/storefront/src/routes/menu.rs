//! Menu route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use mocktail_core::{Category, MenuQuery, Mocktail, ProductId, SortKey};

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::load_cart;
use crate::routes::Nav;
use crate::state::AppState;

/// Mocktail display data for templates.
#[derive(Debug, Clone)]
pub struct MocktailView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: String,
    pub image: String,
    pub category: &'static str,
    pub ingredients: Vec<String>,
    pub preparation_time: u32,
    pub calories: u32,
    pub tags: Vec<String>,
    pub is_best_seller: bool,
    pub is_new: bool,
}

impl From<&Mocktail> for MocktailView {
    fn from(m: &Mocktail) -> Self {
        Self {
            id: m.id.to_string(),
            name: m.name.clone(),
            description: m.description.clone(),
            price: m.price.to_string(),
            image: m.image.clone(),
            category: m.category.label(),
            ingredients: m.ingredients.clone(),
            preparation_time: m.preparation_time,
            calories: m.calories,
            tags: m.tags.clone(),
            is_best_seller: m.is_best_seller,
            is_new: m.is_new,
        }
    }
}

/// A `<select>` option.
#[derive(Debug, Clone)]
pub struct OptionView {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// Menu query string. Unknown values fall back to the defaults.
#[derive(Debug, Default, Deserialize)]
pub struct MenuParams {
    pub search: Option<String>,
    pub category: Option<String>,
    pub sort: Option<String>,
}

impl MenuParams {
    fn to_query(&self) -> MenuQuery {
        MenuQuery {
            search: self
                .search
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from),
            category: self.category.as_deref().and_then(|c| c.parse().ok()),
            sort: self
                .sort
                .as_deref()
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
        }
    }
}

fn category_options(selected: Option<Category>) -> Vec<OptionView> {
    std::iter::once(OptionView {
        value: "all",
        label: "All",
        selected: selected.is_none(),
    })
    .chain(Category::ALL.into_iter().map(|c| OptionView {
        value: c.as_str(),
        label: c.label(),
        selected: selected == Some(c),
    }))
    .collect()
}

fn sort_options(selected: SortKey) -> Vec<OptionView> {
    SortKey::ALL
        .into_iter()
        .map(|k| OptionView {
            value: k.as_str(),
            label: k.label(),
            selected: k == selected,
        })
        .collect()
}

/// Menu page template.
#[derive(Template, WebTemplate)]
#[template(path = "menu/index.html")]
pub struct MenuIndexTemplate {
    pub nav: Nav,
    pub items: Vec<MocktailView>,
    pub search: String,
    pub categories: Vec<OptionView>,
    pub sorts: Vec<OptionView>,
}

/// Mocktail detail template.
#[derive(Template, WebTemplate)]
#[template(path = "menu/show.html")]
pub struct MenuShowTemplate {
    pub nav: Nav,
    pub item: MocktailView,
    pub in_cart: u32,
}

/// Display the menu, filtered and sorted.
#[instrument(skip(state, session, user))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Query(params): Query<MenuParams>,
) -> Result<MenuIndexTemplate> {
    let query = params.to_query();
    let items = state
        .catalog()
        .search(&query)
        .into_iter()
        .map(MocktailView::from)
        .collect();

    Ok(MenuIndexTemplate {
        nav: Nav::load(&session, user.as_ref()).await?,
        items,
        search: query.search.clone().unwrap_or_default(),
        categories: category_options(query.category),
        sorts: sort_options(query.sort),
    })
}

/// Display one mocktail.
#[instrument(skip(state, session, user))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(id): Path<String>,
) -> Result<MenuShowTemplate> {
    let id = ProductId::new(id);
    let mocktail = state
        .catalog()
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("mocktail {id}")))?;

    let in_cart = load_cart(&session).await?.quantity_of(&id);

    Ok(MenuShowTemplate {
        nav: Nav::load(&session, user.as_ref()).await?,
        item: MocktailView::from(mocktail),
        in_cart,
    })
}
