//! Cart route handlers.
//!
//! The cart lives in the session. Mutations answer plain form posts with a
//! redirect and HTMX requests with a fragment plus a `cart-updated` trigger.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::HeaderMap,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use mocktail_core::{Cart, CartLineItem, OrderSummary, ProductId};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::{load_cart, save_cart};
use crate::routes::{Nav, is_htmx, local_target};
use crate::state::AppState;

/// Cart item display data for templates.
#[derive(Debug, Clone)]
pub struct CartItemView {
    pub product_id: String,
    pub name: String,
    pub description: String,
    pub image: String,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
}

impl From<&CartLineItem> for CartItemView {
    fn from(line: &CartLineItem) -> Self {
        Self {
            product_id: line.product_id.to_string(),
            name: line.name.clone(),
            description: line.description.clone(),
            image: line.image.clone(),
            quantity: line.quantity,
            price: line.price.to_string(),
            line_price: line.line_total().to_string(),
        }
    }
}

/// Cart display data for templates.
#[derive(Debug, Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub subtotal: String,
    pub tax: String,
    pub shipping: String,
    pub total: String,
    pub item_count: u32,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        let summary = OrderSummary::for_cart(cart);
        Self {
            items: cart.items().iter().map(CartItemView::from).collect(),
            subtotal: summary.subtotal.to_string(),
            tax: summary.tax.to_string(),
            shipping: summary.shipping.to_string(),
            total: summary.total.to_string(),
            item_count: cart.item_count(),
        }
    }
}

/// Form naming one product.
#[derive(Debug, Deserialize)]
pub struct ProductForm {
    pub product_id: String,
    /// Where to go after a plain form post.
    pub redirect: Option<String>,
}

/// Update quantity form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: String,
    pub quantity: i64,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub nav: Nav,
    pub cart: CartView,
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

/// Respond to a cart mutation.
fn after_change(headers: &HeaderMap, cart: &Cart, redirect: &str) -> Response {
    if is_htmx(headers) {
        (
            AppendHeaders([("HX-Trigger", "cart-updated")]),
            CartItemsTemplate {
                cart: CartView::from(cart),
            },
        )
            .into_response()
    } else {
        Redirect::to(redirect).into_response()
    }
}

/// Display cart page.
#[instrument(skip(session, user))]
pub async fn show(session: Session, OptionalAuth(user): OptionalAuth) -> Result<CartShowTemplate> {
    let cart = load_cart(&session).await?;
    Ok(CartShowTemplate {
        nav: Nav::load(&session, user.as_ref()).await?,
        cart: CartView::from(&cart),
    })
}

/// Add a mocktail with quantity 1. Already-present lines are left as they are.
///
/// HTMX requests get the count badge back.
#[instrument(skip(state, session, headers))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let id = ProductId::new(form.product_id);
    let mocktail = state
        .catalog()
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("mocktail {id}")))?;

    let mut cart = load_cart(&session).await?;
    cart.add_item(mocktail);
    save_cart(&session, &cart).await?;

    add_breadcrumb("cart", "Added to cart", Some(&[("product_id", id.as_str())]));
    tracing::info!(product_id = %id, count = cart.item_count(), "Added to cart");

    if is_htmx(&headers) {
        return Ok((
            AppendHeaders([("HX-Trigger", "cart-updated")]),
            CartCountTemplate {
                count: cart.item_count(),
            },
        )
            .into_response());
    }
    Ok(Redirect::to(local_target(form.redirect.as_deref(), "/cart")).into_response())
}

/// Set a line's quantity. Zero or less removes the line.
#[instrument(skip(session, headers))]
pub async fn update(
    session: Session,
    headers: HeaderMap,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response> {
    let id = ProductId::new(form.product_id);
    let mut cart = load_cart(&session).await?;
    cart.set_quantity(&id, form.quantity);
    save_cart(&session, &cart).await?;

    add_breadcrumb("cart", "Updated quantity", Some(&[("product_id", id.as_str())]));
    Ok(after_change(&headers, &cart, "/cart"))
}

/// Add one more of a mocktail, adding the line if absent.
#[instrument(skip(state, session, headers))]
pub async fn increment(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let id = ProductId::new(form.product_id);
    let mocktail = state
        .catalog()
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("mocktail {id}")))?;

    let mut cart = load_cart(&session).await?;
    cart.increment(mocktail);
    save_cart(&session, &cart).await?;

    Ok(after_change(
        &headers,
        &cart,
        local_target(form.redirect.as_deref(), "/cart"),
    ))
}

/// Take one away, removing the line at zero.
#[instrument(skip(session, headers))]
pub async fn decrement(
    session: Session,
    headers: HeaderMap,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let id = ProductId::new(form.product_id);
    let mut cart = load_cart(&session).await?;
    cart.decrement(&id);
    save_cart(&session, &cart).await?;

    Ok(after_change(
        &headers,
        &cart,
        local_target(form.redirect.as_deref(), "/cart"),
    ))
}

/// Remove a line.
#[instrument(skip(session, headers))]
pub async fn remove(
    session: Session,
    headers: HeaderMap,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let id = ProductId::new(form.product_id);
    let mut cart = load_cart(&session).await?;
    cart.remove_item(&id);
    save_cart(&session, &cart).await?;

    add_breadcrumb("cart", "Removed from cart", Some(&[("product_id", id.as_str())]));
    Ok(after_change(&headers, &cart, "/cart"))
}

/// Cart count badge fragment.
pub async fn count(session: Session) -> Result<CartCountTemplate> {
    let cart = load_cart(&session).await?;
    Ok(CartCountTemplate {
        count: cart.item_count(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use mocktail_core::Catalog;

    use super::*;

    #[test]
    fn test_cart_view_totals() {
        let catalog = Catalog::builtin();
        let mut cart = Cart::new();
        cart.add_item(catalog.get(&ProductId::new("1")).unwrap());
        cart.set_quantity(&ProductId::new("1"), 2);
        cart.add_item(catalog.get(&ProductId::new("2")).unwrap());

        let view = CartView::from(&cart);
        assert_eq!(view.item_count, 3);
        assert_eq!(view.subtotal, "$36.97");
        assert_eq!(view.tax, "$2.96");
        assert_eq!(view.shipping, "$5.99");
        assert_eq!(view.total, "$45.92");
        assert_eq!(view.items[0].line_price, "$25.98");
    }
}
