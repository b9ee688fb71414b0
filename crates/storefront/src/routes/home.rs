//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::routes::Nav;
use crate::routes::menu::MocktailView;
use crate::state::AppState;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub nav: Nav,
    pub best_sellers: Vec<MocktailView>,
    pub new_arrivals: Vec<MocktailView>,
}

/// Display the home page.
#[instrument(skip(state, session, user))]
pub async fn home(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<HomeTemplate> {
    let catalog = state.catalog();
    Ok(HomeTemplate {
        nav: Nav::load(&session, user.as_ref()).await?,
        best_sellers: catalog.best_sellers().map(MocktailView::from).collect(),
        new_arrivals: catalog.new_arrivals().map(MocktailView::from).collect(),
    })
}
