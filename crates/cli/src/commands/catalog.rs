//! Menu listing.

use mocktail_core::{Catalog, Category, MenuQuery, SortKey};

use super::CliError;

/// Build a menu query from raw command-line values.
///
/// A missing category or `all` lists every category.
pub fn menu_query(
    search: Option<&str>,
    category: Option<&str>,
    sort: &str,
) -> Result<MenuQuery, CliError> {
    let category = match category.map(str::trim) {
        None | Some("" | "all") => None,
        Some(c) => Some(c.parse::<Category>().map_err(CliError::InvalidArgument)?),
    };
    let sort = sort.parse::<SortKey>().map_err(CliError::InvalidArgument)?;

    Ok(MenuQuery {
        search: search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned),
        category,
        sort,
    })
}

/// Print the built-in menu.
pub fn list(search: Option<&str>, category: Option<&str>, sort: &str) -> Result<(), CliError> {
    let query = menu_query(search, category, sort)?;
    let catalog = Catalog::builtin();
    let items = catalog.search(&query);

    tracing::info!("{} mocktail(s)", items.len());
    for m in items {
        let mut flags = Vec::new();
        if m.is_best_seller {
            flags.push("best seller");
        }
        if m.is_new {
            flags.push("new");
        }
        tracing::info!(
            "{:>3}  {:<28} {:>7}  {:<9}  {} min, {} cal{}",
            m.id,
            m.name,
            m.price,
            m.category.label(),
            m.preparation_time,
            m.calories,
            if flags.is_empty() {
                String::new()
            } else {
                format!("  [{}]", flags.join(", "))
            }
        );
    }
    Ok(())
}
