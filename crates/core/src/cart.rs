//! Shopping cart.
//!
//! A cart holds at most one line per product. Every mutation preserves that
//! invariant and a line never sits in the cart with a quantity of zero.

use serde::{Deserialize, Serialize};

use crate::catalog::Mocktail;
use crate::types::{Price, ProductId};

/// One product in the cart.
///
/// Display fields are copied from the catalog when the line is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    pub product_id: ProductId,
    pub name: String,
    pub price: Price,
    pub image: String,
    pub description: String,
    pub ingredients: Vec<String>,
    pub quantity: u32,
}

impl CartLineItem {
    /// A new line for `mocktail` with quantity 1.
    #[must_use]
    pub fn from_mocktail(mocktail: &Mocktail) -> Self {
        Self {
            product_id: mocktail.id.clone(),
            name: mocktail.name.clone(),
            price: mocktail.price,
            image: mocktail.image.clone(),
            description: mocktail.description.clone(),
            ingredients: mocktail.ingredients.clone(),
            quantity: 1,
        }
    }

    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.times(self.quantity)
    }
}

/// The browser session's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    #[serde(default)]
    items: Vec<CartLineItem>,
}

impl Cart {
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn position(&self, product_id: &ProductId) -> Option<usize> {
        self.items.iter().position(|i| &i.product_id == product_id)
    }

    /// Add `mocktail` with quantity 1.
    ///
    /// Does nothing when the product is already in the cart; use
    /// [`Cart::increment`] or [`Cart::set_quantity`] to change a quantity.
    pub fn add_item(&mut self, mocktail: &Mocktail) {
        if self.position(&mocktail.id).is_none() {
            self.items.push(CartLineItem::from_mocktail(mocktail));
        }
    }

    /// Set the quantity of an existing line.
    ///
    /// A quantity of zero or below removes the line. Unknown products are
    /// ignored.
    pub fn set_quantity(&mut self, product_id: &ProductId, quantity: i64) {
        let Some(index) = self.position(product_id) else {
            return;
        };
        if quantity <= 0 {
            self.items.remove(index);
        } else if let Some(line) = self.items.get_mut(index) {
            line.quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        }
    }

    /// Delete the line for `product_id`, if any.
    pub fn remove_item(&mut self, product_id: &ProductId) {
        self.items.retain(|i| &i.product_id != product_id);
    }

    /// Empty the cart.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Add one of `mocktail`, creating the line if needed.
    pub fn increment(&mut self, mocktail: &Mocktail) {
        match self.items.iter_mut().find(|i| i.product_id == mocktail.id) {
            Some(line) => line.quantity = line.quantity.saturating_add(1),
            None => self.items.push(CartLineItem::from_mocktail(mocktail)),
        }
    }

    /// Take one of `product_id` away, removing the line at zero.
    pub fn decrement(&mut self, product_id: &ProductId) {
        let current = self.quantity_of(product_id);
        if current > 0 {
            self.set_quantity(product_id, i64::from(current) - 1);
        }
    }

    /// Quantity of `product_id`, or 0 when absent.
    #[must_use]
    pub fn quantity_of(&self, product_id: &ProductId) -> u32 {
        self.items
            .iter()
            .find(|i| &i.product_id == product_id)
            .map_or(0, |i| i.quantity)
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |acc, i| acc.saturating_add(i.quantity))
    }

    /// Sum of price times quantity over all lines, unrounded.
    #[must_use]
    pub fn total(&self) -> Price {
        self.items.iter().map(CartLineItem::line_total).sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    fn mocktail(catalog: &Catalog, id: &str) -> Mocktail {
        catalog.get(&ProductId::new(id)).unwrap().clone()
    }

    #[test]
    fn test_add_is_idempotent() {
        let catalog = Catalog::builtin();
        let sunset = mocktail(&catalog, "1");
        let mut cart = Cart::new();

        cart.add_item(&sunset);
        cart.add_item(&sunset);

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.quantity_of(&sunset.id), 1);
    }

    #[test]
    fn test_total_matches_scenario() {
        let catalog = Catalog::builtin();
        let sunset = mocktail(&catalog, "1");
        let mojito = mocktail(&catalog, "2");
        let mut cart = Cart::new();

        cart.add_item(&sunset);
        cart.set_quantity(&sunset.id, 2);
        cart.add_item(&mojito);

        assert_eq!(cart.total(), Price::from_cents(3697));
        assert_eq!(cart.total().to_string(), "$36.97");
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_set_quantity_zero_or_negative_removes() {
        let catalog = Catalog::builtin();
        let sunset = mocktail(&catalog, "1");
        let mojito = mocktail(&catalog, "2");
        let mut cart = Cart::new();
        cart.add_item(&sunset);
        cart.add_item(&mojito);

        cart.set_quantity(&sunset.id, 0);
        cart.set_quantity(&mojito.id, -3);

        assert!(cart.is_empty());
        assert_eq!(cart.total(), Price::ZERO);
    }

    #[test]
    fn test_set_quantity_unknown_is_noop() {
        let catalog = Catalog::builtin();
        let mut cart = Cart::new();
        cart.add_item(&mocktail(&catalog, "1"));
        let before = cart.clone();

        cart.set_quantity(&ProductId::new("42"), 5);

        assert_eq!(cart, before);
    }

    #[test]
    fn test_increment_and_decrement() {
        let catalog = Catalog::builtin();
        let mango = mocktail(&catalog, "7");
        let mut cart = Cart::new();

        cart.increment(&mango);
        cart.increment(&mango);
        assert_eq!(cart.quantity_of(&mango.id), 2);

        cart.decrement(&mango.id);
        cart.decrement(&mango.id);
        assert_eq!(cart.quantity_of(&mango.id), 0);
        assert!(cart.is_empty());

        cart.decrement(&mango.id);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove_and_clear() {
        let catalog = Catalog::builtin();
        let mut cart = Cart::new();
        for id in ["1", "2", "3"] {
            cart.add_item(&mocktail(&catalog, id));
        }

        cart.remove_item(&ProductId::new("2"));
        assert_eq!(cart.items().len(), 2);
        cart.remove_item(&ProductId::new("2"));
        assert_eq!(cart.items().len(), 2);

        cart.clear();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_no_duplicate_lines_under_mixed_operations() {
        let catalog = Catalog::builtin();
        let ids = ["1", "2", "1", "3", "2", "1"];
        let mut cart = Cart::new();

        for (step, id) in ids.iter().enumerate() {
            let item = mocktail(&catalog, id);
            cart.add_item(&item);
            cart.set_quantity(&item.id, i64::try_from(step).unwrap() % 3);
            cart.increment(&item);
        }

        let mut seen: Vec<&str> = cart.items().iter().map(|i| i.product_id.as_str()).collect();
        let total = seen.len();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), total);

        let expected: Price = cart
            .items()
            .iter()
            .map(|i| i.price.times(i.quantity))
            .sum();
        assert_eq!(cart.total(), expected);
    }

    #[test]
    fn test_roundtrips_through_json() {
        let catalog = Catalog::builtin();
        let mut cart = Cart::new();
        cart.add_item(&mocktail(&catalog, "5"));
        let json = serde_json::to_string(&cart).unwrap();
        assert!(json.contains("\"productId\":\"5\""));
        assert_eq!(serde_json::from_str::<Cart>(&json).unwrap(), cart);
    }
}
