//! Cart Aggregate

use uuid::Uuid;

use crate::domain::value_objects::Money;

/// A user's cart, rebuilt from persisted rows on every request.
#[derive(Clone, Debug)]
pub struct Cart {
    user_id: Uuid,
    items: Vec<CartItem>,
    currency: String,
}

#[derive(Clone, Debug)]
pub struct CartItem {
    pub product_id: Uuid,
    pub name: String,
    pub image_url: Option<String>,
    pub quantity: u32,
    pub unit_price: Money,
}

impl CartItem {
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

impl Cart {
    pub fn new(user_id: Uuid, currency: &str) -> Self {
        Self { user_id, items: vec![], currency: currency.to_string() }
    }

    pub fn from_items(user_id: Uuid, items: Vec<CartItem>, currency: &str) -> Self {
        Self { user_id, items, currency: currency.to_string() }
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }
    pub fn currency(&self) -> &str {
        &self.currency
    }
    pub fn item_count(&self) -> usize {
        self.items.len()
    }
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Merges on product_id: an existing line gains the incoming quantity,
    /// otherwise a new line is appended.
    pub fn add_item(&mut self, item: CartItem) {
        if let Some(existing) = self.items.iter_mut().find(|i| i.product_id == item.product_id) {
            existing.quantity += item.quantity;
        } else {
            self.items.push(item);
        }
    }

    /// Drops the whole line. Removing an absent product is a no-op.
    pub fn remove_item(&mut self, product_id: Uuid) {
        self.items.retain(|i| i.product_id != product_id);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Recomputed on every call so price snapshots are never served stale.
    pub fn total(&self) -> Money {
        self.items
            .iter()
            .fold(Money::zero(&self.currency), |acc, i| acc.add(&i.line_total()).unwrap_or(acc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn item(product_id: Uuid, quantity: u32, pesos: i64) -> CartItem {
        CartItem {
            product_id,
            name: "Sombrero".into(),
            image_url: None,
            quantity,
            unit_price: Money::mxn(Decimal::new(pesos, 0)),
        }
    }

    #[test]
    fn distinct_products_stay_separate_lines() {
        let mut cart = Cart::new(Uuid::new_v4(), "MXN");
        let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        for id in &ids {
            cart.add_item(item(*id, 1, 100));
        }
        assert_eq!(cart.item_count(), 4);
        assert!(cart.items().iter().all(|i| i.quantity == 1));
    }

    #[test]
    fn same_product_merges_by_quantity() {
        let mut cart = Cart::new(Uuid::new_v4(), "MXN");
        let id = Uuid::new_v4();
        cart.add_item(item(id, 1, 250));
        cart.add_item(item(id, 1, 250));
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.items()[0].quantity, 2);
        assert_eq!(cart.total().amount(), Decimal::new(500, 0));
    }

    #[test]
    fn remove_absent_product_is_noop() {
        let mut cart = Cart::new(Uuid::new_v4(), "MXN");
        cart.add_item(item(Uuid::new_v4(), 1, 100));
        cart.remove_item(Uuid::new_v4());
        assert_eq!(cart.item_count(), 1);
    }

    #[test]
    fn remove_drops_entire_line() {
        let mut cart = Cart::new(Uuid::new_v4(), "MXN");
        let id = Uuid::new_v4();
        cart.add_item(item(id, 3, 100));
        cart.remove_item(id);
        assert!(cart.is_empty());
        assert_eq!(cart.total().amount(), Decimal::ZERO);
    }

    #[test]
    fn total_is_sum_of_line_totals() {
        let mut cart = Cart::new(Uuid::new_v4(), "MXN");
        cart.add_item(item(Uuid::new_v4(), 2, 150)); // 300
        cart.add_item(item(Uuid::new_v4(), 1, 99)); // 99
        assert_eq!(cart.total().amount(), Decimal::new(399, 0));
    }

    #[test]
    fn clear_empties_the_cart() {
        let mut cart = Cart::new(Uuid::new_v4(), "MXN");
        cart.add_item(item(Uuid::new_v4(), 2, 150));
        cart.clear();
        assert!(cart.is_empty());
    }
}
