//! Orders built from a cart snapshot.
//!
//! Line items copy the product name and price at checkout time, so later
//! catalog edits never change historical orders. The product id is kept so
//! that delivering an order can consume stock.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cart::Cart;
use crate::catalog::Catalog;
use crate::types::{Email, OrderId, OrderStatus, PaymentMethod, Price, ProductId};

/// Document collection holding submitted orders.
pub const ORDERS_COLLECTION: &str = "orders";

/// Errors raised while building or looking up orders.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrderError {
    /// A cart line references a product missing from the catalog.
    #[error("product {0} is no longer available")]
    LineItemUnavailable(ProductId),

    /// Nothing to order.
    #[error("cart is empty")]
    EmptyCart,

    /// Customer or form input failed validation.
    #[error("{0}")]
    Validation(String),

    /// No order with this id.
    #[error("order not found: {0}")]
    NotFound(OrderId),
}

/// Denormalized copy of a product at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Price,
    pub quantity: u32,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl LineItem {
    /// `unit_price * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price.times(self.quantity)
    }
}

/// Contact details captured at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    pub email: Email,
    pub phone: String,
    pub address: String,
}

impl CustomerInfo {
    /// Validate raw form input.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Validation` naming the first invalid field.
    pub fn parse(name: &str, email: &str, phone: &str, address: &str) -> Result<Self, OrderError> {
        let required = |field: &str, value: &str| {
            let value = value.trim();
            if value.is_empty() {
                Err(OrderError::Validation(format!("{field} is required")))
            } else {
                Ok(value.to_owned())
            }
        };
        let name = required("name", name)?;
        let email = Email::parse(email)
            .map_err(|e| OrderError::Validation(format!("invalid email: {e}")))?;
        let phone = required("phone", phone)?;
        let address = required("address", address)?;
        Ok(Self {
            name,
            email,
            phone,
            address,
        })
    }
}

/// A submitted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub items: Vec<LineItem>,
    pub subtotal: Price,
    #[serde(default)]
    pub tax: Price,
    pub total: Price,
    pub status: OrderStatus,
    pub customer: CustomerInfo,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Checkout input that is not part of the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutDetails {
    pub customer: CustomerInfo,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    /// Tax as a percentage of the subtotal, if the shop charges one.
    pub tax_rate: Option<Decimal>,
}

impl Order {
    /// Build a pending order from a cart snapshot.
    ///
    /// Every line must resolve against `catalog`; otherwise no order is
    /// produced.
    ///
    /// # Errors
    ///
    /// Returns `EmptyCart` or `LineItemUnavailable`.
    pub fn from_cart(
        cart: &Cart,
        catalog: &Catalog,
        details: CheckoutDetails,
        now: DateTime<Utc>,
    ) -> Result<Self, OrderError> {
        if cart.is_empty() {
            return Err(OrderError::EmptyCart);
        }

        let items = cart
            .items()
            .iter()
            .map(|line| -> Result<LineItem, OrderError> {
                let product = catalog
                    .get(&line.product_id)
                    .ok_or_else(|| OrderError::LineItemUnavailable(line.product_id.clone()))?;
                Ok(LineItem {
                    product_id: product.id.clone(),
                    name: product.name.clone(),
                    unit_price: product.price,
                    quantity: line.quantity,
                    image_url: product.image_url.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let subtotal: Price = items.iter().map(LineItem::line_total).sum();
        let tax = details
            .tax_rate
            .map_or(Price::ZERO, |rate| subtotal.percent(rate));

        Ok(Self {
            id: OrderId::generate(),
            items,
            subtotal,
            tax,
            total: subtotal + tax,
            status: OrderStatus::Pending,
            customer: details.customer,
            payment_method: details.payment_method,
            notes: details
                .notes
                .map(|n| n.trim().to_owned())
                .filter(|n| !n.is_empty()),
            created_at: now,
            updated_at: now,
        })
    }

    /// Sum of line totals.
    #[must_use]
    pub fn items_total(&self) -> Price {
        self.items.iter().map(LineItem::line_total).sum()
    }

    /// Number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }

    /// UTC calendar date of creation.
    #[must_use]
    pub fn created_on(&self) -> NaiveDate {
        self.created_at.date_naive()
    }
}

/// Field to sort order listings by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSortField {
    #[default]
    Date,
    Total,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// Admin order listing parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderQuery {
    #[serde(default)]
    pub status: Option<OrderStatus>,
    /// Case-insensitive match on customer name, phone or order id.
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub sort: OrderSortField,
    #[serde(default)]
    pub direction: SortDirection,
}

impl OrderQuery {
    /// Whether `order` passes the status and search filters.
    #[must_use]
    pub fn matches(&self, order: &Order) -> bool {
        if self.status.is_some_and(|s| s != order.status) {
            return false;
        }
        match self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            None => true,
            Some(term) => {
                let term = term.to_lowercase();
                order.customer.name.to_lowercase().contains(&term)
                    || order.customer.phone.contains(&term)
                    || order.id.as_str().to_lowercase().contains(&term)
            }
        }
    }

    /// Filter and sort.
    #[must_use]
    pub fn apply(&self, orders: Vec<Order>) -> Vec<Order> {
        let mut orders: Vec<Order> = orders.into_iter().filter(|o| self.matches(o)).collect();
        orders.sort_by(|a, b| {
            let ordering = match self.sort {
                OrderSortField::Date => a.created_at.cmp(&b.created_at),
                OrderSortField::Total => a.total.cmp(&b.total),
            };
            match self.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });
        orders
    }
}

/// Orders created between `from` and `to` (inclusive, UTC calendar dates).
pub fn orders_between(
    orders: impl IntoIterator<Item = Order>,
    from: NaiveDate,
    to: NaiveDate,
) -> Vec<Order> {
    orders
        .into_iter()
        .filter(|o| {
            let day = o.created_on();
            day >= from && day <= to
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::catalog::NewProduct;

    fn customer() -> CustomerInfo {
        CustomerInfo::parse("Ana", "ana@example.com", "555-0101", "1 Main St").unwrap()
    }

    fn details() -> CheckoutDetails {
        CheckoutDetails {
            customer: customer(),
            payment_method: PaymentMethod::Cash,
            notes: Some("  ".to_string()),
            tax_rate: None,
        }
    }

    fn setup() -> (Catalog, Cart) {
        let mut catalog = Catalog::new();
        catalog.add_category("General").unwrap();
        let mut cart = Cart::new();
        for (name, cents, qty) in [("A", 1000, 2), ("B", 500, 1)] {
            let product = catalog
                .add_product(NewProduct {
                    name: name.to_string(),
                    description: String::new(),
                    price: Price::from_cents(cents),
                    category: "General".to_string(),
                    stock: 5,
                    image_url: None,
                })
                .unwrap();
            cart.add(product.id, qty);
        }
        (catalog, cart)
    }

    #[test]
    fn test_from_cart_scenario() {
        let (catalog, cart) = setup();
        let order = Order::from_cart(&cart, &catalog, details(), Utc::now()).unwrap();
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.total, Price::from_cents(2500));
        assert_eq!(order.total.to_string(), "$25.00");
        assert_eq!(order.total, order.items_total());
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.notes, None);
    }

    #[test]
    fn test_from_cart_snapshot_is_denormalized() {
        let (mut catalog, cart) = setup();
        let order = Order::from_cart(&cart, &catalog, details(), Utc::now()).unwrap();
        let first = order.items.first().unwrap().product_id.clone();
        catalog
            .update_product(
                &first,
                &crate::catalog::ProductPatch {
                    name: Some("Renamed".to_string()),
                    price: Some(Price::from_cents(1)),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(order.items.first().unwrap().name, "A");
        assert_eq!(order.items.first().unwrap().unit_price, Price::from_cents(1000));
    }

    #[test]
    fn test_from_cart_unavailable_line() {
        let (mut catalog, cart) = setup();
        let gone = cart.items().last().unwrap().product_id.clone();
        catalog.delete_product(&gone);
        let err = Order::from_cart(&cart, &catalog, details(), Utc::now()).unwrap_err();
        assert_eq!(err, OrderError::LineItemUnavailable(gone));
    }

    #[test]
    fn test_from_cart_empty() {
        let (catalog, _) = setup();
        assert_eq!(
            Order::from_cart(&Cart::new(), &catalog, details(), Utc::now()).unwrap_err(),
            OrderError::EmptyCart
        );
    }

    #[test]
    fn test_tax_is_added_on_top() {
        let (catalog, cart) = setup();
        let mut details = details();
        details.tax_rate = Some(Decimal::from(19));
        let order = Order::from_cart(&cart, &catalog, details, Utc::now()).unwrap();
        assert_eq!(order.subtotal, order.items_total());
        assert_eq!(order.tax, Price::from_cents(475));
        assert_eq!(order.total, Price::from_cents(2975));
    }

    #[test]
    fn test_customer_validation() {
        assert!(matches!(
            CustomerInfo::parse(" ", "a@b.c", "1", "x"),
            Err(OrderError::Validation(msg)) if msg == "name is required"
        ));
        assert!(matches!(
            CustomerInfo::parse("Ana", "nope", "1", "x"),
            Err(OrderError::Validation(_))
        ));
        assert!(matches!(
            CustomerInfo::parse("Ana", "a@b.c", "1", ""),
            Err(OrderError::Validation(msg)) if msg == "address is required"
        ));
    }

    fn order_at(day: u32, cents: u64, name: &str, status: OrderStatus) -> Order {
        let (catalog, cart) = setup();
        let mut details = details();
        details.customer.name = name.to_string();
        let created = Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap();
        let mut order = Order::from_cart(&cart, &catalog, details, created).unwrap();
        order.total = Price::from_cents(cents);
        order.status = status;
        order
    }

    #[test]
    fn test_query_filters_and_sorts() {
        let orders = vec![
            order_at(1, 3000, "Ana", OrderStatus::Pending),
            order_at(2, 1000, "Bruno", OrderStatus::Delivered),
            order_at(3, 2000, "Ana Maria", OrderStatus::Pending),
        ];

        let query = OrderQuery {
            search: Some("ana".to_string()),
            ..OrderQuery::default()
        };
        let names: Vec<_> = query
            .apply(orders.clone())
            .into_iter()
            .map(|o| o.customer.name)
            .collect();
        assert_eq!(names, vec!["Ana Maria", "Ana"]);

        let query = OrderQuery {
            sort: OrderSortField::Total,
            direction: SortDirection::Asc,
            ..OrderQuery::default()
        };
        let totals: Vec<_> = query.apply(orders.clone()).into_iter().map(|o| o.total).collect();
        assert_eq!(
            totals,
            vec![
                Price::from_cents(1000),
                Price::from_cents(2000),
                Price::from_cents(3000)
            ]
        );

        let query = OrderQuery {
            status: Some(OrderStatus::Delivered),
            ..OrderQuery::default()
        };
        assert_eq!(query.apply(orders).len(), 1);
    }

    #[test]
    fn test_orders_between_is_inclusive() {
        let orders = vec![
            order_at(1, 100, "a", OrderStatus::Pending),
            order_at(2, 100, "b", OrderStatus::Pending),
            order_at(3, 100, "c", OrderStatus::Pending),
        ];
        let from = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 3, 3).unwrap();
        let names: Vec<_> = orders_between(orders, from, to)
            .into_iter()
            .map(|o| o.customer.name)
            .collect();
        assert_eq!(names, vec!["b", "c"]);
    }
}
