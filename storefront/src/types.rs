//! Domain types shared by the cart, checkout and order stores.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::atomic::{AtomicU64, Ordering};

/// Round a money amount to cents, midpoint away from zero
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Identifier of a catalog product
///
/// The catalog sends numeric ids while other sources use strings, so both
/// deserialize. It always serializes as a string.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProductId(String);

impl ProductId {
    /// Creates a `ProductId`
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u64> for ProductId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for ProductId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for ProductId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ProductId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Unsigned(u64),
            Signed(i64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Unsigned(n) => Self(n.to_string()),
            RawId::Signed(n) => Self(n.to_string()),
            RawId::Text(s) => Self(s),
        })
    }
}

/// A product as received from the catalog
///
/// Extra catalog fields such as `description` or `category` are ignored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Catalog id
    pub id: ProductId,
    /// Display title
    pub title: String,
    /// Unit price
    pub price: Decimal,
    /// Image URL
    #[serde(default)]
    pub image: String,
}

impl Product {
    /// Creates a product
    #[must_use]
    pub fn new(id: impl Into<ProductId>, title: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            price,
            image: String::new(),
        }
    }

    /// Sets the image URL
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }
}

/// A product in the cart together with its quantity
///
/// Stored line items always have `quantity >= 1`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Product id, unique within a cart
    pub id: ProductId,
    /// Title at the time it was added
    pub title: String,
    /// Unit price at the time it was added
    pub price: Decimal,
    /// Image URL
    #[serde(default)]
    pub image: String,
    /// Number of units
    pub quantity: u32,
}

impl LineItem {
    /// A line item holding one unit of `product`
    #[must_use]
    pub fn from_product(product: Product) -> Self {
        Self {
            id: product.id,
            title: product.title,
            price: product.price,
            image: product.image,
            quantity: 1,
        }
    }

    /// `price × quantity`, unrounded
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// Identifier of a placed order
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Creates an `OrderId`
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Id derived from a timestamp: the Unix time in milliseconds
    #[must_use]
    pub fn from_timestamp(at: DateTime<Utc>) -> Self {
        Self(at.timestamp_millis().to_string())
    }

    /// Returns the id as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of an order
///
/// Moves forward only: `New → Paid → Delivered`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Placed, awaiting payment
    New,
    /// Paid, awaiting delivery
    Paid,
    /// Received by the customer
    Delivered,
}

impl OrderStatus {
    /// All statuses in lifecycle order
    pub const ALL: [Self; 3] = [Self::New, Self::Paid, Self::Delivered];

    /// The only legal successor, if any
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::New => Some(Self::Paid),
            Self::Paid => Some(Self::Delivered),
            Self::Delivered => None,
        }
    }

    /// Whether `self → to` is a legal transition
    #[must_use]
    pub fn can_transition_to(self, to: Self) -> bool {
        self.next() == Some(to)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::New => write!(f, "new"),
            Self::Paid => write!(f, "paid"),
            Self::Delivered => write!(f, "delivered"),
        }
    }
}

/// A placed order
///
/// `items` is an owned snapshot of the cart at checkout time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Unique id
    pub id: OrderId,
    /// Line items at checkout time
    pub items: Vec<LineItem>,
    /// Sum of item subtotals, rounded to cents
    pub total: Decimal,
    /// Current lifecycle status
    pub status: OrderStatus,
    /// When the order was placed
    #[serde(default)]
    pub placed_at: DateTime<Utc>,
}

impl Order {
    /// Creates a `New` order from a snapshot of line items
    #[must_use]
    pub fn new(id: OrderId, items: Vec<LineItem>, placed_at: DateTime<Utc>) -> Self {
        let total = round_money(items.iter().map(LineItem::subtotal).sum());
        Self {
            id,
            items,
            total,
            status: OrderStatus::New,
            placed_at,
        }
    }

    /// Lines sent to the order backend when this order is uploaded
    #[must_use]
    pub fn upload_lines(&self) -> Vec<UploadLine> {
        self.items
            .iter()
            .map(|item| UploadLine {
                id: item.id.clone(),
                price: item.price,
                count: item.quantity,
            })
            .collect()
    }
}

/// One line of an order upload: `{ "id", "price", "count" }`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadLine {
    /// Product id
    pub id: ProductId,
    /// Unit price
    pub price: Decimal,
    /// Quantity
    pub count: u32,
}

/// Signed-in user
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Display name, absent after a plain sign-in
    pub name: Option<String>,
    /// Email address
    pub email: String,
}

/// Correlation id tying a request action to its result action
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(u64);

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

impl RequestId {
    /// Allocates a process-unique request id
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the numeric value
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "req-{}", self.0)
    }
}
