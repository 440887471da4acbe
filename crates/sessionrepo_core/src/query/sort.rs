//! Sort descriptors.

use serde::{Deserialize, Serialize};

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    /// SQL keyword for this direction.
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// One `(property, direction)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub property: String,
    #[serde(default)]
    pub direction: Direction,
}

impl Order {
    pub fn new(property: impl Into<String>, direction: Direction) -> Self {
        Self {
            property: property.into(),
            direction,
        }
    }

    pub fn asc(property: impl Into<String>) -> Self {
        Self::new(property, Direction::Asc)
    }

    pub fn desc(property: impl Into<String>) -> Self {
        Self::new(property, Direction::Desc)
    }
}

/// Ordered sequence of sort orders; earlier orders take precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sort {
    orders: Vec<Order>,
}

impl Sort {
    pub fn unsorted() -> Self {
        Self::default()
    }

    pub fn by(orders: impl IntoIterator<Item = Order>) -> Self {
        Self {
            orders: orders.into_iter().collect(),
        }
    }

    pub fn asc(property: impl Into<String>) -> Self {
        Self::by([Order::asc(property)])
    }

    pub fn desc(property: impl Into<String>) -> Self {
        Self::by([Order::desc(property)])
    }

    /// Appends a lower-precedence ascending order.
    pub fn then_asc(mut self, property: impl Into<String>) -> Self {
        self.orders.push(Order::asc(property));
        self
    }

    /// Appends a lower-precedence descending order.
    pub fn then_desc(mut self, property: impl Into<String>) -> Self {
        self.orders.push(Order::desc(property));
        self
    }

    /// Appends every order of `other` after the orders of `self`.
    pub fn and(mut self, other: &Sort) -> Self {
        self.orders.extend(other.orders.iter().cloned());
        self
    }

    pub fn is_sorted(&self) -> bool {
        !self.orders.is_empty()
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }
}
