//! Status enums for orders and users.

use serde::{Deserialize, Serialize};

/// Order lifecycle status.
///
/// ```text
/// pending -> confirmed -> shipped -> delivered
///    \___________\___________\
///                              -> cancelled
/// ```
///
/// `delivered` and `cancelled` are terminal; an order never leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Every status, in display order.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Confirmed,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// The fulfillment progression shown as steps on the order page.
    pub const PROGRESSION: [Self; 4] = [
        Self::Pending,
        Self::Confirmed,
        Self::Shipped,
        Self::Delivered,
    ];

    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Confirmed => "Confirmed",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Whether the order can no longer change.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Position in [`Self::PROGRESSION`], `None` for cancelled orders.
    #[must_use]
    pub fn step_index(&self) -> Option<usize> {
        Self::PROGRESSION.iter().position(|s| s == self)
    }

    /// The next fulfillment step, if any.
    #[must_use]
    pub fn next(&self) -> Option<Self> {
        let idx = self.step_index()?;
        Self::PROGRESSION.get(idx + 1).copied()
    }

    /// Whether an order in this status may be moved to `target`.
    ///
    /// Non-terminal orders may advance to any later fulfillment step or be
    /// cancelled. Terminal orders accept nothing.
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        if self.is_terminal() || *self == target {
            return false;
        }
        if target == Self::Cancelled {
            return true;
        }
        match (self.step_index(), target.step_index()) {
            (Some(from), Some(to)) => to > from,
            _ => false,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("invalid order status: {s}"))
    }
}

/// Marketplace user role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// Regular shopper.
    #[default]
    Buyer,
    /// Can list and manage products.
    Seller,
    /// Can moderate orders, products and categories.
    Admin,
    /// Combined admin and seller privileges.
    AdminSeller,
    /// Any role this storefront does not know about; treated as a buyer.
    #[serde(other)]
    Unknown,
}

impl Role {
    /// Whether the role grants access to the admin dashboard.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin | Self::AdminSeller)
    }

    /// Whether the role may sell products.
    #[must_use]
    pub const fn is_seller(&self) -> bool {
        matches!(self, Self::Seller | Self::AdminSeller)
    }

    /// Wire name of the role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Buyer | Self::Unknown => "buyer",
            Self::Seller => "seller",
            Self::Admin => "admin",
            Self::AdminSeller => "admin-seller",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
