//! Invoice status.

use serde::{Deserialize, Serialize};

/// Payment status of an invoice.
///
/// Stored in the remote database as the lowercase strings `pending` and
/// `paid`. No other value is ever written: form input is parsed through
/// [`InvoiceStatus::from_str`](std::str::FromStr) before it reaches storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    #[default]
    Pending,
    Paid,
}

impl InvoiceStatus {
    /// All statuses, in the order forms present them.
    pub const ALL: [Self; 2] = [Self::Pending, Self::Paid];

    /// The stored representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
        }
    }

    /// Human-readable label for badges and radio buttons.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Paid => "Paid",
        }
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InvoiceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            _ => Err(format!("invalid invoice status: {s}")),
        }
    }
}
