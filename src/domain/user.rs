use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ValidationError, WalletSummary, validation};

pub type UserId = Uuid;

/// Account holder. Tax id and email are unique across the system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// National tax id, 11 digits
    pub tax_id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: &str, tax_id: &str, email: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            id: Uuid::new_v4(),
            name: validation::name(name)?,
            tax_id: validation::tax_id(tax_id)?,
            email: validation::email(email)?,
            created_at: super::now(),
        })
    }
}

/// Partial update of a user. Fields left as `None` keep their stored value;
/// the tax id is immutable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl UserUpdate {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Validate and normalise the supplied fields.
    pub fn validated(self) -> Result<Self, ValidationError> {
        Ok(Self {
            name: self.name.as_deref().map(validation::name).transpose()?,
            email: self.email.as_deref().map(validation::email).transpose()?,
        })
    }
}

/// A user together with summaries of the wallets it owns.
#[derive(Debug, Clone, Serialize)]
pub struct UserDetails {
    #[serde(flatten)]
    pub user: User,
    pub wallets: Vec<WalletSummary>,
}
