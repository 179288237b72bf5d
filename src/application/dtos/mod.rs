use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{Contact, ContactFields, DomainError, ExtraData};

/// Smallest page a caller may request.
pub const MIN_PAGE_LIMIT: usize = 10;
/// Largest page for plain listings.
pub const MAX_LIST_LIMIT: usize = 500;
/// Largest page for the birthday query.
pub const MAX_BIRTHDAY_LIMIT: usize = 200;

/// Payload accepted when creating or replacing a contact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub birthday: NaiveDate,
    #[serde(default)]
    pub extra_data: ExtraData,
}

impl ContactRequest {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.first_name.trim().is_empty() {
            return Err(DomainError::validation("first_name is required"));
        }
        if self.last_name.trim().is_empty() {
            return Err(DomainError::validation("last_name is required"));
        }
        Ok(())
    }
}

impl From<ContactRequest> for ContactFields {
    fn from(value: ContactRequest) -> Self {
        Self {
            first_name: value.first_name,
            last_name: value.last_name,
            email: value.email,
            phone_number: value.phone_number,
            birthday: value.birthday,
            extra_data: value.extra_data,
        }
    }
}

/// Offset/limit window requested by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl PageQuery {
    pub fn new(limit: usize, offset: usize) -> Self {
        Self { limit, offset }
    }

    /// Checks `limit` against `[MIN_PAGE_LIMIT, max]`.
    pub fn validate(&self, max: usize) -> Result<(), DomainError> {
        if self.limit < MIN_PAGE_LIMIT {
            return Err(DomainError::validation(format!(
                "limit must be at least {MIN_PAGE_LIMIT}"
            )));
        }
        if self.limit > max {
            return Err(DomainError::limit(format!("limit cannot exceed {max}")));
        }
        Ok(())
    }
}

/// Optional substring filters for contact search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Response envelope for listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactListResponse {
    pub items: Vec<Contact>,
}

impl From<Vec<Contact>> for ContactListResponse {
    fn from(items: Vec<Contact>) -> Self {
        Self { items }
    }
}

/// Health/readiness report for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatusResponse {
    pub ok: bool,
    pub message: String,
    pub details: Option<String>,
}

const fn default_limit() -> usize {
    MIN_PAGE_LIMIT
}
