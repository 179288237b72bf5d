use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

mod birthday;

pub use birthday::{days_until_birthday, next_birthday};

/// Free-form key/value data attached to a contact.
pub type ExtraData = BTreeMap<String, String>;

/// Store-assigned contact identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactId(pub u64);

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque key identifying the user a contact belongs to.
///
/// Every store call takes one explicitly; there is no ambient "current user".
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OwnerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// The mutable part of a contact. Updates replace all of it at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactFields {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub birthday: NaiveDate,
    #[serde(default)]
    pub extra_data: ExtraData,
}

/// One address-book entry owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub owner: OwnerId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub birthday: NaiveDate,
    #[serde(default)]
    pub extra_data: ExtraData,
}

impl Contact {
    pub fn from_fields(id: ContactId, owner: OwnerId, fields: ContactFields) -> Self {
        Self {
            id,
            owner,
            first_name: fields.first_name,
            last_name: fields.last_name,
            email: fields.email,
            phone_number: fields.phone_number,
            birthday: fields.birthday,
            extra_data: fields.extra_data,
        }
    }

    /// Replaces every mutable field. `id` and `owner` never change.
    pub fn overwrite(&mut self, fields: ContactFields) {
        self.first_name = fields.first_name;
        self.last_name = fields.last_name;
        self.email = fields.email;
        self.phone_number = fields.phone_number;
        self.birthday = fields.birthday;
        self.extra_data = fields.extra_data;
    }

    pub fn fields(&self) -> ContactFields {
        ContactFields {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            phone_number: self.phone_number.clone(),
            birthday: self.birthday,
            extra_data: self.extra_data.clone(),
        }
    }

    pub fn text(&self, field: ContactField) -> &str {
        match field {
            ContactField::FirstName => &self.first_name,
            ContactField::LastName => &self.last_name,
            ContactField::Email => &self.email,
        }
    }

    /// True when every predicate matches. An empty slice matches everything.
    pub fn matches_all(&self, predicates: &[FieldMatch]) -> bool {
        predicates.iter().all(|predicate| predicate.matches(self))
    }
}

/// Text fields that support substring search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactField {
    FirstName,
    LastName,
    Email,
}

/// Case-insensitive substring predicate on one text field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMatch {
    pub field: ContactField,
    needle: String,
}

impl FieldMatch {
    pub fn new(field: ContactField, needle: &str) -> Self {
        Self {
            field,
            needle: needle.to_lowercase(),
        }
    }

    pub fn matches(&self, contact: &Contact) -> bool {
        contact.text(self.field).to_lowercase().contains(&self.needle)
    }
}
