//! Domain layer: contact entities, owner identity and birthday arithmetic.

pub mod errors;
pub mod models;

pub use errors::DomainError;
pub use models::{
    days_until_birthday, next_birthday, Contact, ContactField, ContactFields, ContactId,
    ExtraData, FieldMatch, OwnerId,
};
