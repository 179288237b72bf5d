//! Service layer orchestrating domain operations and infrastructure adapters.

mod contact_service;

pub use contact_service::{
    BirthdayScan, Clock, ContactService, ContactStore, SearchMode, ServiceConfig,
};
