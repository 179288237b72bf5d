//! Application layer wiring DTOs and services for the contact book.

pub mod dtos;
pub mod services;

pub use dtos::{
    ContactListResponse, ContactRequest, HealthStatusResponse, PageQuery, SearchQuery,
    MAX_BIRTHDAY_LIMIT, MAX_LIST_LIMIT,
};
pub use services::{BirthdayScan, Clock, ContactService, ContactStore, SearchMode, ServiceConfig};
