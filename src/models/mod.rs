//! Domain models and request/response types

pub mod author;
pub mod book;
pub mod enums;
pub mod loan;
pub mod reservation;
pub mod user;
