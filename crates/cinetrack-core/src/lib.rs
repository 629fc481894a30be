//! # CineTrack Core
//!
//! The domain layer of the CineTrack client.
//! This crate contains sessions, users, tracked titles and the ports the
//! infrastructure layer implements. It performs no I/O.

pub mod domain;
pub mod error;
pub mod ports;

pub use error::{ApiError, ErrorKind};
