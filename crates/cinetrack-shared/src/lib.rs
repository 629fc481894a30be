//! # CineTrack Shared
//!
//! JSON wire types exchanged with the CineTrack backend.

pub mod dto;
pub mod response;

pub use response::ErrorBody;
