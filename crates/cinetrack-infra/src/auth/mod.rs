//! Token decoding implementations.

mod jwt;

pub use jwt::JwtTokenDecoder;
