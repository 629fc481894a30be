//! Domain entities - the objects the client tracks and reasons about.

mod movie;
mod operation;
mod session;
mod user;

pub use movie::{
    MediaType, Movie, MovieQuery, MovieUpdate, NewMovie, Page, StatsBucket, StatsQuery,
    TimeBucket, ViewingStats, WatchStatus,
};
pub use operation::{OperationType, PendingOperation};
pub use session::{AuthEvent, AuthGrant, AuthState, RefreshedTokens, Session, TokenGrant};
pub use user::{User, UserAttributes};
