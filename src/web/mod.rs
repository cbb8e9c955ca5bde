//! HTTP surface over the story feed.

pub mod best;
pub mod middleware;
pub mod routes;
pub mod status;

pub use routes::*;
