pub mod auth;
pub mod blobs;
pub mod error;
pub mod rate_limit;
pub mod routes;
pub mod state;
