//! Application layer of the movie catalog: backend service contracts and
//! their HTTP implementation, the catalog pager, session context, route
//! guards and the user-facing flows built on them.

pub mod auth_flow;
pub mod create;
pub mod error;
pub mod http;
pub mod notify;
pub mod pager;
pub mod routes;
pub mod services;
pub mod session;
pub mod watch;

pub use error::ClientError;
pub use http::HttpBackend;
pub use notify::Notifications;
pub use pager::{CatalogPager, LoadOutcome};
pub use routes::{Navigation, Route, resolve};
pub use session::{SessionContext, SessionSnapshot};
