pub(crate) mod api;
pub mod auth;
pub mod config;
pub mod directive;
pub mod error;
pub mod observability;
pub mod routing;
pub mod state;
pub mod stream;
pub mod transport;

mod util;
