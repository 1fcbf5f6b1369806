//! HTTP request handlers.

pub mod health;
pub mod me;
pub mod route_handler;

pub use health::health_check;
pub use me::get_me;
pub use route_handler::{
    route_by_path, route_by_query, ActionInvocation, ActionRegistry, RouteQuery, RouteState,
};
