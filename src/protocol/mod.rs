//! Wire types and the request dispatcher for the five RPC operations.

pub mod dispatcher;
pub mod types;

pub use dispatcher::RequestDispatcher;
pub use types::{Reply, Request, ResponseCode};
