//! Core types shared by the router, dispatcher and server.

pub mod error;
mod request;
mod response;
mod state;
pub mod status;

pub use error::HttpError;
pub use request::Request;
pub use response::Response;
pub use state::{is_shutdown, register_server, request_shutdown, setup_shutdown_handler};
