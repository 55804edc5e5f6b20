//! Utility modules shared by the router, dispatcher and server.

pub mod date;
pub mod exec;
pub mod html;
pub mod mime;
pub mod path;
