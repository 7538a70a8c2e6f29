//! Sentinel - minimal HTTP/1.1 server
//!
//! Parses requests straight off the socket, dispatches them to exact-match
//! routes or to files under a sandboxed static root, and closes the
//! connection after one response.

pub mod config;
pub mod files;
pub mod http;
pub mod router;
pub mod server;

pub use config::Config;
pub use http::request::{Method, Request};
pub use http::response::{Response, StatusCode};
pub use router::Router;
pub use server::{Server, ServerHandle};
