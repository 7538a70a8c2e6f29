//! HTTP protocol implementation.
//!
//! This module implements the wire side of a small HTTP/1.1 server. Every
//! connection carries exactly one request and one response.
//!
//! # Architecture
//!
//! - **`connection`**: The per-connection state machine and the [`connection::Service`] that routes requests
//! - **`parser`**: Parses incoming HTTP requests from byte buffers
//! - **`request`**: HTTP request representation
//! - **`response`**: HTTP response representation with builder pattern
//! - **`writer`**: Serializes and writes HTTP responses to the client
//! - **`mime`**: MIME type detection based on file extensions
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Wait for incoming request data
//!        └──────┬──────┘
//!               │ Request parsed          (parse error → 400 → Writing)
//!               ▼                         (read timeout → Closed)
//!        ┌──────────────────┐
//!        │   Processing     │ ← Route, static lookup, or 404/405/500
//!        └──────┬───────────┘
//!               │ Response ready
//!               ▼
//!        ┌──────────────────┐
//!        │    Writing       │ ← Send response to client
//!        └──────┬───────────┘
//!               │ Response sent
//!               ▼
//!        ┌──────────────────┐
//!        │     Closed       │
//!        └──────────────────┘
//! ```

pub mod connection;
pub mod mime;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
