//! HTTP/1.0 protocol implementation.
//!
//! Every connection carries exactly one request and one response, then
//! closes. There is no keep-alive and no request body handling.
//!
//! # Architecture
//!
//! - **`connection`**: per-connection state machine driving one exchange
//! - **`parser`**: parses the buffered request head
//! - **`request`**: request representation
//! - **`resolver`**: maps request paths into the document root
//! - **`response`**: status codes and responses with builder pattern
//! - **`writer`**: serializes and writes responses to the client
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │  Receiving  │ ← Buffer bytes until "\r\n\r\n"
//!        └──────┬──────┘
//!               │ Head parsed          (400 / 408 / 431 skip to Responding)
//!               ▼
//!        ┌──────────────────┐
//!        │     Parsed       │ ← Resolve path, check file (200 / 403 / 404)
//!        └──────┬───────────┘
//!               │ Response ready
//!               ▼
//!        ┌──────────────────┐
//!        │   Responding     │ ← Write response, shut the socket down
//!        └──────┬───────────┘
//!               ▼
//!            Closed
//! ```
//!
//! # Example
//!
//! ```ignore
//! use lantern::config::Config;
//! use lantern::server::Server;
//! use lantern::storage::LocalFs;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cfg = Config::load()?;
//!     Server::bind(&cfg, LocalFs).await?.run().await
//! }
//! ```

pub mod request;
pub mod response;
pub mod parser;
pub mod resolver;
pub mod connection;
pub mod writer;
