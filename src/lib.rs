//! Lantern - static HTTP/1.0 file server
//!
//! Core library for request handling and serving a document root.

pub mod config;
pub mod http;
pub mod server;
pub mod storage;
