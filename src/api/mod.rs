//! HTTP API for the quorum-counter node

mod rest;

pub use rest::router;
