//! Anidex HTTP module providing the typed REST client
//!
//! The client here knows nothing about sessions: it builds requests, attaches
//! a bearer token when asked to, and maps HTTP failures onto [`ClientError`].
//! Token lifecycle lives in `anidex-session`.

pub mod client;
pub mod types;

pub use client::error::ClientError;
pub use client::request::{ApiRequest, FileUpload, RequestBody};
pub use client::{ApiClient, ApiClientBuilder};
