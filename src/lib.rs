//! # Syncthing REST Client
//!
//! A typed async client for the Syncthing REST API with:
//! - Config, folders and devices endpoints
//! - Pluggable API-key authentication with rotatable credential stores
//! - A JSON pipeline with single-object-to-array coercion
//! - Response metadata (pagination links, OAuth scopes, ETag) parsing
//! - A typed error taxonomy driven by HTTP status codes
//! - An injectable transport with a mock implementation for tests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use syncthing_rest::{SyncthingClient, SyncthingConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SyncthingConfig::builder()
//!         .base_url("https://localhost:8384")
//!         .api_key("your-api-key")?
//!         .build()?;
//!
//!     let client = SyncthingClient::new(config)?;
//!
//!     for folder in client.folders().list().await? {
//!         println!("{}: {}", folder.id, folder.path);
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod config;
pub mod errors;
pub mod types;

// Authentication
pub mod auth;

// HTTP primitives and transport
pub mod http;

// Request dispatch
pub mod connection;

// JSON serialization pipeline
pub mod pipeline;

// Response metadata
pub mod api_info;

// API services
pub mod services;

// Top-level client
pub mod client;

// Mocks for testing
pub mod mocks;

// Re-exports for convenience
pub use api_info::ApiInfo;
pub use auth::{AuthenticationType, Authenticator, CredentialStore, Credentials, InMemoryCredentialStore};
pub use client::{SyncthingClient, SyncthingClientBuilder};
pub use config::{SyncthingConfig, SyncthingConfigBuilder};
pub use connection::{ApiResponse, Connection, RequestOptions};
pub use errors::{SyncthingError, SyncthingErrorKind, SyncthingResult};
pub use http::{Body, HttpTransport, Request, ReqwestTransport, Response};
pub use pipeline::JsonPipeline;
pub use types::*;
