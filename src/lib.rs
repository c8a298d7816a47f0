//! Terraform-style provider for the Terrareg module registry.
//!
//! This crate is a thin adapter translating declarative resource and
//! data-source definitions into REST calls against a Terrareg registry. It
//! is built from three layers:
//!
//! - **Terrareg client** ([`client`]): URL synthesis, standard headers,
//!   status-code classification, and the per-entity accessors for
//!   namespaces, modules and git providers, including the composite
//!   `namespace/name/provider` module identity.
//! - **Adapters** ([`provider`]): the [`TerraregProvider`] maps framework
//!   plan/state documents onto accessor calls for the `terrareg_namespace`
//!   and `terrareg_module` resources and the `terrareg_git_provider(s)` data
//!   sources.
//! - **Provider protocol plumbing** ([`server`], [`schema`], [`types`],
//!   [`validation`], [`generated`]): schema declaration, plan diffing,
//!   import, and the gRPC serve loop with the stdout handshake.
//!
//! # Quick Start
//!
//! ```ignore
//! use terraform_provider_terrareg::{init_logging, serve, TerraregProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging();
//!     serve(TerraregProvider::new()).await
//! }
//! ```
//!
//! # Handshake Protocol
//!
//! When the provider starts via [`serve`], it outputs a handshake string to
//! stdout:
//!
//! ```text
//! TERRAREG_PROVIDER|1|127.0.0.1:50051
//! ```
//!
//! Format: `TERRAREG_PROVIDER|<protocol_version>|<address>`. This allows the
//! orchestrator to spawn the provider as a subprocess and connect via gRPC.

#![warn(clippy::all)]

pub mod client;
pub mod error;
pub mod logging;
pub mod provider;
pub mod schema;
pub mod server;
pub mod testing;
pub mod types;
pub mod validation;

#[allow(missing_docs)]
#[allow(clippy::all)]
pub mod generated;

// Re-export main types at crate root
pub use client::{TerraregClient, TerraregError};
pub use error::ProviderError;
pub use logging::{init_logging, try_init_logging};
pub use provider::TerraregProvider;
pub use schema::ProviderSchema;
pub use server::{
    serve, serve_on, serve_on_with_options, serve_with_options, ProviderService, ServeOptions,
};
pub use types::{
    AttributeChange, ImportedResource, PlanResult, ProviderMetadata, ServerCapabilities,
    HANDSHAKE_PREFIX, PROTOCOL_VERSION,
};
pub use validation::{is_valid, validate, validate_result};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tonic;
pub use tracing;
