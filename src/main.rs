//! Provider binary entry point.
//!
//! The orchestrator spawns this binary, reads the handshake line from stdout
//! and drives the provider over gRPC. Logs go to stderr.

use terraform_provider_terrareg::{init_logging, serve, TerraregProvider};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "starting terrareg provider"
    );

    serve(TerraregProvider::new()).await
}
