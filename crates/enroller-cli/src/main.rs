//! fabric-enroller - Fabric CA enrollment helper
//!
//! Provisions MSP and TLS material for peer and orderer organizations.

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    enroller_cli::run().await
}
