//! Fabric CA enrollment and TLS provisioning for peer and orderer organizations.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use fabric_enroller::{CaEndpoint, FabricCaClient, OrgConfig, provision_org};
//!
//! #[tokio::main]
//! async fn main() -> fabric_enroller::Result<()> {
//!     let root = std::path::Path::new("/srv/fabric-network");
//!     let ca = CaEndpoint::new("ca-org1", 7054, fabric_enroller::default_ca_tls_cert(root, "org1", false));
//!     let tlsca = CaEndpoint::new("tlsca-org1", 7055, fabric_enroller::default_ca_tls_cert(root, "org1", true));
//!
//!     let client = FabricCaClient::new();
//!     let report = provision_org(&OrgConfig::new(root, "org1", "example.com", ca, tlsca), &client).await?;
//!
//!     for file in &report.tls_files {
//!         println!("{} ({} bytes)", file.name, file.size);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `default` - Enables `provision`
//! - `provision` - Org, orderer and user pipelines

#![doc(html_root_url = "https://docs.rs/fabric-enroller/0.3.0")]

// Re-export core types
pub use enroller_core::*;

// Re-export the CA adapter
pub use enroller_ca::{
    CaClient, ClientConfig, EnrollRequest, FabricCaClient, FabricCaClientBuilder, RegisterOutcome,
    RegisterRequest, RegistrationLedger,
};

// Re-export pipelines if enabled
#[cfg(feature = "provision")]
pub use enroller_provision::{
    provision_orderer, provision_org, provision_user, OrdererConfig, OrgConfig, ProvisionKind,
    ProvisionOptions, ProvisionReport, StepOutcome, StepRecord, UserConfig,
};

#[cfg(feature = "provision")]
pub use enroller_provision as provision;

// Re-export runtime for convenience
pub use serde;
pub use serde_json;
pub use tokio;
