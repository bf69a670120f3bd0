//! Identity provisioning pipelines for Fabric organizations.
//!
//! This crate drives a [`CaClient`](enroller_ca::CaClient) through the
//! ordered register/enroll steps that build a credential root:
//!
//! - [`provision_org`]: enrollment CA admin, NodeOUs, peer MSP and TLS, org admin
//! - [`provision_orderer`]: the same for an ordering node, plus admin TLS
//! - [`provision_user`]: one more client or admin user in an existing org
//!
//! Each run returns a [`ProvisionReport`]; the first failing step aborts the
//! run with an error naming that step.

#![doc(html_root_url = "https://docs.rs/enroller-provision/0.3.0")]

pub mod fs;
pub mod nodeous;
mod orderer;
mod org;
mod pipeline;
mod stages;
pub mod tls;
mod user;

#[cfg(test)]
mod testing;

pub use orderer::{provision_orderer, OrdererConfig, DEFAULT_ORDERER, ORDERER_ADMIN};
pub use org::{provision_org, OrgConfig, DEFAULT_PEER};
pub use pipeline::{Pipeline, ProvisionKind, ProvisionReport, StepOutcome, StepRecord};
pub use stages::{ProvisionOptions, TLS_PROFILE};
pub use tls::{canonicalize, CanonicalBundle};
pub use user::{provision_user, UserConfig};
