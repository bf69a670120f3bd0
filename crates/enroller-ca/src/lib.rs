//! Subprocess adapter for the Fabric CA client.
//!
//! This crate provides the [`CaClient`] trait the orchestrators drive, and
//! [`FabricCaClient`], its implementation over `fabric-ca-client`.

#![doc(html_root_url = "https://docs.rs/enroller-ca/0.3.0")]

mod adapter;
mod client;
mod command;
mod config;
mod ledger;

pub use adapter::{CaClient, EnrollRequest, RegisterOutcome, RegisterRequest};
pub use client::{FabricCaClient, FabricCaClientBuilder};
pub use command::CLIENT_HOME_ENV;
pub use config::*;
pub use ledger::{RegistrationLedger, LEDGER_FILE};
pub use enroller_core::{EnrollError, Result};
