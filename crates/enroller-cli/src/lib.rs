//! # enroller-cli
//!
//! Command-line interface for provisioning Fabric CA identities and TLS material.
//!
//! ## Commands
//!
//! - **enroll-org / enroll-orderer**: full credential root bootstrap
//! - **register / enroll**: single CA operations
//! - **enroll-user**: add a client or admin user to an existing org
//! - **config**: persistent defaults (CA client binary, timeout, output format)

pub mod cli;
pub mod config;
pub mod output;

pub use cli::run;
