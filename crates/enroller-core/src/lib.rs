//! Core types and errors for Fabric CA identity provisioning.
//!
//! This crate provides the foundational types shared by the enroller crates:
//!
//! - **Types**: CA endpoints, identity declarations, on-disk credential layouts
//! - **Errors**: The provisioning error taxonomy in [`EnrollError`]
//!
//! # Example
//!
//! ```rust,ignore
//! use enroller_core::{IdentitySet, IdentitySpec, Result};
//!
//! fn peer_secret(ids: &IdentitySet) -> Result<&str> {
//!     Ok(ids.require("peer0", "peer0:<secret>:peer")?.secret.as_str())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/enroller-core/0.3.0")]

mod error;
pub mod types;

pub use error::{EnrollError, ErrorKind, Result};
pub use types::*;
