//! Provisioning types.

mod endpoint;
mod identity;
mod layout;
mod step;
mod tls;

pub use endpoint::*;
pub use identity::*;
pub use layout::*;
pub use step::*;
pub use tls::*;
