//! Named pipeline steps and how their failures are treated.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a step's failure stops the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepPolicy {
    /// Failure aborts the run
    Fatal,
    /// Failure is logged and recorded, and the run continues
    Advisory,
}

/// One step of a provisioning run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Check declared identities and CA cert paths
    ValidateConfig,
    /// Chown the organizations tree to the current user
    FixOwnership,
    /// Remove the credential root for a full rebuild
    CleanRoot,
    /// Create the credential root and TLS CA client home
    PrepareRoot,
    /// Enroll the enrollment CA bootstrap admin
    EnrollCaAdmin,
    /// Write the NodeOUs `config.yaml`
    WriteNodeOus,
    /// Register one identity on the enrollment CA
    RegisterOnCa { identity: String },
    /// Enroll a peer or orderer signing MSP
    EnrollNodeMsp { node: String },
    /// Enroll the TLS CA bootstrap admin
    EnrollTlsCaAdmin,
    /// Register one identity on the TLS CA
    RegisterOnTlsCa { identity: String },
    /// Enroll a peer or orderer TLS bundle and canonicalize it
    EnrollNodeTls { node: String },
    /// Copy the TLS root into the organization MSP
    PublishTlsCaCert,
    /// Enroll an administrator signing MSP
    EnrollAdminMsp { admin: String },
    /// Enroll an administrator TLS client bundle
    EnrollAdminTls { admin: String },
    /// Enroll a client or admin user MSP
    EnrollUserMsp { user: String },
    /// List the final TLS directory
    ReportTls,
}

impl Step {
    /// How a failure of this step is handled
    #[must_use]
    pub const fn policy(&self) -> StepPolicy {
        match self {
            Self::FixOwnership => StepPolicy::Advisory,
            _ => StepPolicy::Fatal,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidateConfig => write!(f, "validate configuration"),
            Self::FixOwnership => write!(f, "fix ownership"),
            Self::CleanRoot => write!(f, "clean credential root"),
            Self::PrepareRoot => write!(f, "prepare credential root"),
            Self::EnrollCaAdmin => write!(f, "enroll CA admin"),
            Self::WriteNodeOus => write!(f, "write NodeOUs config.yaml"),
            Self::RegisterOnCa { identity } => write!(f, "register on CA ({identity})"),
            Self::EnrollNodeMsp { node } => write!(f, "enroll {node} MSP"),
            Self::EnrollTlsCaAdmin => write!(f, "enroll TLSCA admin"),
            Self::RegisterOnTlsCa { identity } => write!(f, "register on TLSCA ({identity})"),
            Self::EnrollNodeTls { node } => write!(f, "enroll {node} TLS"),
            Self::PublishTlsCaCert => write!(f, "publish TLS CA cert"),
            Self::EnrollAdminMsp { admin } => write!(f, "enroll {admin} MSP"),
            Self::EnrollAdminTls { admin } => write!(f, "enroll {admin} TLS"),
            Self::EnrollUserMsp { user } => write!(f, "enroll {user} MSP"),
            Self::ReportTls => write!(f, "report TLS directory"),
        }
    }
}
