//! Command-line argument definitions using clap.

use clap::{ArgAction, Args, Parser, Subcommand};
use fabric_enroller::{IdentitySpec, IdentityType, MaterialSelection};
use std::path::PathBuf;

use crate::output::OutputFormat;

/// Fabric CA enrollment helper
///
/// Bootstraps MSP and TLS material for peer and orderer organizations by
/// driving `fabric-ca-client` against an enrollment CA and a TLS CA.
#[derive(Parser, Debug)]
#[command(name = "fabric-enroller")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(short, long, global = true, value_enum)]
    pub output: Option<OutputFormat>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Log filter, e.g. `warn` or `enroller_ca=debug`
    #[arg(long, global = true, env = "FABRIC_ENROLLER_LOG")]
    pub log_level: Option<String>,

    /// Path to the fabric-ca-client binary
    #[arg(long, global = true, env = "FABRIC_CA_CLIENT_BIN")]
    pub ca_client_bin: Option<PathBuf>,

    /// Timeout for each fabric-ca-client invocation, in seconds
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_secs: Option<u64>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Full org bootstrap: CA admin, identities, peer MSP and TLS, org admin MSP
    EnrollOrg(EnrollOrgArgs),

    /// Full orderer bootstrap: CA admin, identities, orderer MSP and TLS, admin MSP and TLS
    EnrollOrderer(EnrollOrdererArgs),

    /// Register one identity (idempotent)
    Register(RegisterArgs),

    /// Enroll one identity into an MSP or TLS directory
    Enroll(EnrollArgs),

    /// Register and enroll a client or admin user of an existing org
    EnrollUser(EnrollUserArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),
}

// ============================================================================
// Shared arguments
// ============================================================================

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Project directory containing organizations/ (default: current directory)
    #[arg(long)]
    pub root_dir: Option<PathBuf>,

    /// Remove the existing credential root before enrolling
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub clean: bool,

    /// Chown organizations/ to the current user first (best effort)
    #[arg(long)]
    pub fix_perms: bool,

    /// What to do when a CA output directory holds several files
    #[arg(long, value_name = "first-lexical|require-unique")]
    pub material_selection: Option<MaterialSelection>,
}

#[derive(Args, Debug)]
pub struct CaPairArgs {
    /// Enrollment CA port, e.g. 7054
    #[arg(long)]
    pub ca_port: u16,

    /// TLS CA port, e.g. 7055
    #[arg(long)]
    pub tlsca_port: u16,

    /// Enrollment CA name, e.g. ca-org1
    #[arg(long)]
    pub ca_name: String,

    /// TLS CA name, e.g. tlsca-org1
    #[arg(long)]
    pub tlsca_name: String,

    /// Enrollment CA bootstrap admin
    #[arg(long, default_value = "admin")]
    pub ca_admin_user: String,

    /// Enrollment CA bootstrap admin password
    #[arg(long, default_value = "adminpw", env = "FABRIC_CA_ADMIN_PASS", hide_env_values = true)]
    pub ca_admin_pass: String,

    /// TLS CA bootstrap admin
    #[arg(long, default_value = "admin")]
    pub tlsca_admin_user: String,

    /// TLS CA bootstrap admin password
    #[arg(long, default_value = "adminpw", env = "FABRIC_TLSCA_ADMIN_PASS", hide_env_values = true)]
    pub tlsca_admin_pass: String,

    /// Enrollment CA tls-cert.pem (default: organizations/fabric-ca/<owner>/ca/tls-cert.pem)
    #[arg(long)]
    pub ca_tls_cert: Option<PathBuf>,

    /// TLS CA tls-cert.pem (default: organizations/fabric-ca/<owner>/tlsca/tls-cert.pem)
    #[arg(long)]
    pub tlsca_tls_cert: Option<PathBuf>,
}

// ============================================================================
// enroll-org
// ============================================================================

#[derive(Args, Debug)]
pub struct EnrollOrgArgs {
    /// Organization name, e.g. org1
    #[arg(long)]
    pub org: String,

    /// Domain, e.g. example.com
    #[arg(long)]
    pub domain: String,

    /// Peer name
    #[arg(long, default_value = "peer0")]
    pub peer: String,

    /// Identity to register on the CA as name:secret:type (repeatable).
    /// Default: <peer>:<peer>pw:peer, <org>admin:<org>adminpw:admin, user1:user1pw:client
    #[arg(long = "id", value_name = "NAME:SECRET:TYPE")]
    pub ids: Vec<IdentitySpec>,

    #[command(flatten)]
    pub cas: CaPairArgs,

    #[command(flatten)]
    pub run: RunArgs,
}

// ============================================================================
// enroll-orderer
// ============================================================================

#[derive(Args, Debug)]
pub struct EnrollOrdererArgs {
    /// Domain, e.g. example.com
    #[arg(long)]
    pub domain: String,

    /// Orderer name
    #[arg(long, default_value = "orderer")]
    pub orderer: String,

    /// Also enroll the orderer admin TLS identity for osnadmin mutual TLS
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub enroll_admin_tls: bool,

    /// Identity to register on both CAs as name:secret:type (repeatable).
    /// Default: <orderer>:<orderer>pw:orderer, ordereradmin:ordereradminpw:admin
    #[arg(long = "id", value_name = "NAME:SECRET:TYPE")]
    pub ids: Vec<IdentitySpec>,

    #[command(flatten)]
    pub cas: CaPairArgs,

    #[command(flatten)]
    pub run: RunArgs,
}

// ============================================================================
// register / enroll
// ============================================================================

#[derive(Args, Debug)]
pub struct CaArgs {
    /// CA name
    #[arg(long)]
    pub caname: String,

    /// CA port
    #[arg(long)]
    pub port: u16,

    /// CA host
    #[arg(long, default_value = "localhost")]
    pub host: String,

    /// CA tls-cert.pem
    #[arg(long)]
    pub tls_cert: PathBuf,

    /// FABRIC_CA_CLIENT_HOME for this call
    #[arg(long)]
    pub client_home: PathBuf,
}

#[derive(Args, Debug)]
pub struct RegisterArgs {
    #[command(flatten)]
    pub ca: CaArgs,

    /// Identity name
    #[arg(long)]
    pub name: String,

    /// Identity secret
    #[arg(long)]
    pub secret: String,

    /// Identity type: client, peer, admin or orderer
    #[arg(long = "type")]
    pub kind: IdentityType,

    /// Fail if the identity is already registered
    #[arg(long)]
    pub strict: bool,

    /// Directory of the registration ledger (default: the client home)
    #[arg(long)]
    pub ledger_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct EnrollArgs {
    #[command(flatten)]
    pub ca: CaArgs,

    /// Enrollment ID
    #[arg(long)]
    pub user: String,

    /// Enrollment secret
    #[arg(long)]
    pub pass: String,

    /// Output MSP or TLS directory (-M)
    #[arg(long)]
    pub msp_dir: PathBuf,

    /// Enrollment profile, e.g. tls
    #[arg(long)]
    pub profile: Option<String>,

    /// Comma-separated CSR hosts
    #[arg(long)]
    pub hosts: Option<String>,

    /// Canonicalize the output as a TLS bundle for this role (server or client)
    #[arg(long, value_name = "server|client")]
    pub tls_role: Option<TlsRoleArg>,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy)]
pub enum TlsRoleArg {
    Server,
    Client,
}

// ============================================================================
// enroll-user
// ============================================================================

#[derive(Args, Debug)]
pub struct EnrollUserArgs {
    /// Project directory containing organizations/ (default: current directory)
    #[arg(long)]
    pub root_dir: Option<PathBuf>,

    /// Organization name
    #[arg(long)]
    pub org: String,

    /// Domain
    #[arg(long)]
    pub domain: String,

    /// Enrollment CA port
    #[arg(long)]
    pub ca_port: u16,

    /// Enrollment CA name
    #[arg(long)]
    pub ca_name: String,

    /// Enrollment CA tls-cert.pem (default: organizations/fabric-ca/<org>/ca/tls-cert.pem)
    #[arg(long)]
    pub ca_tls_cert: Option<PathBuf>,

    /// User to create, e.g. user2
    #[arg(long)]
    pub user: String,

    /// User secret
    #[arg(long)]
    pub secret: String,

    /// Type: client or admin
    #[arg(long = "type", default_value = "client")]
    pub kind: IdentityType,
}

// ============================================================================
// Config command
// ============================================================================

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Key to set (e.g., ca_client_bin, timeout_secs)
        key: String,

        /// Value to set
        value: String,
    },

    /// Show config file path
    Path,
}
