//! In-memory CA used by the pipeline tests.

use async_trait::async_trait;
use enroller_ca::{CaClient, EnrollRequest, RegisterOutcome, RegisterRequest};
use enroller_core::{default_ca_tls_cert, EnrollError, IdentityType, Result};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

/// Write a placeholder CA TLS certificate at its default location.
pub fn ca_cert(project: &Path, owner: &str, tlsca: bool) -> PathBuf {
    let path = default_ca_tls_cert(project, owner, tlsca);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "-----BEGIN CERTIFICATE-----\n").unwrap();
    path
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterCall {
    pub ca: String,
    pub client_home: PathBuf,
    pub ledger_dir: Option<PathBuf>,
    pub name: String,
    pub kind: IdentityType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollCall {
    pub ca: String,
    pub client_home: PathBuf,
    pub user: String,
    pub msp_dir: PathBuf,
    pub profile: Option<String>,
    pub csr_hosts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Register(RegisterCall),
    Enroll(EnrollCall),
}

impl Call {
    /// Compact form for asserting call order
    pub fn summary(&self) -> String {
        match self {
            Self::Register(r) => format!("register {} {} {}", r.ca, r.name, r.kind),
            Self::Enroll(e) => match &e.profile {
                Some(profile) => format!("enroll {} {} {profile}", e.ca, e.user),
                None => format!("enroll {} {}", e.ca, e.user),
            },
        }
    }
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<Call>,
    registered: HashMap<(String, String), String>,
}

/// Records every call and writes deterministic stand-in material.
#[derive(Debug, Default)]
pub struct FakeCa {
    state: Mutex<State>,
    failing: HashSet<String>,
    timing_out: HashSet<String>,
    no_tls_key: HashSet<String>,
}

impl FakeCa {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enrollments of `user` fail as the CA tool would
    pub fn fail_enroll(mut self, user: &str) -> Self {
        self.failing.insert(user.to_string());
        self
    }

    /// Enrollments of `user` time out
    pub fn time_out_enroll(mut self, user: &str) -> Self {
        self.timing_out.insert(user.to_string());
        self
    }

    /// TLS enrollments of `user` produce no private key
    pub fn without_keystore(mut self, user: &str) -> Self {
        self.no_tls_key.insert(user.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    fn write_material(&self, req: &EnrollRequest) -> std::io::Result<()> {
        let dir = &req.msp_dir;
        if dir.exists() {
            std::fs::remove_dir_all(dir)?;
        }
        let ca = &req.endpoint.name;
        let port = req.endpoint.port;
        let tls = req.profile.as_deref() == Some("tls");

        let (roots, root_name) = if tls {
            ("tlscacerts", format!("tls-localhost-{port}-{ca}.pem"))
        } else {
            ("cacerts", format!("localhost-{port}-{ca}.pem"))
        };
        std::fs::create_dir_all(dir.join(roots))?;
        std::fs::write(dir.join(roots).join(root_name), format!("ROOT {ca}\n"))?;

        std::fs::create_dir_all(dir.join("signcerts"))?;
        std::fs::write(
            dir.join("signcerts/cert.pem"),
            format!("CERT {ca} {} {:?}\n", req.user, req.csr_hosts),
        )?;

        std::fs::create_dir_all(dir.join("keystore"))?;
        if !(tls && self.no_tls_key.contains(&req.user)) {
            std::fs::write(
                dir.join("keystore").join(format!("{}_sk", req.user)),
                format!("KEY {ca} {}\n", req.user),
            )?;
        }
        Ok(())
    }
}

#[async_trait]
impl CaClient for FakeCa {
    async fn register(&self, req: &RegisterRequest) -> Result<RegisterOutcome> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Register(RegisterCall {
            ca: req.endpoint.name.clone(),
            client_home: req.client_home.clone(),
            ledger_dir: req.ledger_dir.clone(),
            name: req.identity.name.clone(),
            kind: req.identity.kind,
        }));

        let key = (req.endpoint.name.clone(), req.identity.name.clone());
        match state.registered.get(&key) {
            Some(secret) if *secret != req.identity.secret => Err(EnrollError::ConflictingRegistration {
                name: req.identity.name.clone(),
                ca: req.endpoint.name.clone(),
            }),
            Some(_) if req.idempotent => Ok(RegisterOutcome::AlreadyRegistered),
            Some(_) => Err(EnrollError::CommandFailed {
                command: format!("fabric-ca-client register --id.name {}", req.identity.name),
                status: "exit status: 1".into(),
                output: "Identity is already registered".into(),
            }),
            None => {
                state.registered.insert(key, req.identity.secret.clone());
                Ok(RegisterOutcome::Registered)
            }
        }
    }

    async fn enroll(&self, req: &EnrollRequest) -> Result<()> {
        let known = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call::Enroll(EnrollCall {
                ca: req.endpoint.name.clone(),
                client_home: req.client_home.clone(),
                user: req.user.clone(),
                msp_dir: req.msp_dir.clone(),
                profile: req.profile.clone(),
                csr_hosts: req.csr_hosts.clone(),
            }));
            let bootstrap = req.user == req.endpoint.admin_user && req.secret == req.endpoint.admin_secret;
            let registered = state
                .registered
                .get(&(req.endpoint.name.clone(), req.user.clone()))
                .is_some_and(|secret| *secret == req.secret);
            bootstrap || registered
        };

        let command = format!("fabric-ca-client enroll -u {}", req.endpoint.redacted_url(&req.user));
        if self.timing_out.contains(&req.user) {
            return Err(EnrollError::Timeout {
                command,
                after: Duration::from_secs(60),
            });
        }
        if !known || self.failing.contains(&req.user) {
            return Err(EnrollError::CommandFailed {
                command,
                status: "exit status: 1".into(),
                output: "Authentication failure".into(),
            });
        }

        self.write_material(req)
            .map_err(|e| EnrollError::io(&req.msp_dir, e))
    }
}
