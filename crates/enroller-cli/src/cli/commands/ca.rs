//! `fabric-enroller register` / `fabric-enroller enroll` - Single CA operations.

use anyhow::Result;
use colored::Colorize;
use fabric_enroller::provision::{canonicalize, fs::FileEntry};
use fabric_enroller::{
    CaClient, CaEndpoint, EnrollRequest, IdentitySpec, RegisterOutcome, RegisterRequest, TlsRole,
};
use serde::Serialize;
use std::path::PathBuf;

use super::Context;
use crate::cli::args::{CaArgs, EnrollArgs, RegisterArgs, TlsRoleArg};
use crate::output::emit;

#[derive(Serialize)]
struct Registration {
    ca: String,
    name: String,
    outcome: &'static str,
}

#[derive(Serialize)]
struct Enrollment {
    ca: String,
    user: String,
    msp_dir: PathBuf,
    files: Vec<FileEntry>,
}

fn endpoint(args: &CaArgs) -> CaEndpoint {
    CaEndpoint::new(&args.caname, args.port, &args.tls_cert).host(&args.host)
}

/// Split `a, b,,c` into `["a", "b", "c"]`.
fn split_hosts(hosts: Option<&str>) -> Vec<String> {
    hosts
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(String::from)
        .collect()
}

pub async fn register(ctx: Context, args: RegisterArgs) -> Result<()> {
    let endpoint = endpoint(&args.ca);
    let identity = IdentitySpec::new(&args.name, &args.secret, args.kind);
    let mut request =
        RegisterRequest::new(&endpoint, &args.ca.client_home, identity).idempotent(!args.strict);
    if let Some(dir) = &args.ledger_dir {
        request = request.ledger_dir(dir);
    }

    let outcome = ctx.client().register(&request).await?;
    let summary = Registration {
        ca: endpoint.name.clone(),
        name: args.name,
        outcome: match outcome {
            RegisterOutcome::Registered => "registered",
            RegisterOutcome::AlreadyRegistered => "already registered",
        },
    };

    emit(ctx.output_format, &summary, |s| {
        println!(
            "{} {} on {} ({})",
            "Success:".green().bold(),
            s.name.cyan(),
            s.ca,
            s.outcome
        );
    })
}

pub async fn enroll(ctx: Context, args: EnrollArgs) -> Result<()> {
    let endpoint = endpoint(&args.ca);
    let mut request = EnrollRequest::new(
        &endpoint,
        &args.ca.client_home,
        &args.user,
        &args.pass,
        &args.msp_dir,
    )
    .csr_hosts(split_hosts(args.hosts.as_deref()));
    if let Some(profile) = &args.profile {
        request = request.profile(profile);
    }

    ctx.client().enroll(&request).await?;

    if let Some(role) = args.tls_role {
        let role = match role {
            TlsRoleArg::Server => TlsRole::Server,
            TlsRoleArg::Client => TlsRole::Client,
        };
        canonicalize(&args.msp_dir, role, ctx.material_selection).await?;
    }

    let summary = Enrollment {
        ca: endpoint.name.clone(),
        user: args.user,
        files: fabric_enroller::provision::fs::list_dir(&args.msp_dir).await?,
        msp_dir: args.msp_dir,
    };

    emit(ctx.output_format, &summary, |s| {
        println!(
            "{} {} enrolled into {}",
            "Success:".green().bold(),
            s.user.cyan(),
            s.msp_dir.display()
        );
        for file in &s.files {
            let name = if file.is_dir {
                format!("{}/", file.name)
            } else {
                file.name.clone()
            };
            println!("  {name}");
        }
    })
}
