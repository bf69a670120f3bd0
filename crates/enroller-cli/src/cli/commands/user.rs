//! `fabric-enroller enroll-user` - Add a user to an existing organization.

use anyhow::Result;
use fabric_enroller::{provision_user, CaEndpoint, IdentitySpec, UserConfig};

use super::{project_root, Context};
use crate::cli::args::EnrollUserArgs;
use crate::output::print_report;

pub async fn execute(ctx: Context, args: EnrollUserArgs) -> Result<()> {
    let root = project_root(args.root_dir.as_deref())?;
    let tls_cert = match args.ca_tls_cert {
        Some(path) if path.is_absolute() => path,
        Some(path) => root.join(path),
        None => fabric_enroller::default_ca_tls_cert(&root, &args.org, false),
    };

    let ca = CaEndpoint::new(&args.ca_name, args.ca_port, tls_cert);
    let user = IdentitySpec::new(&args.user, &args.secret, args.kind);
    let config = UserConfig::new(&root, &args.org, &args.domain, ca, user);

    let report = provision_user(&config, &ctx.client()).await?;
    print_report(ctx.output_format, &report)
}
