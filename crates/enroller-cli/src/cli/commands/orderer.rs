//! `fabric-enroller enroll-orderer` - Bootstrap an orderer organization.

use anyhow::Result;
use fabric_enroller::{provision_orderer, IdentitySet, OrdererConfig};

use super::{endpoints, project_root, Context};
use crate::cli::args::EnrollOrdererArgs;
use crate::output::print_report;

/// CA material for the orderer organization lives under `fabric-ca/orderer/`
const CA_OWNER: &str = "orderer";

pub async fn execute(ctx: Context, args: EnrollOrdererArgs) -> Result<()> {
    let root = project_root(args.run.root_dir.as_deref())?;
    let (ca, tlsca) = endpoints(&root, CA_OWNER, &args.cas);

    let config = OrdererConfig::new(&root, &args.domain, ca, tlsca)
        .orderer(&args.orderer)
        .identities(IdentitySet::new(args.ids)?)
        .enroll_admin_tls(args.enroll_admin_tls)
        .options(ctx.options(&args.run));

    let report = provision_orderer(&config, &ctx.client()).await?;
    print_report(ctx.output_format, &report)
}
