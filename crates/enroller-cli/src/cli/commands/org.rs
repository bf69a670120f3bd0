//! `fabric-enroller enroll-org` - Bootstrap a peer organization.

use anyhow::Result;
use fabric_enroller::{provision_org, IdentitySet, OrgConfig};

use super::{endpoints, project_root, Context};
use crate::cli::args::EnrollOrgArgs;
use crate::output::print_report;

pub async fn execute(ctx: Context, args: EnrollOrgArgs) -> Result<()> {
    let root = project_root(args.run.root_dir.as_deref())?;
    let (ca, tlsca) = endpoints(&root, &args.org, &args.cas);

    let config = OrgConfig::new(&root, &args.org, &args.domain, ca, tlsca)
        .peer(&args.peer)
        .identities(IdentitySet::new(args.ids)?)
        .options(ctx.options(&args.run));

    let report = provision_org(&config, &ctx.client()).await?;
    print_report(ctx.output_format, &report)
}
