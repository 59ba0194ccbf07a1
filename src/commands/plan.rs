//! `plan` - show the ordered steps for this host

use anyhow::Result;
use hostkit::LocalFs;

use crate::Context;
use crate::cli::PlanArgs;
use crate::engine::differ::display_plan;
use crate::recipe::{self, HostFacts};
use crate::ui;

pub fn run(ctx: &Context, args: &PlanArgs) -> Result<()> {
    let attrs = ctx.load_attributes()?;
    let facts = HostFacts::probe(&LocalFs::new(&args.root), &attrs);
    let plan = recipe::build(&attrs, facts);

    if args.json {
        let plan = plan.filter_by_target(args.target.as_deref());
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    ui::header(&format!(
        "Plan for {} ({})",
        attrs.fqdn, attrs.platform_family
    ));
    ui::kv("dispatch", &attrs.dispatch_type().to_string());
    ui::kv("auth", attrs.nagios.server_auth_method.as_str());
    ui::kv("listen", &attrs.nagios.listen_port().to_string());

    super::show_rejection(&plan);
    display_plan(&plan.filter_by_target(args.target.as_deref()));
    Ok(())
}
