//! `check` - validate attributes without touching the host

use anyhow::Result;
use declarative::TemplateRenderer;

use crate::Context;
use crate::engine;
use crate::recipe::{self, HostFacts};
use crate::ui;
use crate::vhost::{TEMPLATE_ID, VhostTemplates};

pub fn run(ctx: &Context) -> Result<()> {
    ui::header("Checking attributes");

    let file = ctx.attributes_file()?;
    match &file {
        Some(path) => ui::kv("attributes", &path.display().to_string()),
        None => ui::kv("attributes", "(platform defaults only)"),
    }

    let attrs = ctx.load_attributes()?;
    ui::kv("platform", attrs.platform_family.as_str());
    ui::kv("fqdn", &attrs.fqdn);

    let configured = attrs.nagios.server.nginx_dispatch.kind;
    let dispatch = attrs.dispatch_type();
    if dispatch == configured {
        ui::kv("dispatch", &dispatch.to_string());
    } else {
        ui::kv(
            "dispatch",
            &format!("{dispatch} (forced on {}, configured {configured})", attrs.platform_family),
        );
    }
    ui::kv("auth", attrs.nagios.server_auth_method.as_str());

    let plan = recipe::build(&attrs, HostFacts::default());
    plan.validate()?;
    VhostTemplates::new()?.render(TEMPLATE_ID, &recipe::template_variables(&attrs))?;

    if let Err(err) = engine::preflight(&plan) {
        super::show_rejection(&plan);
        return Err(err.into());
    }

    println!();
    ui::success("Attributes are valid for an nginx front end");
    ui::info(&format!(
        "Basic auth users are read from {}",
        attrs.nagios.htpasswd_file().display()
    ));
    Ok(())
}
