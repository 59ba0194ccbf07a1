//! `render` - print the Nagios vhost, or diff it against the one on disk

use anyhow::Result;
use declarative::{FileSystem, TemplateRenderer};
use hostkit::LocalFs;

use crate::Context;
use crate::cli::RenderArgs;
use crate::engine::differ::display_text_diff;
use crate::recipe::{self, VHOST_SITE};
use crate::vhost::{TEMPLATE_ID, VhostTemplates};

pub fn run(ctx: &Context, args: &RenderArgs) -> Result<()> {
    let attrs = ctx.load_attributes()?;
    let content =
        VhostTemplates::new()?.render(TEMPLATE_ID, &recipe::template_variables(&attrs))?;

    if !args.diff {
        print!("{content}");
        return Ok(());
    }

    let path = recipe::available_site(&attrs, VHOST_SITE);
    let current = LocalFs::new(&args.root).read(&path)?.unwrap_or_default();
    display_text_diff(&path.display().to_string(), &current, &content);
    Ok(())
}
