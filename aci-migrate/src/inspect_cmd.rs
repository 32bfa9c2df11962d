use aci_migrate::inspect::{build_inventory, render_inventory_text};
use anyhow::Result;

use crate::cli::{InspectArgs, OutputFormat};
use crate::load_snapshot;

pub fn run_inspect(args: InspectArgs) -> Result<()> {
    let snapshot = load_snapshot(&args.file)?;
    let inventory = build_inventory(&snapshot, args.class.as_deref());

    match args.format {
        OutputFormat::Text => println!("{}", render_inventory_text(&inventory)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&inventory)?),
    }
    Ok(())
}
