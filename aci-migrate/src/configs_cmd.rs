use std::fs;

use aci_migrate::dialect::Dialect;
use aci_migrate::{contracts, l3out, vni, vpc};
use aci_snapshot::ObjectIndex;
use anyhow::{bail, Context, Result};
use tracing::info;

use crate::cli::{ConfigModule, ConfigsArgs};
use crate::{load_settings, load_snapshot};

pub fn run_configs(args: ConfigsArgs) -> Result<()> {
    let snapshot = load_snapshot(&args.file)?;
    let settings = load_settings(args.settings.as_deref())?;
    let index = ObjectIndex::new(&snapshot);
    let dialect = Dialect::from(args.dialect);
    let mapping = vni::map(&index, &settings.vni);

    let rendered = match args.module {
        ConfigModule::Vpc => {
            let summary = vpc::analyze(&index, &settings).context("vpc analysis failed")?;
            vpc::templates::render(&summary, &mapping, dialect)
        }
        ConfigModule::Contracts => {
            let summary =
                contracts::translate(&index, &settings).context("contracts analysis failed")?;
            Some(contracts::dialects::render_all(&summary, dialect))
        }
        ConfigModule::L3out => {
            let summary = l3out::analyze(&index, &settings).context("l3out analysis failed")?;
            l3out::templates::render(&summary, &mapping, dialect)
        }
        ConfigModule::Evpn => vni::templates::render(&mapping, dialect),
    };
    let Some(config) = rendered else {
        bail!(
            "no {} template for dialect {}",
            module_name(args.module),
            dialect.display_name()
        );
    };

    match &args.output {
        Some(path) => {
            fs::write(path, format!("{config}\n"))
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "configuration written");
        }
        None => println!("{config}"),
    }
    Ok(())
}

fn module_name(module: ConfigModule) -> &'static str {
    match module {
        ConfigModule::Vpc => "vpc",
        ConfigModule::Contracts => "contracts",
        ConfigModule::L3out => "l3out",
        ConfigModule::Evpn => "evpn",
    }
}
