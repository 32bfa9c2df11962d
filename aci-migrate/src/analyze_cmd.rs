use aci_migrate::issue::{AnalyzerError, Module};
use aci_migrate::report::{
    render_contracts_text, render_l3out_text, render_physical_text, render_vlan_text,
    render_vpc_text,
};
use aci_migrate::{contracts, l3out, physical, vlan, vpc};
use aci_snapshot::ObjectIndex;
use anyhow::{Context, Result};
use serde::Serialize;

use crate::cli::{AnalyzeArgs, ModuleArg, OutputFormat};
use crate::{load_settings, load_snapshot};

pub fn run_analyze(args: AnalyzeArgs) -> Result<()> {
    let snapshot = load_snapshot(&args.file)?;
    let settings = load_settings(args.settings.as_deref())?;
    let index = ObjectIndex::new(&snapshot);
    let module = Module::from(args.module);

    match args.module {
        ModuleArg::Vpc => emit(
            args.format,
            checked(module, vpc::analyze(&index, &settings))?,
            render_vpc_text,
        ),
        ModuleArg::Contracts => emit(
            args.format,
            checked(module, contracts::translate(&index, &settings))?,
            render_contracts_text,
        ),
        ModuleArg::L3out => emit(
            args.format,
            checked(module, l3out::analyze(&index, &settings))?,
            render_l3out_text,
        ),
        ModuleArg::Vlan => emit(
            args.format,
            checked(module, vlan::analyze(&index, &settings))?,
            render_vlan_text,
        ),
        ModuleArg::Physical => emit(
            args.format,
            checked(module, physical::analyze(&index, &settings))?,
            render_physical_text,
        ),
    }
}

fn checked<T>(module: Module, result: Result<T, AnalyzerError>) -> Result<T> {
    result.with_context(|| format!("{module} analysis failed"))
}

fn emit<T: Serialize>(format: OutputFormat, summary: T, render: fn(&T) -> String) -> Result<()> {
    match format {
        OutputFormat::Text => println!("{}", render(&summary)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }
    Ok(())
}
