use std::path::PathBuf;

use aci_migrate::dialect::Dialect;
use aci_migrate::issue::Module;
use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "aci-migrate")]
#[command(about = "Assess Cisco ACI fabric exports for EVPN/VXLAN migration")]
pub struct Cli {
    /// Log filter (e.g. `info`, `aci_migrate=debug`); defaults to RUST_LOG, then `warn`.
    #[arg(long, global = true)]
    pub log_level: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Run every analyzer and report the migration readiness verdict.
    Assess(AssessArgs),
    /// Run a single analyzer and print its summary.
    Analyze(AnalyzeArgs),
    /// Render target-platform configuration for one module.
    Configs(ConfigsArgs),
    /// List the object classes of an export.
    Inspect(InspectArgs),
}

#[derive(Parser, Debug)]
pub struct AssessArgs {
    pub file: PathBuf,
    /// TOML settings file overriding the embedded defaults.
    #[arg(long)]
    pub settings: Option<PathBuf>,
    /// Readiness threshold overriding the settings value.
    #[arg(long)]
    pub threshold: Option<f64>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    /// Exit non-zero when the fabric is not ready for migration.
    #[arg(long)]
    pub strict: bool,
    /// Include every module summary in text output.
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Parser, Debug)]
pub struct AnalyzeArgs {
    #[arg(value_enum)]
    pub module: ModuleArg,
    pub file: PathBuf,
    #[arg(long)]
    pub settings: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
pub struct ConfigsArgs {
    pub file: PathBuf,
    #[arg(long, value_enum)]
    pub module: ConfigModule,
    #[arg(long, value_enum, default_value_t = DialectArg::Nxos)]
    pub dialect: DialectArg,
    #[arg(long)]
    pub settings: Option<PathBuf>,
    /// Write the configuration to a file instead of stdout.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct InspectArgs {
    pub file: PathBuf,
    /// List the DNs of one class.
    #[arg(long)]
    pub class: Option<String>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum ModuleArg {
    Vpc,
    Contracts,
    L3out,
    Vlan,
    Physical,
}

impl From<ModuleArg> for Module {
    fn from(arg: ModuleArg) -> Self {
        match arg {
            ModuleArg::Vpc => Module::Vpc,
            ModuleArg::Contracts => Module::Contracts,
            ModuleArg::L3out => Module::L3out,
            ModuleArg::Vlan => Module::Vlan,
            ModuleArg::Physical => Module::Physical,
        }
    }
}

/// Modules that render target configuration.
#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum ConfigModule {
    Vpc,
    Contracts,
    L3out,
    /// VXLAN overlay: VLAN to VNI and VRF to L3 VNI mappings.
    Evpn,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum DialectArg {
    Nxos,
    Eos,
    Junos,
    Ios,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Nxos => Dialect::Nxos,
            DialectArg::Eos => Dialect::Eos,
            DialectArg::Junos => Dialect::Junos,
            DialectArg::Ios => Dialect::Ios,
        }
    }
}
