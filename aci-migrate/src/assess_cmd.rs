use aci_migrate::assess::Assessor;
use aci_migrate::report::render_assessment_text;
use anyhow::{bail, Context, Result};

use crate::cli::{AssessArgs, OutputFormat};
use crate::{load_settings, load_snapshot};

pub fn run_assess(args: AssessArgs) -> Result<()> {
    let snapshot = load_snapshot(&args.file)?;
    let mut settings = load_settings(args.settings.as_deref())?;
    if let Some(threshold) = args.threshold {
        settings.readiness.ready_threshold = threshold;
        settings.validate().context("invalid --threshold")?;
    }
    let result = Assessor::new(settings).assess(&snapshot);

    match args.format {
        OutputFormat::Text => println!("{}", render_assessment_text(&result, args.verbose)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
    }

    if args.strict && !result.ready_for_migration {
        bail!(
            "assessment failed in strict mode: score {:.1} is below threshold {:.1}",
            result.overall_score,
            result.threshold
        );
    }
    Ok(())
}
