//! Extract command implementation.

use crate::cli::ExtractArgs;
use crate::error::add_archive_context;
use crate::output::OutputFormatter;
use crate::progress::CliProgress;
use anyhow::Context;
use anyhow::Result;
use arkive_core::NoopProgress;
use arkive_core::open_session;
use std::env;

pub fn execute(
    args: &ExtractArgs,
    formatter: &dyn OutputFormatter,
    show_progress: bool,
) -> Result<bool> {
    let output_dir = match &args.output_dir {
        Some(dir) => dir.clone(),
        None => env::current_dir().context("failed to get current directory")?,
    };

    let mut session = add_archive_context(
        open_session(&args.archive, args.config(), args.pass.password.as_deref()),
        &args.archive,
    )?;
    let selection = args.pass.selection();
    tracing::debug!(
        archive = %args.archive.display(),
        output = %output_dir.display(),
        ?selection,
        "extracting"
    );

    let result = if show_progress {
        let mut progress = CliProgress::new("Extracting");
        session.extract(&output_dir, &selection, &mut progress)
    } else {
        session.extract(&output_dir, &selection, &mut NoopProgress)
    };
    let result = add_archive_context(result, &args.archive)?;

    formatter.format_pass_result(&args.archive, &result)?;

    Ok(!result.had_failures())
}
