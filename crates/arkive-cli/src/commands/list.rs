//! List command implementation

use crate::cli::ListArgs;
use crate::error::add_archive_context;
use crate::output::OutputFormatter;
use anyhow::Result;
use arkive_core::list_archive;

pub fn execute(args: &ListArgs, formatter: &dyn OutputFormatter) -> Result<bool> {
    let listing = add_archive_context(list_archive(&args.archive, args.password.as_deref()), &args.archive)?;

    formatter.format_listing(&listing, args.long, args.human_readable)?;

    Ok(listing.unreadable == 0)
}
