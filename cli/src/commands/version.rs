//! Command: print version information.
use std::io::Write;

use anyhow::Result;

/// Print the deploy version to stdout.
///
/// # Errors
///
/// Returns an error if stdout cannot be written.
pub fn run() -> Result<()> {
    writeln!(std::io::stdout().lock(), "deploy {}", crate::version())?;
    Ok(())
}
