//! Shell completion generation.
use std::io::Write;

use anyhow::Result;
use clap::CommandFactory;
use clap_complete::Shell;

use crate::cli::Cli;

/// Write completions for `shell` to `out`.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write(shell: Shell, out: &mut dyn Write) -> Result<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, out);
    out.flush()?;
    Ok(())
}

/// Run the completions command, printing to stdout.
///
/// # Errors
///
/// Returns an error if stdout cannot be written.
pub fn run(shell: Shell) -> Result<()> {
    write(shell, &mut std::io::stdout().lock())
}
