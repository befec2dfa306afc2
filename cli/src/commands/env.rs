//! Env command.
use crate::logging::Log;
use crate::platform::Platform;

/// Run the env command: print the detected environment as one block.
pub fn run(log: &dyn Log) {
    report(&Platform::detect(), log);
}

fn report(platform: &Platform, log: &dyn Log) {
    log.block("Detected environment", &platform.describe());
}
