//! Example ticker CLI.
//!
//! # Usage
//!
//! ```bash
//! ticker [--greeting <word>] [--verbose]
//! ```

use std::process::ExitCode;

use example::App;
use tna_di::{BootstrapOptions, run};
use tna_logger::{LogLevels, Loglevel, TracingFormat, TracingSetup};

#[tokio::main]
async fn main() -> ExitCode {
    let levels = LogLevels::wildcard(Loglevel::Log);
    let tracing = TracingSetup::from_levels(&levels).with_format(TracingFormat::Compact);

    let code = run::<App>(
        BootstrapOptions::new()
            .with_log_levels(levels)
            .with_tracing(tracing),
    )
    .await;

    tracing::info!(?code, "ticker stopped");
    code
}
