//! Tracing subscriber setup.
//!
//! Console output always; a daily rolling file under `log_dir` when given.
//! `RUST_LOG` overrides the level passed in.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{CoreError, CoreResult};

const LOG_FILE_PREFIX: &str = "sessionkeeper.log";

fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "sessionkeeper={level},sessionkeeper_core={level},sessionkeeper_server={level},tower_http=warn"
        ))
    })
}

/// Install the global subscriber.
///
/// Keep the returned guard alive for the lifetime of the process, or
/// buffered file output is lost.
pub fn init_logging(level: &str, log_dir: Option<&Path>) -> CoreResult<Option<WorkerGuard>> {
    let console = fmt::layer().with_target(false).compact();

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        },
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(build_filter(level))
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|e| CoreError::Io(std::io::Error::other(e.to_string())))?;

    Ok(guard)
}
