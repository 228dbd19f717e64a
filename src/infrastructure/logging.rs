use std::{io, path::Path};

use anyhow::Result;
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::AppConfig;

const LOG_FILE_PREFIX: &str = "phish-gate.log";

/// hyper and reqwest log every connection at debug; one classification per
/// navigation would drown the host's own output.
const QUIET_DEPENDENCIES: &[&str] = &["hyper_util=warn", "hyper=warn", "reqwest=warn", "rustls=warn"];

static INIT: OnceCell<()> = OnceCell::new();
static GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();

/// Console output goes to stderr: stdout belongs to the native messaging
/// stream and a stray log line there would corrupt it.
pub fn init_tracing(config: &AppConfig, logs_dir: &Path) -> Result<()> {
    INIT.get_or_try_init::<_, anyhow::Error>(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| host_filter(&config.logging.level));

        let file_appender = tracing_appender::rolling::daily(logs_dir, LOG_FILE_PREFIX);
        let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
        let _ = GUARD.set(guard);

        let console_layer = fmt::layer()
            .with_writer(io::stderr)
            .with_target(true)
            .with_ansi(false);

        let file_layer = fmt::layer()
            .with_writer(file_writer)
            .with_target(true)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .init();

        tracing::info!(
            target: "lifecycle",
            logs = %logs_dir.display(),
            level = %config.logging.level,
            "tracing initialized"
        );
        Ok(())
    })?;
    Ok(())
}

/// `LOG_LEVEL` may be a bare level or a full directive list. The HTTP stack
/// stays at warn unless the directives name it explicitly.
fn host_filter(level: &str) -> EnvFilter {
    let mut directives = vec![level.trim().to_string()];
    for quiet in QUIET_DEPENDENCIES.iter().copied() {
        let krate = quiet.split('=').next().unwrap_or(quiet);
        if !level.contains(krate) {
            directives.push(quiet.to_string());
        }
    }
    EnvFilter::try_new(directives.join(",")).unwrap_or_else(|_| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_stack_is_quieted_by_default() {
        let filter = host_filter("debug").to_string();
        assert!(filter.contains("debug"));
        assert!(filter.contains("reqwest=warn"));
        assert!(filter.contains("hyper=warn"));
    }

    #[test]
    fn explicit_directives_win() {
        let filter = host_filter("info,reqwest=trace").to_string();
        assert!(filter.contains("reqwest=trace"));
        assert!(!filter.contains("reqwest=warn"));
    }

    #[test]
    fn invalid_level_falls_back_to_info() {
        let filter = host_filter("phish_gate=loudest").to_string();
        assert!(filter.contains("info"));
        assert!(!filter.contains("loudest"));
    }
}
