//! Tracing subscriber setup.
//!
//! Console output is pretty or JSON depending on `ARTY_LOG_JSON`. When
//! `ARTY_LOG_DIR` is set, records are also written to a daily-rotated file
//! through a non-blocking writer; the returned guard must live until exit so
//! buffered lines are flushed.

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

pub fn init(cfg: &Config) -> anyhow::Result<Option<WorkerGuard>> {
    // `RUST_LOG` wins over `ARTY_LOG`; warn loudly if the latter is invalid.
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match cfg.log_level.parse::<EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: ARTY_LOG='{}' is not a valid tracing filter ({}); \
                     falling back to 'info'",
                    cfg.log_level, e
                );
                EnvFilter::new("info")
            }
        },
    };

    let pretty_layer = (!cfg.log_json).then(|| {
        fmt::layer().with_target(true).with_thread_ids(true)
    });
    let json_layer = cfg.log_json.then(|| {
        fmt::layer().json().with_target(true).with_thread_ids(true)
    });

    let (file_layer, guard) = match &cfg.log_dir {
        Some(dir) => {
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("arty-server")
                .filename_suffix("log")
                .build(dir)
                .with_context(|| format!("failed to open log directory {}", dir.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    Registry::default()
        .with(env_filter)
        .with(pretty_layer)
        .with(json_layer)
        .with(file_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(guard)
}
