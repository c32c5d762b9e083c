//! Tracing set up shared by the cli and the test harness
//!
//! Spans are written as bunyan JSON. The filter comes from `RUST_LOG` when set

use anyhow::Context as _;
use chrono::{DateTime, Local};
use std::{
    fs::{create_dir_all, File},
    path::PathBuf,
};
use tracing::{subscriber::set_global_default, Subscriber};
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::{fmt::MakeWriter, layer::SubscriberExt as _, EnvFilter, Registry};

/// Folder trace files go in unless `FLEETDESK_TRACE_DIR` says otherwise
pub const TRACE_FOLDER: &str = "traces";

/// Builds a bunyan subscriber writing to `sink`
///
/// `fallback_filter` is used when `RUST_LOG` is unset or invalid. See
/// <https://docs.rs/tracing-subscriber/0.3.19/tracing_subscriber/filter/struct.EnvFilter.html#directives>
pub fn get_subscriber<Sink, S>(
    name: String,
    fallback_filter: S,
    sink: Sink,
) -> impl Subscriber + Sync + Send
where
    Sink: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    S: AsRef<str>,
{
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback_filter));
    Registry::default()
        .with(filter)
        .with(JsonStorageLayer)
        .with(BunyanFormattingLayer::new(name, sink))
}

/// Installs `subscriber` for the whole process and routes `log` records to it
///
/// Fails if called a second time
pub fn init_subscriber(subscriber: impl Subscriber + Sync + Send) -> anyhow::Result<()> {
    LogTracer::init().context("Failed to set logger")?;
    set_global_default(subscriber).context("Failed to set subscriber")
}

pub fn trace_folder() -> PathBuf {
    std::env::var_os("FLEETDESK_TRACE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(TRACE_FOLDER))
}

fn trace_file_name(app_name: &str, started: DateTime<Local>) -> String {
    format!("{}_{app_name}.log", started.format("%Y-%m-%dT%H-%M-%S"))
}

/// Creates a new timestamped log file in [`trace_folder`] and returns it
/// with its path
pub fn create_trace_file(app_name: &str) -> anyhow::Result<(File, PathBuf)> {
    let folder = trace_folder();
    create_dir_all(&folder)
        .with_context(|| format!("Failed to create logging folder: {folder:?}"))?;
    let path = folder.join(trace_file_name(app_name, Local::now()));
    let file =
        File::create(&path).with_context(|| format!("Failed to create log file: {path:?}"))?;
    Ok((file, path))
}
