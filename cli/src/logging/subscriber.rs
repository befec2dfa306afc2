//! Tracing subscriber setup: console formatter, file layer, and initialisation.
use std::fs;
use std::io::Write as _;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context as _, Result};

use super::format::{render_console, render_file};
use super::types::Severity;
use crate::settings::{LogFile, LogSettings};

/// Extracts the `message` field from a [`tracing::Event`].
#[derive(Default)]
struct MessageExtractor {
    message: String,
}

impl tracing::field::Visit for MessageExtractor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }
}

/// Severity and message of an event.
fn decode(event: &tracing::Event<'_>) -> (Severity, String) {
    let metadata = event.metadata();
    let mut extractor = MessageExtractor::default();
    event.record(&mut extractor);
    (
        Severity::from_event(*metadata.level(), metadata.target()),
        extractor.message,
    )
}

/// A [`tracing_subscriber::Layer`] that mirrors all events to a log file
/// with timestamps and ANSI codes stripped.
///
/// Always receives events at `DEBUG` and above, independent of the console
/// filter, so quiet runs still leave a complete record.
#[derive(Debug)]
pub(super) struct FileLayer {
    file: Mutex<fs::File>,
}

impl FileLayer {
    /// Open the log file, write a run header, and return the layer.
    ///
    /// Truncates unless `append` is set. Missing parent directories are
    /// created.
    pub(super) fn open(path: &Path, append: bool) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating log directory {}", parent.display()))?;
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(path)
            .with_context(|| format!("opening log file {}", path.display()))?;
        writeln!(
            file,
            "==========================================\n\
             deploy {} {}\n\
             ==========================================",
            crate::version(),
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S"),
        )
        .with_context(|| format!("writing log header to {}", path.display()))?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for FileLayer {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let (severity, msg) = decode(event);
        let timestamp = chrono::Utc::now().format("%H:%M:%S").to_string();
        let line = render_file(severity, &msg, &timestamp);
        if let Ok(mut f) = self.file.lock() {
            writeln!(f, "{line}").ok();
        }
    }
}

/// A [`tracing_subscriber::fmt::FormatEvent`] that renders deploy-style
/// console lines.
struct ConsoleFormatter {
    color: bool,
}

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for ConsoleFormatter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: tracing_subscriber::fmt::format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let (severity, msg) = decode(event);
        writeln!(writer, "{}", render_console(severity, &msg, self.color))
    }
}

/// Initialise the global [`tracing`] subscriber.
///
/// The console layer writes to standard error using the level from
/// [`LogSettings::console_level`]; when a log file is configured, a
/// [`FileLayer`] records every event at `DEBUG` and above.
/// Must be called once at program startup, before any logging.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened or a global subscriber
/// is already installed.
pub fn init_subscriber(settings: &LogSettings) -> Result<()> {
    use tracing_subscriber::{
        Layer as _, filter::LevelFilter, fmt, layer::SubscriberExt as _,
        util::SubscriberInitExt as _,
    };

    let console_layer = fmt::layer()
        .event_format(ConsoleFormatter {
            color: settings.color,
        })
        .with_writer(std::io::stderr)
        .with_filter(settings.console_level());

    let file_layer = settings
        .file
        .as_ref()
        .map(|LogFile { path, append }| FileLayer::open(path, *append))
        .transpose()?
        .map(|l| l.with_filter(LevelFilter::DEBUG));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("installing the tracing subscriber")
}
