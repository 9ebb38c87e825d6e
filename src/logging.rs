//! Tracing bootstrap for the binary
//!
//! The console subscriber goes up first so configuration loading is logged.
//! Rolling file output is attached afterwards, once the config names a
//! directory for it.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

use crate::config::LoggingConfig;
use crate::errors::LoggingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Human,
    Json,
}

type FileLayer = Option<Box<dyn Layer<Registry> + Send + Sync>>;

/// Handle to the installed subscriber
pub struct LogHandle {
    files: reload::Handle<FileLayer, Registry>,
}

/// Install the global subscriber. `RUST_LOG` takes precedence over `level`.
///
/// Logs go to stderr so structured command output on stdout stays parseable.
pub fn init_logging(level: &str, format: LogFormat) -> Result<LogHandle, LoggingError> {
    let level: tracing::Level = level
        .parse()
        .map_err(|_| LoggingError::Level(level.to_string()))?;
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    let console = match format {
        LogFormat::Human => fmt::layer().with_writer(std::io::stderr).boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(std::io::stderr).boxed(),
    };

    let (file_layer, files) = reload::Layer::new(FileLayer::None);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(filter)
        .with(console)
        .try_init()?;

    Ok(LogHandle { files })
}

impl LogHandle {
    /// Start writing daily rolling files when `config.dir` is set.
    ///
    /// Keep the returned guard alive until exit or buffered file lines are lost.
    pub fn attach_files(&self, config: &LoggingConfig) -> Result<Option<WorkerGuard>, LoggingError> {
        let Some(dir) = &config.dir else {
            return Ok(None);
        };

        let appender = tracing_appender::rolling::daily(dir, &config.file_prefix);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer().with_ansi(false).with_writer(writer).boxed();
        self.files.reload(Some(layer))?;

        tracing::debug!("Writing log files to: {}", dir.display());
        Ok(Some(guard))
    }
}
