//! Diagnostic logging.
//!
//! The command layer only sees the [`Diagnostics`] trait. In the binary it is
//! backed by `tracing`, with one layer writing to the log file and an
//! optional layer echoing to the console.

use std::fmt;
use std::path::Path;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Target used for every event the tracker emits.
pub const TARGET: &str = "taskman";

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A named value attached to a diagnostic event.
pub type Field<'a> = (&'static str, &'a dyn fmt::Display);

/// Capability for emitting structured diagnostic events.
pub trait Diagnostics {
    fn log(&self, level: Level, message: &str, fields: &[Field<'_>]);
}

impl<D: Diagnostics + ?Sized> Diagnostics for &D {
    fn log(&self, level: Level, message: &str, fields: &[Field<'_>]) {
        (**self).log(level, message, fields)
    }
}

/// Forwards events to the global `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn log(&self, level: Level, message: &str, fields: &[Field<'_>]) {
        let ctx = format_fields(fields);

        // tracing macros need the level as a constant
        macro_rules! emit {
            ($lvl:ident) => {
                tracing::$lvl!(target: TARGET, "{}{}", message, ctx)
            };
        }

        match level {
            Level::TRACE => emit!(trace),
            Level::DEBUG => emit!(debug),
            Level::INFO => emit!(info),
            Level::WARN => emit!(warn),
            _ => emit!(error),
        }
    }
}

/// Render fields as ` key=value` pairs appended to the message.
pub fn format_fields(fields: &[Field<'_>]) -> String {
    fields
        .iter()
        .map(|(key, value)| format!(" {key}={value}"))
        .collect()
}

/// Guards that must be kept alive so buffered log lines reach the file.
pub struct LoggingGuards {
    _guards: Vec<WorkerGuard>,
}

/// Install the global subscriber: file layer always, console layer unless quiet.
pub fn init_logging(config: &Config) -> Result<LoggingGuards, Box<dyn std::error::Error>> {
    let log_path = config.log_path.as_path();
    let file_name = log_path
        .file_name()
        .ok_or_else(|| format!("log path {} has no file name", log_path.display()))?;
    let log_dir = match log_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    if !log_dir.exists() {
        std::fs::create_dir_all(log_dir)?;
    }

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_writer)
        .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
        .with_ansi(false)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    let console_layer = (!config.quiet).then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
            .with_target(false)
    });

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer);

    tracing::subscriber::set_global_default(subscriber)?;

    tracing::debug!(target: TARGET, "Logging initialized at {}", log_path.display());

    Ok(LoggingGuards {
        _guards: vec![file_guard],
    })
}

#[cfg(test)]
pub mod testing {
    use std::cell::RefCell;

    use super::*;

    /// A diagnostic event captured by [`Recorder`].
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Event {
        pub level: Level,
        pub message: String,
        pub fields: Vec<(&'static str, String)>,
    }

    impl Event {
        pub fn field(&self, key: &str) -> Option<&str> {
            self.fields
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.as_str())
        }
    }

    /// Collects events in memory for assertions.
    #[derive(Debug, Default)]
    pub struct Recorder {
        events: RefCell<Vec<Event>>,
    }

    impl Recorder {
        pub fn events(&self) -> Vec<Event> {
            self.events.borrow().clone()
        }

        pub fn find(&self, message: &str) -> Option<Event> {
            self.events
                .borrow()
                .iter()
                .find(|e| e.message == message)
                .cloned()
        }
    }

    impl Diagnostics for Recorder {
        fn log(&self, level: Level, message: &str, fields: &[Field<'_>]) {
            self.events.borrow_mut().push(Event {
                level,
                message: message.to_string(),
                fields: fields.iter().map(|(k, v)| (*k, v.to_string())).collect(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::Recorder;
    use super::*;

    #[test]
    fn test_format_fields() {
        let id = 3u64;
        let name = "Buy milk";
        assert_eq!(format_fields(&[("id", &id), ("name", &name)]), " id=3 name=Buy milk");
        assert_eq!(format_fields(&[]), "");
    }

    #[test]
    fn test_recorder_through_dyn_reference() {
        let recorder = Recorder::default();
        let diag: &dyn Diagnostics = &recorder;
        let id = 9u64;
        (&diag).log(Level::WARN, "Task not found", &[("id", &id)]);

        let events = recorder.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].level, Level::WARN);
        assert_eq!(events[0].field("id"), Some("9"));
    }
}
