//! Logging configuration of the driver.

use clap::ValueEnum;
use tracing::Level;
use tracing_log::LogTracer;
use tracing_subscriber::filter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Layer;
use tracing_subscriber::Registry;

#[derive(ValueEnum, Debug, Clone)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(val: LogLevel) -> Self {
        match val {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

/// Setup hooks for panic so panics land in the log stream.
pub fn set_panic_hook() {
    std::panic::set_hook(Box::new(|panic| {
        tracing::error!("{}", panic);
    }));
}

/// Install the global subscriber: formatted output on stderr plus a
/// bridge for crates still using the `log` facade.
pub fn init_logging(level: LogLevel) {
    set_panic_hook();

    let subscriber = Registry::default();
    let level_filter = filter::LevelFilter::from_level(level.into());

    // Stderr
    let subscriber = subscriber.with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(level_filter),
    );

    // Enable log compatible layer to convert log record to tracing span.
    // We will ignore any errors that returned by this functions.
    let _ = LogTracer::init();

    // Ignore errors returned by set_global_default.
    let _ = tracing::subscriber::set_global_default(subscriber);
}
