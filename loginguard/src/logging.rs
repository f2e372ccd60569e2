use time::macros::format_description;
use time::UtcOffset;
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

const DEFAULT_FILTER: &str = "loginguard=info";

/// Compact colored output for an operator at a terminal, full timestamps
/// and targets when piped into a log collector.
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);

    let output = if console::user_attended() {
        fmt::layer()
            .compact()
            .with_target(false)
            .with_timer(OffsetTime::new(
                offset,
                format_description!("[hour]:[minute]:[second]"),
            ))
            .boxed()
    } else {
        fmt::layer()
            .with_ansi(false)
            .with_timer(OffsetTime::new(
                offset,
                format_description!("[day].[month].[year] [hour]:[minute]:[second]"),
            ))
            .boxed()
    };

    tracing_subscriber::registry().with(filter).with(output).init();
}
