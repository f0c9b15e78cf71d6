use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use email_bridge_core::config::LoggingConfig;

/// Build the filter directive string: base level followed by per-crate filters.
fn directives(logging: Option<&LoggingConfig>, verbose: bool) -> String {
    let level = if verbose {
        "debug".to_string()
    } else {
        logging
            .and_then(|l| l.level.clone())
            .unwrap_or_else(|| "info".to_string())
    };
    let mut out = level;
    for filter in logging.map(|l| l.filters.as_slice()).unwrap_or_default() {
        out.push(',');
        out.push_str(filter);
    }
    out
}

/// Install the global subscriber. `RUST_LOG` wins over the config.
pub fn init(logging: Option<&LoggingConfig>, verbose: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directives(logging, verbose)));

    let writer = match logging.map(|l| l.output.as_str()) {
        Some("stdout") => BoxMakeWriter::new(std::io::stdout),
        _ => BoxMakeWriter::new(std::io::stderr),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer);
    let result = match logging.map(|l| l.format.as_str()) {
        Some("json") => builder.json().try_init(),
        _ => builder.try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))
}
