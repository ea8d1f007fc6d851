use tracing_subscriber::EnvFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing with optional file output.
///
/// Logging is disabled by default: the wrapper shares the terminal with
/// the wrapped shell, and a stderr logger would corrupt the passthrough.
/// Set `SHEATH_LOG` to a file path to enable it. Log files get unique
/// names so concurrent sessions do not clobber each other:
/// `{path}.{timestamp}.{pid}`.
pub fn init_tracing(default_level: &str) {
    let Ok(log_path) = std::env::var("SHEATH_LOG") else {
        return;
    };

    let pid = std::process::id();
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let unique_path = format!("{}.{}.{}", log_path, timestamp, pid);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));

    let Ok(file) = std::fs::File::create(&unique_path) else {
        eprintln!("Warning: failed to create log file: {}", unique_path);
        return;
    };

    let file_layer = fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_target(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .init();
}
