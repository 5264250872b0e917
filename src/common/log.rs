use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, registry};
use tracing_tree::HierarchicalLayer;

/// Installs the global subscriber with a `warn` default filter.
///
/// Returns `false` if a subscriber was already installed.
pub fn init_logging() -> bool { init_logging_with("warn") }

/// Installs the global subscriber. `RUST_LOG` wins over `default_filter`.
pub fn init_logging_with(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    registry()
        .with(filter)
        .with(HierarchicalLayer::new(2).with_targets(true))
        .try_init()
        .is_ok()
}
