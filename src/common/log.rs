use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_tree::HierarchicalLayer;

/// Installs the global subscriber. An explicit `filter` wins over `RUST_LOG`.
pub fn init_logging(filter: Option<&str>) -> anyhow::Result<()> {
    let filter = match filter {
        Some(directives) => EnvFilter::try_new(directives)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            HierarchicalLayer::default()
                .with_writer(std::io::stderr)
                .with_indent_lines(true)
                .with_targets(true)
                .with_deferred_spans(true),
        )
        .try_init()?;
    Ok(())
}
