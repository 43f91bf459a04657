use queryfan_core::{Config, Result};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, registry, util::SubscriberInitExt};

/// Install the global tracing subscriber from the configured filter
/// directives.
pub(crate) fn init(config: &Config) -> Result<()> {
	let filter = EnvFilter::try_new(&config.log).unwrap_or_else(|e| {
		eprintln!("config 'log' directive is invalid, falling back to 'warn': {e}");
		EnvFilter::new("warn")
	});

	registry()
		.with(fmt::Layer::new())
		.with(filter)
		.try_init()
		.map_err(|e| queryfan_core::Error::Err(format!("tracing init failed: {e}").into()))?;

	Ok(())
}
