use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Filter directive for a `-v` count.
pub fn default_filter(verbosity: u8) -> &'static str {
	// 0 = warnings only (CDP transport noise suppressed)
	// 1 (-v) = info
	// 2+ (-vv) = debug for everything
	match verbosity {
		0 => "warn,scm_runtime=error",
		1 => "info",
		_ => "debug",
	}
}

/// Installs the global subscriber. Everything goes to stderr; stdout carries
/// the JSON-RPC stream and must stay clean.
pub fn init_logging(verbosity: u8) {
	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));

	let stderr = std::io::stderr.with_max_level(tracing::Level::TRACE);

	tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(stderr)
		.with_ansi(false)
		.with_target(true)
		.with_level(true)
		.compact()
		.init();
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn verbosity_maps_to_filters() {
		assert_eq!(default_filter(0), "warn,scm_runtime=error");
		assert_eq!(default_filter(1), "info");
		assert_eq!(default_filter(2), "debug");
		assert_eq!(default_filter(7), "debug");
	}

	#[test]
	fn filters_parse() {
		for v in 0..3 {
			assert!(EnvFilter::try_new(default_filter(v)).is_ok());
		}
	}
}
