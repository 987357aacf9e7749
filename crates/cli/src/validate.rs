//! Input validation for ports and navigation URLs.
//!
//! Everything here is pure. Failures are [`BridgeError::InvalidArgument`]
//! and carry the text shown to the caller.

use serde_json::Value;
use url::{Host, Url};

use crate::error::{BridgeError, Result};

pub const MIN_PORT: u16 = 1024;
pub const MAX_PORT: u16 = 65535;
pub const MAX_URL_LEN: usize = 2048;

/// Checks a tool-supplied `port` value.
///
/// JSON integers and integer strings are accepted; fractions, booleans,
/// objects and anything outside [1024, 65535] are not.
pub fn validate_port(raw: &Value) -> Result<u16> {
	let parsed = match raw {
		Value::Number(n) => n
			.as_i64()
			.or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && f.abs() < 1e15).map(|f| f as i64)),
		Value::String(s) => s.trim().parse::<i64>().ok(),
		_ => None,
	};
	match parsed {
		Some(port) if (i64::from(MIN_PORT)..=i64::from(MAX_PORT)).contains(&port) => Ok(port as u16),
		_ => Err(invalid_port(&display_raw(raw))),
	}
}

/// Range check for an already typed port.
pub fn check_port(port: u16) -> Result<u16> {
	if port < MIN_PORT {
		return Err(invalid_port(&port.to_string()));
	}
	Ok(port)
}

/// `clap` value parser for port flags.
pub fn parse_port(raw: &str) -> std::result::Result<u16, String> {
	validate_port(&Value::String(raw.to_string())).map_err(|e| e.to_string())
}

fn invalid_port(raw: &str) -> BridgeError {
	BridgeError::InvalidArgument(format!("Invalid port: {raw}. Must be integer between {MIN_PORT}-{MAX_PORT}"))
}

fn display_raw(raw: &Value) -> String {
	match raw {
		Value::String(s) => s.clone(),
		other => other.to_string(),
	}
}

/// What `navigate` should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationTarget {
	Reload,
	Url {
		url: String,
		/// Plain `http` to a host other than the loopback names.
		insecure_http: bool,
	},
}

/// Checks a `navigate` URL argument.
///
/// `reload` in any case short-circuits every other check.
pub fn validate_url(raw: &str) -> Result<NavigationTarget> {
	if raw.eq_ignore_ascii_case("reload") {
		return Ok(NavigationTarget::Reload);
	}

	let len = raw.chars().count();
	if len > MAX_URL_LEN {
		return Err(BridgeError::InvalidArgument(format!(
			"URL too long ({len} chars). Maximum is {MAX_URL_LEN}"
		)));
	}

	let parsed = Url::parse(raw).map_err(|e| BridgeError::InvalidArgument(format!("Invalid URL: {raw} ({e})")))?;
	let insecure_http = match parsed.scheme() {
		"https" => false,
		"http" => !is_loopback(parsed.host()),
		other => {
			return Err(BridgeError::InvalidArgument(format!(
				"Invalid URL protocol: {other}:. Only http:// and https:// are allowed"
			)));
		}
	};

	Ok(NavigationTarget::Url {
		url: raw.to_string(),
		insecure_http,
	})
}

fn is_loopback(host: Option<Host<&str>>) -> bool {
	match host {
		Some(Host::Domain(name)) => name.eq_ignore_ascii_case("localhost"),
		Some(Host::Ipv4(addr)) => addr.octets() == [127, 0, 0, 1],
		Some(Host::Ipv6(addr)) => addr.is_loopback(),
		None => false,
	}
}
