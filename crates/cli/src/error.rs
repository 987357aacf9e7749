use thiserror::Error;

pub type Result<T> = std::result::Result<T, BridgeError>;

/// Failures a tool call can report back to the client.
///
/// `Clone` so a single connection attempt can hand the same failure to
/// every caller waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
	/// Bad port, URL or target kind. Retrying with the same input fails again.
	#[error("{0}")]
	InvalidArgument(String),

	/// Target index out of range, or the target has no page.
	#[error("{0}")]
	NotFound(String),

	/// No browser connection after connect, launch and retry.
	#[error("{0}")]
	Connection(String),

	/// The browser rejected or failed an operation.
	#[error("{0}")]
	Upstream(String),
}

impl BridgeError {
	/// Short classification used in logs.
	pub fn kind(&self) -> &'static str {
		match self {
			Self::InvalidArgument(_) => "invalid_argument",
			Self::NotFound(_) => "not_found",
			Self::Connection(_) => "connection",
			Self::Upstream(_) => "upstream",
		}
	}
}

impl From<scm::Error> for BridgeError {
	fn from(err: scm::Error) -> Self {
		Self::Upstream(err.to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn messages_are_passed_through() {
		let err = BridgeError::NotFound("Target index 3 not found.".into());
		assert_eq!(err.to_string(), "Target index 3 not found.");
		assert_eq!(err.kind(), "not_found");
	}

	#[test]
	fn cdp_errors_become_upstream() {
		let err: BridgeError = scm::Error::Navigation {
			url: "https://x.test/".into(),
			reason: "net::ERR_NAME_NOT_RESOLVED".into(),
		}
		.into();
		assert_eq!(
			err,
			BridgeError::Upstream("Navigation to https://x.test/ failed: net::ERR_NAME_NOT_RESOLVED".into())
		);
	}
}
