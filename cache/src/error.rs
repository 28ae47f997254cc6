use thiserror::Error;

/// Errors that can occur when configuring an `ItemStorageManager`.
///
/// Every variant is fatal: the store must not start without valid bounds.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
  /// A required size limit was not supplied.
  #[error("missing required storage limit '{0}'")]
  Missing(&'static str),

  /// A size limit was configured as zero.
  #[error("storage limit '{field}' must be a positive number of bytes")]
  NonPositive { field: &'static str },

  /// A warning threshold lies outside `(0, 1]`.
  #[error("warning threshold '{field}' must lie in (0, 1], got {value}")]
  Threshold { field: &'static str, value: f64 },

  /// The configuration document could not be parsed.
  #[error("failed to parse storage configuration: {0}")]
  Parse(String),
}

/// Raised when an `IndirectionList` finds its own link structure inconsistent.
///
/// This is never a recoverable condition. The list that reported it should be
/// considered corrupt and the owning store shut down.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("indirection list {list} is corrupt: {reason}")]
pub struct InvariantError {
  list: u64,
  reason: &'static str,
}

impl InvariantError {
  pub(crate) fn new(list: u64, reason: &'static str) -> Self {
    tracing::error!(list, reason, "indirection list invariant violated");
    Self { list, reason }
  }

  /// The id of the list that detected the violation.
  pub fn list_id(&self) -> u64 {
    self.list
  }

  /// A short description of which invariant failed.
  pub fn reason(&self) -> &'static str {
    self.reason
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn config_error_messages_name_the_field() {
    let err = ConfigError::NonPositive {
      field: "stored_max_bytes",
    };
    assert!(err.to_string().contains("stored_max_bytes"));
    assert!(ConfigError::Missing("unstored_max_bytes")
      .to_string()
      .contains("unstored_max_bytes"));
  }

  #[test]
  fn invariant_error_exposes_list_and_reason() {
    let err = InvariantError::new(7, "head has a predecessor");
    assert_eq!(err.list_id(), 7);
    assert_eq!(err.reason(), "head has a predecessor");
    assert_eq!(
      err.to_string(),
      "indirection list 7 is corrupt: head has a predecessor"
    );
  }
}
