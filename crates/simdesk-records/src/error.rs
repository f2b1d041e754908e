use simdesk_config::OrgType;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordError {
  /// Every code from S0001 to S9999 is taken.
  #[error("customer code sequence exhausted")]
  CodeSequenceExhausted,

  #[error("a {child} cannot have a parent")]
  UnexpectedParent { child: OrgType },

  #[error("a {child} needs a {expected} parent")]
  MissingParent { child: OrgType, expected: OrgType },

  #[error("a {child} needs a {expected} parent, got a {actual}")]
  WrongParentType {
    child: OrgType,
    expected: OrgType,
    actual: OrgType,
  },

  #[error("parent organization not found: {0}")]
  ParentNotFound(String),

  #[error("organization '{name}' still has {children} child organization(s)")]
  HasChildren { name: String, children: usize },

  #[error("unknown customer field: {0}")]
  UnknownField(String),

  #[error("csv error: {0}")]
  Csv(#[from] csv::Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}
