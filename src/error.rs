//! The crate's error type.

use thiserror::Error;

/// The smallest order a [`BTree`][crate::btree::BTree] can be built with.
pub const MIN_BTREE_ORDER: usize = 3;

/// Errors raised by this crate.
///
/// Searching for a missing key, deleting from an empty tree or inserting a
/// duplicate are *not* errors. Those are ordinary outcomes reported through a
/// [`StepTrace`][crate::trace::StepTrace].
#[derive(Debug, Error)]
pub enum TreeError {
    /// A B-Tree was requested with an order that cannot hold a split.
    #[error("b-tree order must be at least {min}, got {order}")]
    InvalidOrder {
        /// The order that was asked for.
        order: usize,
        /// The smallest supported order.
        min: usize,
    },
    /// A structural invariant failed to hold. Only produced by `validate`.
    #[error("invariant violated: {0}")]
    Invariant(String),
    /// A tree kind name that doesn't match any engine.
    #[error("unknown tree kind `{0}`")]
    UnknownKind(String),
    /// A [`TreeConfig`][crate::config::TreeConfig] could not be parsed.
    #[error("invalid tree config: {0}")]
    Config(#[source] serde_json::Error),
    /// A snapshot or trace could not be encoded.
    #[error("failed to serialize: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl TreeError {
    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant(message.into())
    }
}
