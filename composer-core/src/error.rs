use thiserror::Error;

use crate::model::TypeTag;

/// Errors surfaced by descriptor tree operations.
///
/// Schema-lookup misses are deliberately *not* here: a missing type
/// definition degrades to an empty field list (logged), never a failure.
#[derive(Debug, Error)]
pub enum ComposerError {
    #[error("duplicate child '{id}' under {parent:?}")]
    DuplicateChild { parent: TypeTag, id: String },

    #[error("node '{id}' already has an owner")]
    AlreadyOwned { id: String },

    #[error("node not found in tree")]
    NodeNotFound,

    #[error("no serializer registered for {0:?}")]
    UnsupportedType(TypeTag),

    #[error("incompatible connection: {from:?} -> {to:?}")]
    IncompatibleConnection { from: TypeTag, to: TypeTag },

    #[error("invalid fragment: {0}")]
    InvalidFragment(String),
}

pub type Result<T> = std::result::Result<T, ComposerError>;
