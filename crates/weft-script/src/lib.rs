//! Dynamic-dispatch layer over the weft engine.
//!
//! CLIs do not know arc types at compile time. This crate wraps typed
//! machines behind type-erased handles and routes operations through a
//! process-wide registry:
//!
//! - [`fst_class`] -- `FstClass`/`MutableFstClass` type-erased handles
//! - [`registry`] -- the `(operation, arc type)` registry and `apply`
//! - [`ops`] -- built-in operation bodies and their client-facing wrappers
//! - [`extension`] -- loadable arc-type providers for unknown arc types
//!
//! Registrations are append-only and publication-safe; built-in arc types
//! (`standard`, `log`, `log64`) and operations register on first use.

pub mod extension;
pub mod fst_class;
pub mod ops;
pub mod registry;

pub use fst_class::{FstClass, MutableFstClass};
pub use ops::QueueKind;

use weft::FstError;

/// Error type of the dispatch layer.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("no operation {op} registered for arc type {arc_type}")]
    OperationNotFound { op: String, arc_type: String },

    #[error("arguments with non-matching arc types passed to {op}: {left} and {right}")]
    ArcTypeMismatch {
        op: String,
        left: String,
        right: String,
    },

    #[error("unknown arc type: {0}")]
    UnknownArcType(String),

    #[error("unknown queue discipline: {0}")]
    UnknownQueue(String),

    #[error(transparent)]
    Fst(#[from] FstError),
}
