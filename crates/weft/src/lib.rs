//! Weighted finite-state transducer engine.
//!
//! This crate provides the machine abstractions and algorithms of the weft
//! toolkit:
//!
//! - [`fst`] -- the `Fst`/`MutableFst` traits and the cursor contract
//! - [`vector`] -- the in-memory mutable container and its binary format
//! - [`symbols`] -- label-to-name symbol tables
//! - [`complement`] -- the delayed complement operator (rho completion)
//! - [`arc_map`] -- the arc-mapping substrate, invert, final-epsilon removal
//! - [`encode`] -- encode table, encode mapper, delayed encode/decode FSTs
//! - [`queue`] -- queue disciplines for traversal
//! - [`arcfilter`] -- arc admissibility predicates
//! - [`visit`] -- the queue-driven visit engine and its canonical visitors
//!
//! Delayed machines materialize states and arcs on demand; the visit engine
//! combined with [`visit::CopyVisitor`] turns any of them into a concrete
//! [`vector::VectorFst`].

pub mod arc_map;
pub mod arcfilter;
pub mod complement;
pub mod encode;
pub mod format;
pub mod fst;
pub mod queue;
pub mod symbols;
pub mod vector;
pub mod visit;

pub use weft_core::{
    Arc, Label, Log64Weight, LogWeight, StateId, TropicalWeight, Weight, EPSILON, NO_LABEL,
    NO_STATE_ID, RHO_LABEL,
};

/// Error type for container and table I/O and structural validation.
#[derive(Debug, thiserror::Error)]
pub enum FstError {
    #[error("invalid magic number in {0} header")]
    BadMagic(&'static str),

    #[error("arc type mismatch: expected {expected}, got {actual}")]
    ArcTypeMismatch { expected: String, actual: String },

    #[error("invalid {kind}: {reason}")]
    Invalid {
        kind: &'static str,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
