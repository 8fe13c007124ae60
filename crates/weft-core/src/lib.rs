//! Shared types for the weft WFST toolkit.
//!
//! This crate holds the plain data vocabulary everything else builds on:
//!
//! - [`label`] -- label and state-id integer types with their sentinels
//! - [`weight`] -- the semiring trait and the tropical/log/log64 weights
//! - [`arc`] -- the transition record
//! - [`properties`] -- the cached property bitset and its transforms
//!
//! The engine, scripting and CLI layers live in the `weft`, `weft-script`
//! and `weft-cli` crates.

pub mod arc;
pub mod label;
pub mod properties;
pub mod weight;

pub use arc::{Arc, Log64Arc, LogArc, StdArc};
pub use label::{Label, StateId, EPSILON, NO_LABEL, NO_STATE_ID, RHO_LABEL};
pub use weight::{Log64Weight, LogWeight, TropicalWeight, Weight};
