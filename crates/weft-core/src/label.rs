// Label and state-id types with their sentinel values.

/// Arc label. `0` is epsilon; negative values below `-1` are reserved for
/// library-private synthetic labels and never appear on public arcs.
pub type Label = i32;

/// State identifier. Non-negative for real states.
pub type StateId = i32;

/// The empty label: no symbol consumed or emitted.
pub const EPSILON: Label = 0;

/// Signals the absence of a label (e.g. a failed encode-table lookup).
pub const NO_LABEL: Label = -1;

/// Signals the absence of a state (e.g. a super-final arc's destination).
pub const NO_STATE_ID: StateId = -1;

/// Label of the synthetic "match anything not otherwise present" arc
/// introduced by the complement operator. Negative, so it is private to
/// the library and preserves label sort order.
pub const RHO_LABEL: Label = -2;

/// True for labels in the library-private reserved band (below `NO_LABEL`).
#[inline]
pub fn is_private_label(label: Label) -> bool {
    label < NO_LABEL
}
