// Arc admissibility predicates for traversal.

use weft_core::{Arc, Weight, EPSILON};

/// Decides which arcs a traversal considers.
pub trait ArcFilter<W: Weight> {
    fn keep(&self, arc: &Arc<W>) -> bool;
}

/// Keeps every arc.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyArcFilter;

impl<W: Weight> ArcFilter<W> for AnyArcFilter {
    fn keep(&self, _arc: &Arc<W>) -> bool {
        true
    }
}

/// Keeps only arcs with epsilon on both sides.
#[derive(Debug, Clone, Copy, Default)]
pub struct EpsilonArcFilter;

impl<W: Weight> ArcFilter<W> for EpsilonArcFilter {
    fn keep(&self, arc: &Arc<W>) -> bool {
        arc.ilabel == EPSILON && arc.olabel == EPSILON
    }
}

/// Keeps only arcs with an epsilon input label.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputEpsilonArcFilter;

impl<W: Weight> ArcFilter<W> for InputEpsilonArcFilter {
    fn keep(&self, arc: &Arc<W>) -> bool {
        arc.ilabel == EPSILON
    }
}
