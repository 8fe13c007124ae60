// The transition record: (input label, output label, weight, next state).

use crate::label::{Label, StateId};
use crate::weight::{Log64Weight, LogWeight, TropicalWeight, Weight};

/// A single transition. Arcs leaving a state are yielded by that state's
/// arc cursor; a super-final arc (synthesized by arc mappers for the final
/// weight) carries `nextstate == NO_STATE_ID`.
#[derive(Debug, Clone, PartialEq)]
pub struct Arc<W: Weight> {
    pub ilabel: Label,
    pub olabel: Label,
    pub weight: W,
    pub nextstate: StateId,
}

impl<W: Weight> Arc<W> {
    pub fn new(ilabel: Label, olabel: Label, weight: W, nextstate: StateId) -> Self {
        Self {
            ilabel,
            olabel,
            weight,
            nextstate,
        }
    }

    /// The arc-type tag for this semiring, e.g. `"standard"`.
    pub fn arc_type() -> &'static str {
        W::ARC_TYPE
    }
}

/// Arc over the tropical semiring; arc type `"standard"`.
pub type StdArc = Arc<TropicalWeight>;

/// Arc over the log semiring; arc type `"log"`.
pub type LogArc = Arc<LogWeight>;

/// Arc over the 64-bit log semiring; arc type `"log64"`.
pub type Log64Arc = Arc<Log64Weight>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction() {
        let arc = StdArc::new(1, 2, TropicalWeight::new(0.5), 3);
        assert_eq!(arc.ilabel, 1);
        assert_eq!(arc.olabel, 2);
        assert_eq!(arc.weight, TropicalWeight::new(0.5));
        assert_eq!(arc.nextstate, 3);
    }

    #[test]
    fn arc_type_tags() {
        assert_eq!(StdArc::arc_type(), "standard");
        assert_eq!(LogArc::arc_type(), "log");
        assert_eq!(Log64Arc::arc_type(), "log64");
    }
}
