// The Fst/MutableFst traits, the cursor contract, and on-demand property
// computation.

use hashbrown::HashSet;
use weft_core::properties as props;
use weft_core::{Arc, Label, StateId, Weight, EPSILON};

use crate::symbols::SymbolTable;

/// Restartable cursor over the states of a machine. Yields every state
/// exactly once; the order is unspecified but stable for a given cursor.
pub trait StateCursor {
    fn done(&self) -> bool;
    fn value(&self) -> StateId;
    fn next(&mut self);
    fn reset(&mut self);
}

/// Restartable cursor over the out-arcs of a fixed state, in a stable
/// order. `value` may only be called while `!done()`; the returned view is
/// valid until the next cursor operation.
pub trait ArcCursor<W: Weight> {
    fn done(&self) -> bool;
    fn value(&self) -> &Arc<W>;
    fn next(&mut self);
    fn reset(&mut self);
    fn position(&self) -> usize;
    fn seek(&mut self, pos: usize);
}

/// Read-only view of a weighted finite-state transducer.
///
/// Delayed machines compute states and arcs on demand and typically return
/// `None` from the counting methods; a machine whose `EXPANDED` property is
/// set promises O(1) counts.
pub trait Fst<W: Weight> {
    type StateCursor<'a>: StateCursor
    where
        Self: 'a;
    type ArcCursor<'a>: ArcCursor<W>
    where
        Self: 'a;

    /// Initial state, if any.
    fn start(&self) -> Option<StateId>;

    /// Final weight of a state; `Weight::zero()` means non-final.
    fn final_weight(&self, s: StateId) -> W;

    fn states(&self) -> Self::StateCursor<'_>;

    fn arcs(&self, s: StateId) -> Self::ArcCursor<'_>;

    /// Property bits restricted to `mask`. With `test` set, unknown
    /// tri-state bits requested by the mask may be computed (and cached)
    /// by scanning the machine.
    fn properties(&self, mask: u64, test: bool) -> u64;

    /// State count; `Some` iff the machine is expanded.
    fn num_states(&self) -> Option<usize> {
        None
    }

    /// Out-arc count of a state; `Some` iff cheaply known.
    fn num_arcs(&self, _s: StateId) -> Option<usize> {
        None
    }

    fn num_input_epsilons(&self, _s: StateId) -> Option<usize> {
        None
    }

    fn num_output_epsilons(&self, _s: StateId) -> Option<usize> {
        None
    }

    fn input_symbols(&self) -> Option<&SymbolTable> {
        None
    }

    fn output_symbols(&self) -> Option<&SymbolTable> {
        None
    }

    /// Arc-type tag, e.g. `"standard"`.
    fn arc_type(&self) -> &'static str {
        W::ARC_TYPE
    }
}

/// A machine supporting in-place mutation. Mutation invalidates cached
/// property bits beyond the mutation-invariant mask.
pub trait MutableFst<W: Weight>: Fst<W> {
    fn set_start(&mut self, s: StateId);

    fn set_final(&mut self, s: StateId, weight: W);

    /// Add a state and return its id (states are numbered densely from 0).
    fn add_state(&mut self) -> StateId;

    fn add_arc(&mut self, s: StateId, arc: Arc<W>);

    /// Replace every out-arc of `s`.
    fn set_arcs(&mut self, s: StateId, arcs: Vec<Arc<W>>);

    /// Remove all states, arcs and the start designation.
    fn delete_states(&mut self);

    fn reserve_arcs(&mut self, _s: StateId, _n: usize) {}

    fn set_input_symbols(&mut self, symbols: Option<SymbolTable>);

    fn set_output_symbols(&mut self, symbols: Option<SymbolTable>);

    /// Overwrite the property bits selected by `mask`.
    fn set_properties(&mut self, properties: u64, mask: u64);
}

/// Number of states, counting through the state cursor when the machine is
/// not expanded.
pub fn count_states<W: Weight, F: Fst<W> + ?Sized>(fst: &F) -> usize {
    if let Some(n) = fst.num_states() {
        return n;
    }
    let mut n = 0;
    let mut cursor = fst.states();
    while !cursor.done() {
        n += 1;
        cursor.next();
    }
    n
}

/// Decide every scannable tri-state property pair by a single pass over
/// states and arcs. Returns bits from `SCANNABLE_PROPERTIES` only.
pub fn compute_properties<W: Weight, F: Fst<W> + ?Sized>(fst: &F) -> u64 {
    let mut acceptor = true;
    let mut i_deterministic = true;
    let mut o_deterministic = true;
    let mut epsilons = false;
    let mut i_epsilons = false;
    let mut o_epsilons = false;
    let mut i_sorted = true;
    let mut o_sorted = true;
    let mut weighted = false;

    let mut ilabels: HashSet<Label> = HashSet::new();
    let mut olabels: HashSet<Label> = HashSet::new();

    let mut siter = fst.states();
    while !siter.done() {
        let s = siter.value();

        let final_weight = fst.final_weight(s);
        if final_weight != W::zero() && final_weight != W::one() {
            weighted = true;
        }

        ilabels.clear();
        olabels.clear();
        let mut prev_ilabel: Option<Label> = None;
        let mut prev_olabel: Option<Label> = None;

        let mut aiter = fst.arcs(s);
        while !aiter.done() {
            let arc = aiter.value();
            if arc.ilabel != arc.olabel {
                acceptor = false;
            }
            if arc.ilabel == EPSILON {
                i_epsilons = true;
                if arc.olabel == EPSILON {
                    epsilons = true;
                }
            }
            if arc.olabel == EPSILON {
                o_epsilons = true;
            }
            if !ilabels.insert(arc.ilabel) {
                i_deterministic = false;
            }
            if !olabels.insert(arc.olabel) {
                o_deterministic = false;
            }
            if prev_ilabel.is_some_and(|p| p > arc.ilabel) {
                i_sorted = false;
            }
            if prev_olabel.is_some_and(|p| p > arc.olabel) {
                o_sorted = false;
            }
            if arc.weight != W::one() {
                weighted = true;
            }
            prev_ilabel = Some(arc.ilabel);
            prev_olabel = Some(arc.olabel);
            aiter.next();
        }
        siter.next();
    }

    let mut out = 0;
    out |= if acceptor {
        props::ACCEPTOR
    } else {
        props::NOT_ACCEPTOR
    };
    out |= if i_deterministic {
        props::I_DETERMINISTIC
    } else {
        props::NON_I_DETERMINISTIC
    };
    out |= if o_deterministic {
        props::O_DETERMINISTIC
    } else {
        props::NON_O_DETERMINISTIC
    };
    out |= if epsilons {
        props::EPSILONS
    } else {
        props::NO_EPSILONS
    };
    out |= if i_epsilons {
        props::I_EPSILONS
    } else {
        props::NO_I_EPSILONS
    };
    out |= if o_epsilons {
        props::O_EPSILONS
    } else {
        props::NO_O_EPSILONS
    };
    out |= if i_sorted {
        props::I_LABEL_SORTED
    } else {
        props::NOT_I_LABEL_SORTED
    };
    out |= if o_sorted {
        props::O_LABEL_SORTED
    } else {
        props::NOT_O_LABEL_SORTED
    };
    out |= if weighted {
        props::WEIGHTED
    } else {
        props::UNWEIGHTED
    };
    out
}

/// Shared `properties(mask, test)` logic: fill unknown scannable bits from
/// a scan when testing is requested. Returns the updated stored bits and
/// the masked result.
pub fn test_properties<W: Weight, F: Fst<W> + ?Sized>(
    fst: &F,
    stored: u64,
    mask: u64,
    test: bool,
) -> (u64, u64) {
    if test && !props::known_properties(stored, mask & props::SCANNABLE_PROPERTIES) {
        let computed = compute_properties(fst);
        let updated = stored | computed;
        (updated, updated & mask)
    } else {
        (stored, stored & mask)
    }
}
