// Delayed complement of an unweighted deterministic acceptor.
//
// The algorithm completes the machine and exchanges final and non-final
// states. Completion, ensuring every label can be read from every state, is
// expressed with RHO labels, which match all labels not otherwise found
// leaving a state. Output state 0 is a new state that is the destination of
// all rho arcs; every remaining output state s corresponds to input state
// s - 1. The first arc at each state is the rho arc, the remaining arcs are
// the input arcs with shifted destinations.
//
// The rho label is private to the library: operators that consume
// complement output interpret it, user code never observes it.

use std::cell::Cell;
use std::rc::Rc;

use weft_core::properties as props;
use weft_core::{Arc, StateId, Weight, RHO_LABEL};

use crate::fst::{test_properties, ArcCursor, Fst, StateCursor};
use crate::symbols::SymbolTable;

struct ComplementImpl<W: Weight, F: Fst<W>> {
    fst: F,
    properties: Cell<u64>,
    _weight: std::marker::PhantomData<W>,
}

/// Delayed complement. States and arcs are computed on demand from the
/// source machine; copies share the implementation (use
/// [`safe_copy`](ComplementFst::safe_copy) before handing one to another
/// thread).
///
/// The source must be an unweighted, epsilon-free, input-deterministic
/// acceptor; otherwise the `ERROR` property is set and surfaces on every
/// subsequent query.
pub struct ComplementFst<W: Weight, F: Fst<W>> {
    imp: Rc<ComplementImpl<W, F>>,
}

impl<W: Weight, F: Fst<W>> ComplementFst<W, F> {
    pub fn new(fst: F) -> Self {
        let required =
            props::UNWEIGHTED | props::NO_EPSILONS | props::I_DETERMINISTIC | props::ACCEPTOR;
        let tested = fst.properties(required, true);
        let mut properties =
            props::complement_properties(fst.properties(props::ERROR, false));
        if tested != required {
            properties |= props::ERROR;
        }
        Self {
            imp: Rc::new(ComplementImpl {
                fst,
                properties: Cell::new(properties),
                _weight: std::marker::PhantomData,
            }),
        }
    }

    fn rho_arc() -> Arc<W> {
        Arc::new(RHO_LABEL, RHO_LABEL, W::one(), 0)
    }
}

/// Light copy: shares the implementation.
impl<W: Weight, F: Fst<W>> Clone for ComplementFst<W, F> {
    fn clone(&self) -> Self {
        Self {
            imp: Rc::clone(&self.imp),
        }
    }
}

impl<W: Weight, F: Fst<W> + Clone> ComplementFst<W, F> {
    /// Deep copy: clones the implementation. Required before the copy is
    /// used independently of this handle's lifetime assumptions.
    pub fn safe_copy(&self) -> Self {
        Self {
            imp: Rc::new(ComplementImpl {
                fst: self.imp.fst.clone(),
                properties: Cell::new(self.imp.properties.get()),
                _weight: std::marker::PhantomData,
            }),
        }
    }
}

pub struct ComplementStateCursor<'a, W: Weight, F: Fst<W> + 'a> {
    siter: <F as Fst<W>>::StateCursor<'a>,
    s: StateId,
}

impl<'a, W: Weight, F: Fst<W>> StateCursor for ComplementStateCursor<'a, W, F> {
    fn done(&self) -> bool {
        self.s > 0 && self.siter.done()
    }

    fn value(&self) -> StateId {
        self.s
    }

    fn next(&mut self) {
        if self.s != 0 {
            self.siter.next();
        }
        self.s += 1;
    }

    fn reset(&mut self) {
        self.siter.reset();
        self.s = 0;
    }
}

pub struct ComplementArcCursor<'a, W: Weight, F: Fst<W> + 'a> {
    /// Underlying cursor over the source state's arcs; absent for the sink.
    aiter: Option<<F as Fst<W>>::ArcCursor<'a>>,
    pos: usize,
    arc: Arc<W>,
}

impl<'a, W: Weight, F: Fst<W>> ComplementArcCursor<'a, W, F> {
    /// Refresh the arc slot for the current position.
    fn update(&mut self) {
        if self.pos == 0 {
            self.arc = ComplementFst::<W, F>::rho_arc();
        } else if let Some(aiter) = &self.aiter {
            if !aiter.done() {
                let mut arc = aiter.value().clone();
                arc.nextstate += 1;
                self.arc = arc;
            }
        }
    }
}

impl<'a, W: Weight, F: Fst<W>> ArcCursor<W> for ComplementArcCursor<'a, W, F> {
    fn done(&self) -> bool {
        match &self.aiter {
            Some(aiter) => self.pos > 0 && aiter.done(),
            None => self.pos > 0,
        }
    }

    fn value(&self) -> &Arc<W> {
        &self.arc
    }

    fn next(&mut self) {
        if self.pos > 0 {
            if let Some(aiter) = &mut self.aiter {
                aiter.next();
            }
        }
        self.pos += 1;
        self.update();
    }

    fn reset(&mut self) {
        if let Some(aiter) = &mut self.aiter {
            aiter.reset();
        }
        self.pos = 0;
        self.update();
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn seek(&mut self, pos: usize) {
        if let Some(aiter) = &mut self.aiter {
            if pos == 0 {
                aiter.reset();
            } else {
                aiter.seek(pos - 1);
            }
        }
        self.pos = pos;
        self.update();
    }
}

impl<W: Weight, F: Fst<W>> Fst<W> for ComplementFst<W, F> {
    type StateCursor<'a>
        = ComplementStateCursor<'a, W, F>
    where
        Self: 'a;
    type ArcCursor<'a>
        = ComplementArcCursor<'a, W, F>
    where
        Self: 'a;

    fn start(&self) -> Option<StateId> {
        if self.properties(props::ERROR, false) != 0 {
            return None;
        }
        match self.imp.fst.start() {
            Some(s) => Some(s + 1),
            None => Some(0),
        }
    }

    /// Exchange final and non-final states; the rho destination is final.
    fn final_weight(&self, s: StateId) -> W {
        if s == 0 || self.imp.fst.final_weight(s - 1) == W::zero() {
            W::one()
        } else {
            W::zero()
        }
    }

    fn states(&self) -> ComplementStateCursor<'_, W, F> {
        ComplementStateCursor {
            siter: self.imp.fst.states(),
            s: 0,
        }
    }

    fn arcs(&self, s: StateId) -> ComplementArcCursor<'_, W, F> {
        let mut cursor = ComplementArcCursor {
            aiter: if s != 0 {
                Some(self.imp.fst.arcs(s - 1))
            } else {
                None
            },
            pos: 0,
            arc: Self::rho_arc(),
        };
        cursor.update();
        cursor
    }

    fn properties(&self, mask: u64, test: bool) -> u64 {
        if mask & props::ERROR != 0 && self.imp.fst.properties(props::ERROR, false) != 0 {
            self.imp
                .properties
                .set(self.imp.properties.get() | props::ERROR);
        }
        let (updated, result) = test_properties(self, self.imp.properties.get(), mask, test);
        self.imp.properties.set(updated);
        result
    }

    fn num_arcs(&self, s: StateId) -> Option<usize> {
        if s == 0 {
            Some(1)
        } else {
            self.imp.fst.num_arcs(s - 1).map(|n| n + 1)
        }
    }

    fn num_input_epsilons(&self, s: StateId) -> Option<usize> {
        if s == 0 {
            Some(0)
        } else {
            self.imp.fst.num_input_epsilons(s - 1)
        }
    }

    fn num_output_epsilons(&self, s: StateId) -> Option<usize> {
        if s == 0 {
            Some(0)
        } else {
            self.imp.fst.num_output_epsilons(s - 1)
        }
    }

    fn input_symbols(&self) -> Option<&SymbolTable> {
        self.imp.fst.input_symbols()
    }

    fn output_symbols(&self) -> Option<&SymbolTable> {
        self.imp.fst.output_symbols()
    }
}
