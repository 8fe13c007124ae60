// Queue-dependent visitation of an FST.
//
// The traversal colors states white (undiscovered), grey (discovered,
// unfinished) and black (finished), driven by a pluggable queue discipline
// and an arc filter. Arc cursors are destroyed as soon as they are done, so
// the peak number of live cursors is bounded by the grey frontier.
//
// If any boolean visitor callback returns false, the visit is aborted by
// first calling `finish_state` on every grey state and then
// `finish_visit`.

use weft_core::properties as props;
use weft_core::{Arc, StateId, Weight};

use crate::arcfilter::ArcFilter;
use crate::fst::{count_states, ArcCursor, Fst, MutableFst, StateCursor};
use crate::queue::Queue;

const WHITE: u8 = 0x01;
const GREY: u8 = 0x02;
const BLACK: u8 = 0x04;
/// The state's arc cursor finished and was destroyed.
const ARC_ITER_DONE: u8 = 0x08;

/// Callbacks invoked during a visit. The boolean returns allow early
/// termination.
pub trait Visitor<'a, W: Weight, F: Fst<W>> {
    /// Invoked before the visit.
    fn init_visit(&mut self, fst: &'a F);

    /// Invoked when a state is discovered (second argument is the root of
    /// the current visitation tree).
    fn init_state(&mut self, s: StateId, root: StateId) -> bool;

    /// Invoked when an arc to an undiscovered state is examined.
    fn white_arc(&mut self, s: StateId, arc: &Arc<W>) -> bool;

    /// Invoked when an arc to a discovered, unfinished state is examined.
    fn grey_arc(&mut self, s: StateId, arc: &Arc<W>) -> bool;

    /// Invoked when an arc to a finished state is examined.
    fn black_arc(&mut self, s: StateId, arc: &Arc<W>) -> bool;

    /// Invoked when a state is finished.
    fn finish_state(&mut self, s: StateId);

    /// Invoked after the visit.
    fn finish_visit(&mut self);
}

/// Performs queue-dependent visitation. With `access_only`, only states
/// accessible from the start are visited; otherwise the visit resumes from
/// the next undiscovered state until the (possibly growing) state set is
/// exhausted.
pub fn visit<'a, W, F, V, Q, A>(
    fst: &'a F,
    visitor: &mut V,
    queue: &mut Q,
    filter: &A,
    access_only: bool,
) where
    W: Weight,
    F: Fst<W>,
    V: Visitor<'a, W, F>,
    Q: Queue,
    A: ArcFilter<W>,
{
    visitor.init_visit(fst);

    let Some(start) = fst.start() else {
        visitor.finish_visit();
        return;
    };

    let expanded = fst.properties(props::EXPANDED, false) != 0;
    let mut nstates: StateId = if expanded {
        (count_states(fst) as StateId).max(start + 1)
    } else {
        start + 1
    };

    let mut state_status: Vec<u8> = vec![WHITE; nstates as usize];
    let mut arc_cursors: Vec<Option<F::ArcCursor<'a>>> = Vec::new();
    arc_cursors.resize_with(nstates as usize, || None);
    let mut siter = fst.states();

    let mut keep_going = true;

    // Iterates over the trees of the visit forest. A state whose
    // `init_state` refuses stays white and is never enqueued.
    let mut root = start;
    while keep_going && root < nstates {
        keep_going = visitor.init_state(root, root);
        if keep_going {
            state_status[root as usize] = GREY;
            queue.enqueue(root);
        }

        while let Some(s) = queue.head() {
            if s >= nstates {
                nstates = s + 1;
                state_status.resize(nstates as usize, WHITE);
                arc_cursors.resize_with(nstates as usize, || None);
            }
            let su = s as usize;

            // Create the arc cursor lazily.
            if arc_cursors[su].is_none()
                && state_status[su] & ARC_ITER_DONE == 0
                && keep_going
            {
                arc_cursors[su] = Some(fst.arcs(s));
            }
            // Destroy it as soon as it is done or the visit stopped.
            let cursor_done = arc_cursors[su].as_ref().is_some_and(|c| c.done());
            if cursor_done || !keep_going {
                arc_cursors[su] = None;
                state_status[su] |= ARC_ITER_DONE;
            }
            // Dequeue and blacken a finished state.
            if state_status[su] & ARC_ITER_DONE != 0 {
                queue.dequeue();
                visitor.finish_state(s);
                state_status[su] = BLACK;
                continue;
            }

            let arc = arc_cursors[su]
                .as_ref()
                .expect("live arc cursor")
                .value()
                .clone();
            if arc.nextstate >= nstates {
                nstates = arc.nextstate + 1;
                state_status.resize(nstates as usize, WHITE);
                arc_cursors.resize_with(nstates as usize, || None);
            }

            if filter.keep(&arc) {
                let ns = arc.nextstate as usize;
                if state_status[ns] == WHITE {
                    keep_going = visitor.white_arc(s, &arc);
                    if !keep_going {
                        continue;
                    }
                    keep_going = visitor.init_state(arc.nextstate, root);
                    if keep_going {
                        state_status[ns] = GREY;
                        queue.enqueue(arc.nextstate);
                    }
                } else if state_status[ns] == BLACK {
                    keep_going = visitor.black_arc(s, &arc);
                } else {
                    keep_going = visitor.grey_arc(s, &arc);
                }
            }

            let cursor = arc_cursors[su].as_mut().expect("live arc cursor");
            cursor.next();
            if cursor.done() {
                arc_cursors[su] = None;
                state_status[su] |= ARC_ITER_DONE;
            }
        }

        if access_only {
            break;
        }

        // Find the next white root.
        root = if root == start { 0 } else { root + 1 };
        while root < nstates && state_status[root as usize] != WHITE {
            root += 1;
        }

        // A non-expanded machine may hold states beyond the known range;
        // probe the state cursor one state at a time.
        if !expanded && root == nstates {
            while !siter.done() {
                if siter.value() == nstates {
                    nstates += 1;
                    state_status.push(WHITE);
                    arc_cursors.push(None);
                    break;
                }
                siter.next();
            }
        }
    }

    visitor.finish_visit();
}

/// Replicates the visited machine into a mutable output in discovery
/// order.
pub struct CopyVisitor<'a, W: Weight, F: Fst<W>, M: MutableFst<W>> {
    ifst: Option<&'a F>,
    ofst: &'a mut M,
    _weight: std::marker::PhantomData<W>,
}

impl<'a, W: Weight, F: Fst<W>, M: MutableFst<W>> CopyVisitor<'a, W, F, M> {
    pub fn new(ofst: &'a mut M) -> Self {
        Self {
            ifst: None,
            ofst,
            _weight: std::marker::PhantomData,
        }
    }
}

impl<'a, W: Weight, F: Fst<W>, M: MutableFst<W>> Visitor<'a, W, F>
    for CopyVisitor<'a, W, F, M>
{
    fn init_visit(&mut self, fst: &'a F) {
        self.ifst = Some(fst);
        self.ofst.delete_states();
        if let Some(start) = fst.start() {
            while self.ofst.num_states().unwrap_or(0) <= start as usize {
                self.ofst.add_state();
            }
            self.ofst.set_start(start);
        }
    }

    fn init_state(&mut self, s: StateId, _root: StateId) -> bool {
        while self.ofst.num_states().unwrap_or(0) <= s as usize {
            self.ofst.add_state();
        }
        true
    }

    fn white_arc(&mut self, s: StateId, arc: &Arc<W>) -> bool {
        self.ofst.add_arc(s, arc.clone());
        true
    }

    fn grey_arc(&mut self, s: StateId, arc: &Arc<W>) -> bool {
        self.ofst.add_arc(s, arc.clone());
        true
    }

    fn black_arc(&mut self, s: StateId, arc: &Arc<W>) -> bool {
        self.ofst.add_arc(s, arc.clone());
        true
    }

    fn finish_state(&mut self, s: StateId) {
        let final_weight = self.ifst.expect("visit initialized").final_weight(s);
        while self.ofst.num_states().unwrap_or(0) <= s as usize {
            self.ofst.add_state();
        }
        self.ofst.set_final(s, final_weight);
    }

    fn finish_visit(&mut self) {}
}

/// Visits up to a state limit, counting initialized and finished states.
pub struct PartialVisitor<'a, W: Weight, F: Fst<W>> {
    fst: Option<&'a F>,
    maxvisit: StateId,
    ninit: StateId,
    nfinish: StateId,
    _weight: std::marker::PhantomData<W>,
}

impl<'a, W: Weight, F: Fst<W>> PartialVisitor<'a, W, F> {
    pub fn new(maxvisit: StateId) -> Self {
        Self {
            fst: None,
            maxvisit,
            ninit: 0,
            nfinish: 0,
            _weight: std::marker::PhantomData,
        }
    }

    pub fn num_initialized(&self) -> StateId {
        self.ninit
    }

    pub fn num_finished(&self) -> StateId {
        self.nfinish
    }
}

impl<'a, W: Weight, F: Fst<W>> Visitor<'a, W, F> for PartialVisitor<'a, W, F> {
    fn init_visit(&mut self, fst: &'a F) {
        self.fst = Some(fst);
        self.ninit = 0;
        self.nfinish = 0;
    }

    fn init_state(&mut self, _s: StateId, _root: StateId) -> bool {
        if self.ninit >= self.maxvisit {
            return false;
        }
        self.ninit += 1;
        true
    }

    fn white_arc(&mut self, _s: StateId, _arc: &Arc<W>) -> bool {
        true
    }

    fn grey_arc(&mut self, _s: StateId, _arc: &Arc<W>) -> bool {
        true
    }

    fn black_arc(&mut self, _s: StateId, _arc: &Arc<W>) -> bool {
        true
    }

    fn finish_state(&mut self, s: StateId) {
        // Touch the super-final arc as well.
        self.fst.expect("visit initialized").final_weight(s);
        self.nfinish += 1;
    }

    fn finish_visit(&mut self) {}
}

/// Copies up to a state limit; copying of arcs into grey or black states
/// can be suppressed.
pub struct PartialCopyVisitor<'a, W: Weight, F: Fst<W>, M: MutableFst<W>> {
    copy: CopyVisitor<'a, W, F, M>,
    maxvisit: StateId,
    ninit: StateId,
    nfinish: StateId,
    copy_grey: bool,
    copy_black: bool,
}

impl<'a, W: Weight, F: Fst<W>, M: MutableFst<W>> PartialCopyVisitor<'a, W, F, M> {
    pub fn new(ofst: &'a mut M, maxvisit: StateId, copy_grey: bool, copy_black: bool) -> Self {
        Self {
            copy: CopyVisitor::new(ofst),
            maxvisit,
            ninit: 0,
            nfinish: 0,
            copy_grey,
            copy_black,
        }
    }

    pub fn num_initialized(&self) -> StateId {
        self.ninit
    }

    pub fn num_finished(&self) -> StateId {
        self.nfinish
    }
}

impl<'a, W: Weight, F: Fst<W>, M: MutableFst<W>> Visitor<'a, W, F>
    for PartialCopyVisitor<'a, W, F, M>
{
    fn init_visit(&mut self, fst: &'a F) {
        self.copy.init_visit(fst);
        self.ninit = 0;
        self.nfinish = 0;
    }

    fn init_state(&mut self, s: StateId, root: StateId) -> bool {
        if self.ninit >= self.maxvisit {
            return false;
        }
        self.ninit += 1;
        self.copy.init_state(s, root);
        true
    }

    fn white_arc(&mut self, s: StateId, arc: &Arc<W>) -> bool {
        self.copy.white_arc(s, arc)
    }

    fn grey_arc(&mut self, s: StateId, arc: &Arc<W>) -> bool {
        if self.copy_grey {
            return self.copy.grey_arc(s, arc);
        }
        true
    }

    fn black_arc(&mut self, s: StateId, arc: &Arc<W>) -> bool {
        if self.copy_black {
            return self.copy.black_arc(s, arc);
        }
        true
    }

    fn finish_state(&mut self, s: StateId) {
        self.copy.finish_state(s);
        self.nfinish += 1;
    }

    fn finish_visit(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arcfilter::AnyArcFilter;
    use crate::queue::{FifoQueue, LifoQueue};
    use crate::vector::VectorFst;
    use weft_core::TropicalWeight;

    type W = TropicalWeight;

    /// A chain 0 -> 1 -> ... -> n-1 with the last state final.
    fn chain(n: usize) -> VectorFst<W> {
        let mut fst = VectorFst::new();
        for _ in 0..n {
            fst.add_state();
        }
        fst.set_start(0);
        fst.set_final((n - 1) as StateId, W::one());
        for i in 0..n - 1 {
            let s = i as StateId;
            fst.add_arc(s, Arc::new(1, 1, W::one(), s + 1));
        }
        fst
    }

    /// Records the callback sequence.
    #[derive(Default)]
    struct TraceVisitor {
        events: Vec<String>,
        refuse_at_init: Option<StateId>,
    }

    impl<'a, F: Fst<W>> Visitor<'a, W, F> for TraceVisitor {
        fn init_visit(&mut self, _fst: &'a F) {
            self.events.push("init_visit".to_string());
        }

        fn init_state(&mut self, s: StateId, root: StateId) -> bool {
            self.events.push(format!("init_state({s},{root})"));
            self.refuse_at_init != Some(s)
        }

        fn white_arc(&mut self, s: StateId, arc: &Arc<W>) -> bool {
            self.events.push(format!("white({s}->{})", arc.nextstate));
            true
        }

        fn grey_arc(&mut self, s: StateId, arc: &Arc<W>) -> bool {
            self.events.push(format!("grey({s}->{})", arc.nextstate));
            true
        }

        fn black_arc(&mut self, s: StateId, arc: &Arc<W>) -> bool {
            self.events.push(format!("black({s}->{})", arc.nextstate));
            true
        }

        fn finish_state(&mut self, s: StateId) {
            self.events.push(format!("finish_state({s})"));
        }

        fn finish_visit(&mut self) {
            self.events.push("finish_visit".to_string());
        }
    }

    #[test]
    fn no_start_only_init_and_finish() {
        let fst = VectorFst::<W>::new();
        let mut visitor = TraceVisitor::default();
        let mut queue = FifoQueue::new();
        visit(&fst, &mut visitor, &mut queue, &AnyArcFilter, false);
        assert_eq!(visitor.events, vec!["init_visit", "finish_visit"]);
    }

    #[test]
    fn chain_visits_in_queue_order() {
        let fst = chain(3);
        let mut visitor = TraceVisitor::default();
        let mut queue = FifoQueue::new();
        visit(&fst, &mut visitor, &mut queue, &AnyArcFilter, false);
        assert_eq!(
            visitor.events,
            vec![
                "init_visit",
                "init_state(0,0)",
                "white(0->1)",
                "init_state(1,0)",
                "finish_state(0)",
                "white(1->2)",
                "init_state(2,0)",
                "finish_state(1)",
                "finish_state(2)",
                "finish_visit",
            ]
        );
    }

    #[test]
    fn self_loop_is_grey_arc() {
        let mut fst = chain(2);
        fst.add_arc(0, Arc::new(2, 2, W::one(), 0));
        let mut visitor = TraceVisitor::default();
        let mut queue = FifoQueue::new();
        visit(&fst, &mut visitor, &mut queue, &AnyArcFilter, false);
        assert!(visitor.events.contains(&"grey(0->0)".to_string()));
    }

    #[test]
    fn back_arc_to_finished_state_is_black() {
        // 0 -> 1, 1 -> 0 under LIFO: 0 finishes before 1's arc to it runs?
        // Under FIFO 0 is grey while 1 scans, so use a diamond: 0 -> 1,
        // 0 -> 2, 1 -> ...; simplest: arc from a later tree to a finished
        // state.
        let mut fst = chain(2);
        // Disconnected state 2 with an arc back to the finished chain.
        let s2 = fst.add_state();
        fst.add_arc(s2, Arc::new(5, 5, W::one(), 0));
        let mut visitor = TraceVisitor::default();
        let mut queue = FifoQueue::new();
        visit(&fst, &mut visitor, &mut queue, &AnyArcFilter, false);
        assert!(visitor.events.contains(&"black(2->0)".to_string()));
        // The disconnected state got its own tree root.
        assert!(visitor.events.contains(&"init_state(2,2)".to_string()));
    }

    #[test]
    fn access_only_skips_unreachable_trees() {
        let mut fst = chain(2);
        fst.add_state();
        let mut visitor = TraceVisitor::default();
        let mut queue = FifoQueue::new();
        visit(&fst, &mut visitor, &mut queue, &AnyArcFilter, true);
        assert!(!visitor
            .events
            .iter()
            .any(|e| e.starts_with("init_state(2")));
    }

    #[test]
    fn refusal_drains_grey_states() {
        let fst = chain(4);
        let mut visitor = TraceVisitor {
            refuse_at_init: Some(2),
            ..Default::default()
        };
        let mut queue = FifoQueue::new();
        visit(&fst, &mut visitor, &mut queue, &AnyArcFilter, false);
        // State 1 was grey when state 2 refused; the refused state stays
        // white, and every grey state gets exactly one finish_state before
        // finish_visit.
        let finishes: Vec<_> = visitor
            .events
            .iter()
            .filter(|e| e.starts_with("finish_state"))
            .collect();
        assert_eq!(finishes, vec!["finish_state(0)", "finish_state(1)"]);
        assert!(visitor.events.contains(&"init_state(2,0)".to_string()));
        assert!(!visitor.events.contains(&"finish_state(2)".to_string()));
        assert!(!visitor
            .events
            .iter()
            .any(|e| e.starts_with("init_state(3")));
        assert_eq!(visitor.events.last().unwrap(), "finish_visit");
    }

    #[test]
    fn copy_visitor_replicates_chain() {
        let fst = chain(5);
        let mut out = VectorFst::<W>::new();
        let mut visitor = CopyVisitor::new(&mut out);
        let mut queue = FifoQueue::new();
        visit(&fst, &mut visitor, &mut queue, &AnyArcFilter, false);

        assert_eq!(out.start(), Some(0));
        assert_eq!(out.num_states(), Some(5));
        for s in 0..4 {
            assert_eq!(out.num_arcs(s), Some(1));
            assert_eq!(out.arcs(s).value().nextstate, s + 1);
        }
        assert_eq!(out.final_weight(4), W::one());
        assert_eq!(out.final_weight(0), W::zero());
    }

    #[test]
    fn copy_visitor_with_lifo_queue() {
        let fst = chain(4);
        let mut out = VectorFst::<W>::new();
        let mut visitor = CopyVisitor::new(&mut out);
        let mut queue = LifoQueue::new();
        visit(&fst, &mut visitor, &mut queue, &AnyArcFilter, false);
        // A chain has one traversal order regardless of discipline.
        assert_eq!(out.num_states(), Some(4));
        assert_eq!(out.final_weight(3), W::one());
    }

    #[test]
    fn partial_visitor_caps_initializations() {
        let fst = chain(10);
        let mut visitor = PartialVisitor::new(3);
        let mut queue = FifoQueue::new();
        visit(&fst, &mut visitor, &mut queue, &AnyArcFilter, false);
        assert_eq!(visitor.num_initialized(), 3);
        assert_eq!(visitor.num_finished(), 3);
    }

    #[test]
    fn partial_copy_visitor_caps_output() {
        let fst = chain(10);
        let mut out = VectorFst::<W>::new();
        {
            let mut visitor = PartialCopyVisitor::new(&mut out, 3, true, true);
            let mut queue = FifoQueue::new();
            visit(&fst, &mut visitor, &mut queue, &AnyArcFilter, false);
            assert_eq!(visitor.num_initialized(), 3);
            assert_eq!(visitor.num_finished(), 3);
        }
        assert_eq!(out.num_states(), Some(3));
    }

    #[test]
    fn partial_copy_can_suppress_grey_arcs() {
        let mut fst = chain(2);
        fst.add_arc(0, Arc::new(9, 9, W::one(), 0));
        let mut out = VectorFst::<W>::new();
        {
            let mut visitor = PartialCopyVisitor::new(&mut out, 100, false, true);
            let mut queue = FifoQueue::new();
            visit(&fst, &mut visitor, &mut queue, &AnyArcFilter, false);
        }
        // The self-loop (a grey arc) was not copied.
        assert_eq!(out.num_arcs(0), Some(1));
    }
}
