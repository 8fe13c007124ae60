// Arc-mapping substrate: apply a per-arc transform to a mutable machine,
// including final weights (presented to the mapper as super-final arcs) and
// symbol-table actions.

use weft_core::properties as props;
use weft_core::{Arc, StateId, Weight, EPSILON, NO_STATE_ID};

use crate::fst::{ArcCursor, Fst, MutableFst};

/// What an arc mapper requires of final weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapFinalAction {
    /// Final weights stay in place; the mapper sees them as super-final
    /// arcs `(0, 0, w, NO_STATE_ID)` and must return super-final arcs.
    NoSuperfinal,
    /// Every non-Zero final weight is materialized as an arc to a single
    /// added super-final state (needed when the map must make final
    /// weights unique, e.g. weight encoding).
    RequireSuperfinal,
}

/// What an arc mapper does to the machine's symbol tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapSymbolsAction {
    /// Leave the tables alone.
    KeepSymbols,
    /// Remove the tables (the mapped labels are synthetic).
    ClearSymbols,
}

/// A per-arc transform applied by [`arc_map`] and the delayed map facades.
pub trait ArcMapper<W: Weight> {
    fn map_arc(&self, arc: &Arc<W>) -> Arc<W>;

    fn final_action(&self) -> MapFinalAction {
        MapFinalAction::NoSuperfinal
    }

    fn input_symbols_action(&self) -> MapSymbolsAction {
        MapSymbolsAction::KeepSymbols
    }

    fn output_symbols_action(&self) -> MapSymbolsAction {
        MapSymbolsAction::KeepSymbols
    }

    /// Property bits guaranteed for the output, given the input's bits.
    fn map_properties(&self, inprops: u64) -> u64;
}

/// Apply a mapper to every arc and final weight of `fst`, in place.
pub fn arc_map<W: Weight, F: MutableFst<W>, M: ArcMapper<W>>(fst: &mut F, mapper: &M) {
    let inprops = fst.properties(props::FST_PROPERTIES, false);
    let nstates = fst.num_states().unwrap_or(0) as StateId;

    if mapper.input_symbols_action() == MapSymbolsAction::ClearSymbols {
        fst.set_input_symbols(None);
    }
    if mapper.output_symbols_action() == MapSymbolsAction::ClearSymbols {
        fst.set_output_symbols(None);
    }

    let superfinal = match mapper.final_action() {
        MapFinalAction::NoSuperfinal => None,
        MapFinalAction::RequireSuperfinal => {
            let s = fst.add_state();
            fst.set_final(s, W::one());
            Some(s)
        }
    };

    for s in 0..nstates {
        let mut arcs = Vec::with_capacity(fst.num_arcs(s).unwrap_or(0));
        let mut cursor = fst.arcs(s);
        while !cursor.done() {
            arcs.push(mapper.map_arc(cursor.value()));
            cursor.next();
        }
        drop(cursor);
        fst.set_arcs(s, arcs);

        let final_arc = Arc::new(EPSILON, EPSILON, fst.final_weight(s), NO_STATE_ID);
        match superfinal {
            None => {
                let mapped = mapper.map_arc(&final_arc);
                fst.set_final(s, mapped.weight);
            }
            Some(superfinal) => {
                let mapped = mapper.map_arc(&final_arc);
                if mapped.ilabel != EPSILON
                    || mapped.olabel != EPSILON
                    || mapped.weight != W::zero()
                {
                    fst.add_arc(
                        s,
                        Arc::new(mapped.ilabel, mapped.olabel, mapped.weight, superfinal),
                    );
                }
                fst.set_final(s, W::zero());
            }
        }
    }

    fst.set_properties(mapper.map_properties(inprops), props::FST_PROPERTIES);
}

/// Swaps input and output labels.
pub struct InvertMapper;

impl<W: Weight> ArcMapper<W> for InvertMapper {
    fn map_arc(&self, arc: &Arc<W>) -> Arc<W> {
        Arc::new(arc.olabel, arc.ilabel, arc.weight.clone(), arc.nextstate)
    }

    fn map_properties(&self, inprops: u64) -> u64 {
        props::invert_properties(inprops)
    }
}

/// Invert a transduction in place: swap arc labels and symbol tables.
pub fn invert<W: Weight, F: MutableFst<W>>(fst: &mut F) {
    let isymbols = fst.input_symbols().cloned();
    let osymbols = fst.output_symbols().cloned();
    arc_map(fst, &InvertMapper);
    fst.set_input_symbols(osymbols);
    fst.set_output_symbols(isymbols);
}

/// Collapse final-epsilon arcs: an epsilon arc into an arcless final state
/// folds that state's final weight back into the predecessor's. Undoes the
/// super-final states introduced by weight encoding.
pub fn rm_final_epsilon<W: Weight, F: MutableFst<W>>(fst: &mut F) {
    let nstates = fst.num_states().unwrap_or(0) as StateId;

    // States reachable only as final sinks: final weight, no out-arcs.
    let mut is_sink = vec![false; nstates as usize];
    for s in 0..nstates {
        if fst.num_arcs(s) == Some(0) && fst.final_weight(s) != W::zero() {
            is_sink[s as usize] = true;
        }
    }

    for s in 0..nstates {
        let mut folded = fst.final_weight(s);
        let mut kept = Vec::new();
        let mut changed = false;
        let mut cursor = fst.arcs(s);
        while !cursor.done() {
            let arc = cursor.value();
            if arc.ilabel == EPSILON
                && arc.olabel == EPSILON
                && arc.nextstate >= 0
                && is_sink[arc.nextstate as usize]
            {
                let sink_final = fst.final_weight(arc.nextstate);
                folded = folded.plus(&arc.weight.times(&sink_final));
                changed = true;
            } else {
                kept.push(arc.clone());
            }
            cursor.next();
        }
        drop(cursor);
        if changed {
            fst.set_arcs(s, kept);
            fst.set_final(s, folded);
        }
    }
}
