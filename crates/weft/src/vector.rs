// In-memory mutable FST container and its binary on-disk format.

use std::cell::Cell;
use std::io::{Read, Write};

use bytemuck::{Pod, Zeroable};
use weft_core::properties as props;
use weft_core::{Arc, StateId, Weight, EPSILON, NO_STATE_ID};

use crate::format::{
    read_i32, read_i64, read_string, read_u64, read_u8_flag, write_i32, write_i64, write_string,
    write_u64, write_u8_flag, FST_MAGIC,
};
use crate::fst::{test_properties, ArcCursor, Fst, MutableFst, StateCursor};
use crate::symbols::SymbolTable;
use crate::FstError;

#[derive(Debug, Clone)]
struct VectorState<W: Weight> {
    final_weight: W,
    arcs: Vec<Arc<W>>,
}

/// A materialized FST: a vector of states, each holding its final weight
/// and out-arc list. Always expanded and mutable.
#[derive(Debug)]
pub struct VectorFst<W: Weight> {
    states: Vec<VectorState<W>>,
    start: Option<StateId>,
    properties: Cell<u64>,
    isymbols: Option<SymbolTable>,
    osymbols: Option<SymbolTable>,
}

impl<W: Weight> Default for VectorFst<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Weight> Clone for VectorFst<W> {
    fn clone(&self) -> Self {
        Self {
            states: self.states.clone(),
            start: self.start,
            properties: Cell::new(self.properties.get()),
            isymbols: self.isymbols.clone(),
            osymbols: self.osymbols.clone(),
        }
    }
}

impl<W: Weight> VectorFst<W> {
    pub fn new() -> Self {
        Self {
            states: Vec::new(),
            start: None,
            properties: Cell::new(props::EXPANDED | props::MUTABLE),
            isymbols: None,
            osymbols: None,
        }
    }

    fn state(&self, s: StateId) -> &VectorState<W> {
        &self.states[s as usize]
    }

    /// Keep only the mutation-invariant property bits after a change.
    fn invalidate_properties(&mut self) {
        let kept = self.properties.get() & (props::EXPANDED | props::MUTABLE | props::ERROR);
        self.properties.set(kept);
    }
}

/// Fixed-width arc record of the container format: labels and destination;
/// the weight column follows separately (its width depends on the semiring).
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct RawArc {
    ilabel: i32,
    olabel: i32,
    nextstate: i32,
}

const _: () = assert!(std::mem::size_of::<RawArc>() == 12);

impl<W: Weight> VectorFst<W> {
    /// Serialize: magic, arc type, properties, start, then per state the
    /// final weight, arc count, a packed `RawArc` block, and the weight
    /// column; symbol tables trail behind presence flags.
    pub fn write_to<Wr: Write>(&self, writer: &mut Wr) -> Result<(), FstError> {
        write_i32(writer, FST_MAGIC)?;
        write_string(writer, W::ARC_TYPE)?;
        write_u64(writer, self.properties.get())?;
        write_i32(writer, self.start.unwrap_or(NO_STATE_ID))?;
        write_i64(writer, self.states.len() as i64)?;
        for state in &self.states {
            state.final_weight.write(writer)?;
            write_i64(writer, state.arcs.len() as i64)?;
            let raw: Vec<RawArc> = state
                .arcs
                .iter()
                .map(|a| RawArc {
                    ilabel: a.ilabel,
                    olabel: a.olabel,
                    nextstate: a.nextstate,
                })
                .collect();
            writer.write_all(bytemuck::cast_slice(&raw))?;
            for arc in &state.arcs {
                arc.weight.write(writer)?;
            }
        }
        write_u8_flag(writer, self.isymbols.is_some())?;
        if let Some(syms) = &self.isymbols {
            syms.write(writer)?;
        }
        write_u8_flag(writer, self.osymbols.is_some())?;
        if let Some(syms) = &self.osymbols {
            syms.write(writer)?;
        }
        Ok(())
    }

    /// Deserialize, verifying the magic number and the arc-type tag.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, FstError> {
        if read_i32(reader)? != FST_MAGIC {
            return Err(FstError::BadMagic("FST container"));
        }
        let arc_type = read_string(reader)?;
        if arc_type != W::ARC_TYPE {
            return Err(FstError::ArcTypeMismatch {
                expected: W::ARC_TYPE.to_string(),
                actual: arc_type,
            });
        }
        let properties = read_u64(reader)?;
        let start = read_i32(reader)?;
        let nstates = read_i64(reader)?;
        if nstates < 0 {
            return Err(FstError::Invalid {
                kind: "FST container",
                reason: format!("negative state count {nstates}"),
            });
        }

        let mut states = Vec::with_capacity(nstates as usize);
        for _ in 0..nstates {
            let final_weight = W::read(reader)?;
            let narcs = read_i64(reader)? as usize;
            // Read the packed block into an aligned buffer before casting.
            let mut raw = vec![RawArc::zeroed(); narcs];
            reader.read_exact(bytemuck::cast_slice_mut(&mut raw))?;
            let mut arcs = Vec::with_capacity(narcs);
            for r in &raw {
                arcs.push(Arc::new(r.ilabel, r.olabel, W::one(), r.nextstate));
            }
            for arc in &mut arcs {
                arc.weight = W::read(reader)?;
            }
            states.push(VectorState { final_weight, arcs });
        }

        let isymbols = if read_u8_flag(reader)? {
            Some(SymbolTable::read(reader)?)
        } else {
            None
        };
        let osymbols = if read_u8_flag(reader)? {
            Some(SymbolTable::read(reader)?)
        } else {
            None
        };

        Ok(Self {
            states,
            start: if start == NO_STATE_ID {
                None
            } else {
                Some(start)
            },
            properties: Cell::new(properties | props::EXPANDED | props::MUTABLE),
            isymbols,
            osymbols,
        })
    }

}

/// Read just the arc-type tag from serialized container bytes.
pub fn peek_arc_type<R: Read>(reader: &mut R) -> Result<String, FstError> {
    if read_i32(reader)? != FST_MAGIC {
        return Err(FstError::BadMagic("FST container"));
    }
    Ok(read_string(reader)?)
}

pub struct VectorStateCursor {
    nstates: usize,
    pos: usize,
}

impl StateCursor for VectorStateCursor {
    fn done(&self) -> bool {
        self.pos >= self.nstates
    }

    fn value(&self) -> StateId {
        self.pos as StateId
    }

    fn next(&mut self) {
        self.pos += 1;
    }

    fn reset(&mut self) {
        self.pos = 0;
    }
}

pub struct VectorArcCursor<'a, W: Weight> {
    arcs: &'a [Arc<W>],
    pos: usize,
}

impl<'a, W: Weight> ArcCursor<W> for VectorArcCursor<'a, W> {
    fn done(&self) -> bool {
        self.pos >= self.arcs.len()
    }

    fn value(&self) -> &Arc<W> {
        &self.arcs[self.pos]
    }

    fn next(&mut self) {
        self.pos += 1;
    }

    fn reset(&mut self) {
        self.pos = 0;
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }
}

impl<W: Weight> Fst<W> for VectorFst<W> {
    type StateCursor<'a>
        = VectorStateCursor
    where
        Self: 'a;
    type ArcCursor<'a>
        = VectorArcCursor<'a, W>
    where
        Self: 'a;

    fn start(&self) -> Option<StateId> {
        self.start
    }

    fn final_weight(&self, s: StateId) -> W {
        self.state(s).final_weight.clone()
    }

    fn states(&self) -> VectorStateCursor {
        VectorStateCursor {
            nstates: self.states.len(),
            pos: 0,
        }
    }

    fn arcs(&self, s: StateId) -> VectorArcCursor<'_, W> {
        VectorArcCursor {
            arcs: &self.state(s).arcs,
            pos: 0,
        }
    }

    fn properties(&self, mask: u64, test: bool) -> u64 {
        let (updated, result) = test_properties(self, self.properties.get(), mask, test);
        self.properties.set(updated);
        result
    }

    fn num_states(&self) -> Option<usize> {
        Some(self.states.len())
    }

    fn num_arcs(&self, s: StateId) -> Option<usize> {
        Some(self.state(s).arcs.len())
    }

    fn num_input_epsilons(&self, s: StateId) -> Option<usize> {
        Some(
            self.state(s)
                .arcs
                .iter()
                .filter(|a| a.ilabel == EPSILON)
                .count(),
        )
    }

    fn num_output_epsilons(&self, s: StateId) -> Option<usize> {
        Some(
            self.state(s)
                .arcs
                .iter()
                .filter(|a| a.olabel == EPSILON)
                .count(),
        )
    }

    fn input_symbols(&self) -> Option<&SymbolTable> {
        self.isymbols.as_ref()
    }

    fn output_symbols(&self) -> Option<&SymbolTable> {
        self.osymbols.as_ref()
    }
}

impl<W: Weight> MutableFst<W> for VectorFst<W> {
    fn set_start(&mut self, s: StateId) {
        self.start = Some(s);
        self.invalidate_properties();
    }

    fn set_final(&mut self, s: StateId, weight: W) {
        self.states[s as usize].final_weight = weight;
        self.invalidate_properties();
    }

    fn add_state(&mut self) -> StateId {
        self.states.push(VectorState {
            final_weight: W::zero(),
            arcs: Vec::new(),
        });
        self.invalidate_properties();
        (self.states.len() - 1) as StateId
    }

    fn add_arc(&mut self, s: StateId, arc: Arc<W>) {
        self.states[s as usize].arcs.push(arc);
        self.invalidate_properties();
    }

    fn set_arcs(&mut self, s: StateId, arcs: Vec<Arc<W>>) {
        self.states[s as usize].arcs = arcs;
        self.invalidate_properties();
    }

    fn delete_states(&mut self) {
        self.states.clear();
        self.start = None;
        self.invalidate_properties();
    }

    fn reserve_arcs(&mut self, s: StateId, n: usize) {
        self.states[s as usize].arcs.reserve(n);
    }

    fn set_input_symbols(&mut self, symbols: Option<SymbolTable>) {
        self.isymbols = symbols;
    }

    fn set_output_symbols(&mut self, symbols: Option<SymbolTable>) {
        self.osymbols = symbols;
    }

    fn set_properties(&mut self, properties: u64, mask: u64) {
        let current = self.properties.get();
        self.properties
            .set((current & !mask) | (properties & mask) | props::EXPANDED | props::MUTABLE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_core::TropicalWeight;

    /// Two-state acceptor: 0 --a/0.5--> 1, state 1 final.
    fn two_state() -> VectorFst<TropicalWeight> {
        let mut fst = VectorFst::new();
        let s0 = fst.add_state();
        let s1 = fst.add_state();
        fst.set_start(s0);
        fst.set_final(s1, TropicalWeight::one());
        fst.add_arc(s0, Arc::new(1, 1, TropicalWeight::new(0.5), s1));
        fst
    }

    #[test]
    fn construction_and_access() {
        let fst = two_state();
        assert_eq!(fst.start(), Some(0));
        assert_eq!(fst.num_states(), Some(2));
        assert_eq!(fst.num_arcs(0), Some(1));
        assert_eq!(fst.num_arcs(1), Some(0));
        assert_eq!(fst.final_weight(0), TropicalWeight::zero());
        assert_eq!(fst.final_weight(1), TropicalWeight::one());
    }

    #[test]
    fn arc_cursor_contract() {
        let fst = two_state();
        let mut cursor = fst.arcs(0);
        assert!(!cursor.done());
        assert_eq!(cursor.position(), 0);
        assert_eq!(cursor.value().ilabel, 1);
        cursor.next();
        assert!(cursor.done());
        cursor.reset();
        assert!(!cursor.done());
        cursor.seek(1);
        assert!(cursor.done());
    }

    #[test]
    fn state_cursor_enumerates_all() {
        let fst = two_state();
        let mut seen = Vec::new();
        let mut cursor = fst.states();
        while !cursor.done() {
            seen.push(cursor.value());
            cursor.next();
        }
        assert_eq!(seen, vec![0, 1]);
    }

    #[test]
    fn independent_concurrent_cursors() {
        let fst = two_state();
        let mut a = fst.arcs(0);
        let mut b = fst.arcs(0);
        a.next();
        assert!(a.done());
        assert!(!b.done());
        b.next();
        assert!(b.done());
    }

    #[test]
    fn properties_computed_on_demand() {
        let fst = two_state();
        let mask = props::ACCEPTOR | props::UNWEIGHTED | props::I_DETERMINISTIC;
        // Untested: unknown, nothing reported.
        assert_eq!(fst.properties(props::ACCEPTOR, false), 0);
        let tested = fst.properties(mask, true);
        assert_ne!(tested & props::ACCEPTOR, 0);
        assert_ne!(tested & props::I_DETERMINISTIC, 0);
        // 0.5-weighted arc: not unweighted.
        assert_eq!(tested & props::UNWEIGHTED, 0);
        // Now cached without testing.
        assert_ne!(fst.properties(props::ACCEPTOR, false), 0);
    }

    #[test]
    fn mutation_invalidates_properties() {
        let mut fst = two_state();
        fst.properties(props::ACCEPTOR, true);
        fst.add_arc(0, Arc::new(2, 3, TropicalWeight::one(), 1));
        assert_eq!(fst.properties(props::ACCEPTOR, false), 0);
        assert_eq!(
            fst.properties(props::ACCEPTOR | props::NOT_ACCEPTOR, true),
            props::NOT_ACCEPTOR
        );
    }

    #[test]
    fn binary_round_trip() {
        let mut fst = two_state();
        let mut syms = SymbolTable::new("in");
        syms.add_symbol("<eps>");
        syms.add_symbol("a");
        fst.set_input_symbols(Some(syms));

        let mut buf = Vec::new();
        fst.write_to(&mut buf).unwrap();
        let back = VectorFst::<TropicalWeight>::read_from(&mut buf.as_slice()).unwrap();

        assert_eq!(back.start(), fst.start());
        assert_eq!(back.num_states(), fst.num_states());
        assert_eq!(back.final_weight(1), fst.final_weight(1));
        let mut cursor = back.arcs(0);
        assert_eq!(
            cursor.value(),
            &Arc::new(1, 1, TropicalWeight::new(0.5), 1)
        );
        cursor.next();
        assert!(cursor.done());
        assert_eq!(back.input_symbols().unwrap().find(1), Some("a"));
        assert!(back.output_symbols().is_none());
    }

    #[test]
    fn read_rejects_bad_magic() {
        let mut buf = Vec::new();
        two_state().write_to(&mut buf).unwrap();
        buf[0] ^= 0x40;
        assert!(matches!(
            VectorFst::<TropicalWeight>::read_from(&mut buf.as_slice()),
            Err(FstError::BadMagic(_))
        ));
    }

    #[test]
    fn read_rejects_wrong_arc_type() {
        let mut buf = Vec::new();
        two_state().write_to(&mut buf).unwrap();
        assert!(matches!(
            VectorFst::<weft_core::LogWeight>::read_from(&mut buf.as_slice()),
            Err(FstError::ArcTypeMismatch { .. })
        ));
    }

    #[test]
    fn peek_arc_type_reads_tag() {
        let mut buf = Vec::new();
        two_state().write_to(&mut buf).unwrap();
        assert_eq!(peek_arc_type(&mut buf.as_slice()).unwrap(), "standard");
    }
}
