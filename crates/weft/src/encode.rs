// Encoding and decoding of arcs: hash-consing (ilabel, olabel, weight)
// tuples into dense labels so weighted transducers can be handled by
// classical acceptor algorithms, then decoded back.
//
// The table is shared (and reference counted) between encoder and decoder,
// so labels added while a lazy pipeline is still being traversed remain
// decodable: encode -> determinize -> decode works even when the encoding
// is incomplete at decode-construction time.

use std::cell::{Cell, RefCell};
use std::io::{Read, Write};
use std::rc::Rc;

use hashbrown::HashMap;
use weft_core::properties as props;
use weft_core::{Arc, Label, StateId, Weight, EPSILON, NO_LABEL, NO_STATE_ID};

use crate::arc_map::{ArcMapper, MapFinalAction, MapSymbolsAction};
use crate::format::{
    read_i32, read_i64, read_u32, write_i32, write_i64, write_u32, ENCODE_TABLE_MAGIC,
};
use crate::fst::{test_properties, ArcCursor, Fst, MutableFst, StateCursor};
use crate::symbols::SymbolTable;
use crate::FstError;

/// Key on input and output labels.
pub const ENCODE_LABELS: u32 = 0x0001;
/// Key on the arc weight.
pub const ENCODE_WEIGHTS: u32 = 0x0002;
/// All caller-selectable flags.
pub const ENCODE_FLAGS: u32 = 0x0003;

// Internal flags recording which symbol tables a table carries on disk.
const ENCODE_HAS_ISYMBOLS: u32 = 0x0004;
const ENCODE_HAS_OSYMBOLS: u32 = 0x0008;

/// Mapping direction of an [`EncodeMapper`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeType {
    Encode,
    Decode,
}

/// The encoded payload of one dense label: the flag-selected arc fields,
/// with unselected fields held at their canonical values.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeTuple<W: Weight> {
    pub ilabel: Label,
    pub olabel: Label,
    pub weight: W,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TupleKey {
    ilabel: Label,
    olabel: Label,
    weight_hash: u64,
}

/// Bidirectional map between flag-selected arc tuples and dense labels
/// starting at 1. Append-only: entries never renumber, and equal tuples
/// (under the flag mask) always receive the same label.
pub struct EncodeTable<W: Weight> {
    flags: u32,
    tuples: Vec<EncodeTuple<W>>,
    index: HashMap<TupleKey, Label>,
    isymbols: Option<SymbolTable>,
    osymbols: Option<SymbolTable>,
}

impl<W: Weight> EncodeTable<W> {
    pub fn new(flags: u32) -> Self {
        Self {
            flags,
            tuples: Vec::new(),
            index: HashMap::new(),
            isymbols: None,
            osymbols: None,
        }
    }

    /// Canonical tuple of an arc under this table's flags: unselected
    /// fields are replaced by their canonical values.
    fn tuple_of(&self, arc: &Arc<W>) -> EncodeTuple<W> {
        EncodeTuple {
            ilabel: arc.ilabel,
            olabel: if self.flags & ENCODE_LABELS != 0 {
                arc.olabel
            } else {
                EPSILON
            },
            weight: if self.flags & ENCODE_WEIGHTS != 0 {
                arc.weight.clone()
            } else {
                W::one()
            },
        }
    }

    fn key_of(tuple: &EncodeTuple<W>) -> TupleKey {
        TupleKey {
            ilabel: tuple.ilabel,
            olabel: tuple.olabel,
            weight_hash: tuple.weight.hash(),
        }
    }

    /// Label of the arc's tuple, allocating the next label on first sight.
    pub fn encode(&mut self, arc: &Arc<W>) -> Label {
        let tuple = self.tuple_of(arc);
        let key = Self::key_of(&tuple);
        if let Some(&label) = self.index.get(&key) {
            return label;
        }
        let label = (self.tuples.len() + 1) as Label;
        self.tuples.push(tuple);
        self.index.insert(key, label);
        label
    }

    /// Non-mutating lookup; `NO_LABEL` when the tuple is absent.
    pub fn get_label(&self, arc: &Arc<W>) -> Label {
        let tuple = self.tuple_of(arc);
        self.index
            .get(&Self::key_of(&tuple))
            .copied()
            .unwrap_or(NO_LABEL)
    }

    /// Tuple of a previously allocated label; `None` when out of range.
    pub fn decode(&self, key: Label) -> Option<&EncodeTuple<W>> {
        if key < 1 || key as usize > self.tuples.len() {
            return None;
        }
        Some(&self.tuples[key as usize - 1])
    }

    pub fn size(&self) -> usize {
        self.tuples.len()
    }

    /// Caller-selectable flags only.
    pub fn flags(&self) -> u32 {
        self.flags & ENCODE_FLAGS
    }

    pub fn input_symbols(&self) -> Option<&SymbolTable> {
        self.isymbols.as_ref()
    }

    pub fn output_symbols(&self) -> Option<&SymbolTable> {
        self.osymbols.as_ref()
    }

    pub fn set_input_symbols(&mut self, symbols: Option<SymbolTable>) {
        if symbols.is_some() {
            self.flags |= ENCODE_HAS_ISYMBOLS;
        } else {
            self.flags &= !ENCODE_HAS_ISYMBOLS;
        }
        self.isymbols = symbols;
    }

    pub fn set_output_symbols(&mut self, symbols: Option<SymbolTable>) {
        if symbols.is_some() {
            self.flags |= ENCODE_HAS_OSYMBOLS;
        } else {
            self.flags &= !ENCODE_HAS_OSYMBOLS;
        }
        self.osymbols = symbols;
    }

    /// Serialize: magic, flags, tuple count, tuples (each weight written by
    /// its own `Weight::write`), then any snapshotted symbol tables.
    pub fn write_to<Wr: Write>(&self, writer: &mut Wr) -> Result<(), FstError> {
        write_i32(writer, ENCODE_TABLE_MAGIC)?;
        write_u32(writer, self.flags)?;
        write_i64(writer, self.tuples.len() as i64)?;
        for tuple in &self.tuples {
            write_i32(writer, tuple.ilabel)?;
            write_i32(writer, tuple.olabel)?;
            tuple.weight.write(writer)?;
        }
        if let Some(syms) = &self.isymbols {
            syms.write(writer)?;
        }
        if let Some(syms) = &self.osymbols {
            syms.write(writer)?;
        }
        Ok(())
    }

    /// Deserialize, verifying the magic number and rebuilding the hash
    /// index from the tuple vector.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, FstError> {
        if read_i32(reader)? != ENCODE_TABLE_MAGIC {
            return Err(FstError::BadMagic("encode table"));
        }
        let flags = read_u32(reader)?;
        let count = read_i64(reader)?;
        if count < 0 {
            return Err(FstError::Invalid {
                kind: "encode table",
                reason: format!("negative tuple count {count}"),
            });
        }
        let mut table = Self::new(flags);
        for _ in 0..count {
            let ilabel = read_i32(reader)?;
            let olabel = read_i32(reader)?;
            let weight = W::read(reader)?;
            let tuple = EncodeTuple {
                ilabel,
                olabel,
                weight,
            };
            let label = (table.tuples.len() + 1) as Label;
            table.index.insert(Self::key_of(&tuple), label);
            table.tuples.push(tuple);
        }
        if flags & ENCODE_HAS_ISYMBOLS != 0 {
            table.isymbols = Some(SymbolTable::read(reader)?);
        }
        if flags & ENCODE_HAS_OSYMBOLS != 0 {
            table.osymbols = Some(SymbolTable::read(reader)?);
        }
        Ok(table)
    }
}

/// Applies the encode or decode transform arc by arc.
///
/// The table is shared between every mapper derived from the same one: a
/// decoder built with [`to_decoder`](EncodeMapper::to_decoder) observes
/// labels the encoder allocates later. Running two encoders over one table
/// concurrently is not supported.
pub struct EncodeMapper<W: Weight> {
    flags: u32,
    encode_type: EncodeType,
    table: Rc<RefCell<EncodeTable<W>>>,
    error: Cell<bool>,
}

impl<W: Weight> EncodeMapper<W> {
    pub fn new(flags: u32, encode_type: EncodeType) -> Self {
        Self {
            flags: flags & ENCODE_FLAGS,
            encode_type,
            table: Rc::new(RefCell::new(EncodeTable::new(flags & ENCODE_FLAGS))),
            error: Cell::new(false),
        }
    }

    /// A decoder over the *same* (still growing) table.
    pub fn to_decoder(&self) -> Self {
        Self {
            flags: self.flags,
            encode_type: EncodeType::Decode,
            table: Rc::clone(&self.table),
            error: Cell::new(self.error.get()),
        }
    }

    pub fn flags(&self) -> u32 {
        self.flags
    }

    pub fn encode_type(&self) -> EncodeType {
        self.encode_type
    }

    pub fn size(&self) -> usize {
        self.table.borrow().size()
    }

    pub fn error(&self) -> bool {
        self.error.get()
    }

    pub fn input_symbols(&self) -> Option<SymbolTable> {
        self.table.borrow().input_symbols().cloned()
    }

    pub fn output_symbols(&self) -> Option<SymbolTable> {
        self.table.borrow().output_symbols().cloned()
    }

    /// Snapshot the machine's symbol tables into the shared table, so a
    /// later decode can restore them.
    pub fn set_input_symbols(&self, symbols: Option<SymbolTable>) {
        self.table.borrow_mut().set_input_symbols(symbols);
    }

    pub fn set_output_symbols(&self, symbols: Option<SymbolTable>) {
        self.table.borrow_mut().set_output_symbols(symbols);
    }

    pub fn write_to<Wr: Write>(&self, writer: &mut Wr) -> Result<(), FstError> {
        self.table.borrow().write_to(writer)
    }

    /// Read a previously written table and wrap it in a mapper of the
    /// given direction.
    pub fn read_from<R: Read>(
        reader: &mut R,
        encode_type: EncodeType,
    ) -> Result<Self, FstError> {
        let table = EncodeTable::read_from(reader)?;
        Ok(Self {
            flags: table.flags(),
            encode_type,
            table: Rc::new(RefCell::new(table)),
            error: Cell::new(false),
        })
    }

    fn encode_arc(&self, arc: &Arc<W>) -> Arc<W> {
        // Super-final arcs pass through unless a non-Zero final weight is
        // being weight-encoded.
        if arc.nextstate == NO_STATE_ID
            && (self.flags & ENCODE_WEIGHTS == 0 || arc.weight == W::zero())
        {
            return arc.clone();
        }
        let label = self.table.borrow_mut().encode(arc);
        Arc::new(
            label,
            if self.flags & ENCODE_LABELS != 0 {
                label
            } else {
                arc.olabel
            },
            if self.flags & ENCODE_WEIGHTS != 0 {
                W::one()
            } else {
                arc.weight.clone()
            },
            arc.nextstate,
        )
    }

    fn decode_arc(&self, arc: &Arc<W>) -> Arc<W> {
        if arc.nextstate == NO_STATE_ID || arc.ilabel == EPSILON {
            return arc.clone();
        }
        if self.flags & ENCODE_LABELS != 0 && arc.ilabel != arc.olabel {
            self.error.set(true);
        }
        if self.flags & ENCODE_WEIGHTS != 0 && arc.weight != W::one() {
            self.error.set(true);
        }
        let table = self.table.borrow();
        match table.decode(arc.ilabel) {
            None => {
                self.error.set(true);
                Arc::new(NO_LABEL, NO_LABEL, W::no_weight(), arc.nextstate)
            }
            Some(tuple) => Arc::new(
                tuple.ilabel,
                if self.flags & ENCODE_LABELS != 0 {
                    tuple.olabel
                } else {
                    arc.olabel
                },
                if self.flags & ENCODE_WEIGHTS != 0 {
                    tuple.weight.clone()
                } else {
                    arc.weight.clone()
                },
                arc.nextstate,
            ),
        }
    }
}

/// Another mapper over the same shared table, same direction.
impl<W: Weight> Clone for EncodeMapper<W> {
    fn clone(&self) -> Self {
        Self {
            flags: self.flags,
            encode_type: self.encode_type,
            table: Rc::clone(&self.table),
            error: Cell::new(self.error.get()),
        }
    }
}

impl<W: Weight> ArcMapper<W> for EncodeMapper<W> {
    fn map_arc(&self, arc: &Arc<W>) -> Arc<W> {
        match self.encode_type {
            EncodeType::Encode => self.encode_arc(arc),
            EncodeType::Decode => self.decode_arc(arc),
        }
    }

    fn final_action(&self) -> MapFinalAction {
        if self.encode_type == EncodeType::Encode && self.flags & ENCODE_WEIGHTS != 0 {
            MapFinalAction::RequireSuperfinal
        } else {
            MapFinalAction::NoSuperfinal
        }
    }

    fn input_symbols_action(&self) -> MapSymbolsAction {
        MapSymbolsAction::ClearSymbols
    }

    fn output_symbols_action(&self) -> MapSymbolsAction {
        MapSymbolsAction::ClearSymbols
    }

    fn map_properties(&self, inprops: u64) -> u64 {
        let mut outprops = inprops;
        if self.error.get() {
            outprops |= props::ERROR;
        }
        // Binary container bits (expanded, mutable) never transfer to a
        // mapped view; in-place mapping restores them on the container.
        let mut mask = props::COPY_PROPERTIES;
        if self.flags & ENCODE_LABELS != 0 {
            mask &= props::I_LABEL_INVARIANT_PROPERTIES & props::O_LABEL_INVARIANT_PROPERTIES;
        }
        if self.flags & ENCODE_WEIGHTS != 0 {
            mask &= props::I_LABEL_INVARIANT_PROPERTIES
                & props::WEIGHT_INVARIANT_PROPERTIES
                & if self.encode_type == EncodeType::Encode {
                    props::ADD_SUPER_FINAL_PROPERTIES
                } else {
                    props::RM_SUPER_FINAL_PROPERTIES
                };
        }
        outprops & mask
    }
}

/// Encode a machine in place, snapshotting its symbol tables into the
/// mapper first.
pub fn encode<W: Weight, F: MutableFst<W>>(fst: &mut F, mapper: &EncodeMapper<W>) {
    mapper.set_input_symbols(fst.input_symbols().cloned());
    mapper.set_output_symbols(fst.output_symbols().cloned());
    crate::arc_map::arc_map(fst, mapper);
}

/// Decode a machine in place: map arcs back, collapse the super-final
/// states weight-encoding introduced, and restore the snapshotted symbol
/// tables.
pub fn decode<W: Weight, F: MutableFst<W>>(fst: &mut F, mapper: &EncodeMapper<W>) {
    crate::arc_map::arc_map(fst, &mapper.to_decoder());
    crate::arc_map::rm_final_epsilon(fst);
    fst.set_input_symbols(mapper.input_symbols());
    fst.set_output_symbols(mapper.output_symbols());
}

struct MapImpl<W: Weight, F: Fst<W>> {
    fst: F,
    mapper: EncodeMapper<W>,
    properties: Cell<u64>,
    isymbols: Option<SymbolTable>,
    osymbols: Option<SymbolTable>,
}

impl<W: Weight, F: Fst<W>> MapImpl<W, F> {
    /// Whether this delayed map prepends a super-final sink at state 0 and
    /// shifts every source state up by one.
    fn shifted(&self) -> bool {
        self.mapper.final_action() == MapFinalAction::RequireSuperfinal
    }
}

/// Delayed encoding of a machine: arcs are run through the encode mapper
/// as cursors visit them, growing the shared table on demand.
///
/// When weights are encoded, finality must be made unique, so the facade
/// exposes a super-final sink at state 0 and source state `s` as `s + 1`
/// (the same shift the complement uses); each final source state gains a
/// trailing arc carrying its encoded final weight to the sink.
pub struct EncodeFst<W: Weight, F: Fst<W>> {
    imp: Rc<MapImpl<W, F>>,
}

/// Delayed decoding of a machine through a shared encode table.
pub struct DecodeFst<W: Weight, F: Fst<W>> {
    imp: Rc<MapImpl<W, F>>,
}

impl<W: Weight, F: Fst<W>> EncodeFst<W, F> {
    pub fn new(fst: F, mapper: &EncodeMapper<W>) -> Self {
        mapper.set_input_symbols(fst.input_symbols().cloned());
        mapper.set_output_symbols(fst.output_symbols().cloned());
        let properties = {
            let inprops = fst.properties(props::FST_PROPERTIES, false);
            mapper.map_properties(inprops)
        };
        Self {
            imp: Rc::new(MapImpl {
                fst,
                mapper: mapper.clone(),
                properties: Cell::new(properties),
                // Encoded labels are synthetic: no tables on the facade.
                isymbols: None,
                osymbols: None,
            }),
        }
    }
}

impl<W: Weight, F: Fst<W>> DecodeFst<W, F> {
    pub fn new(fst: F, mapper: &EncodeMapper<W>) -> Self {
        let decoder = mapper.to_decoder();
        let properties = {
            let inprops = fst.properties(props::FST_PROPERTIES, false);
            decoder.map_properties(inprops)
        };
        Self {
            imp: Rc::new(MapImpl {
                fst,
                isymbols: mapper.input_symbols(),
                osymbols: mapper.output_symbols(),
                mapper: decoder,
                properties: Cell::new(properties),
            }),
        }
    }
}

impl<W: Weight, F: Fst<W>> Clone for EncodeFst<W, F> {
    fn clone(&self) -> Self {
        Self {
            imp: Rc::clone(&self.imp),
        }
    }
}

impl<W: Weight, F: Fst<W>> Clone for DecodeFst<W, F> {
    fn clone(&self) -> Self {
        Self {
            imp: Rc::clone(&self.imp),
        }
    }
}

/// State cursor over a possibly shifted map facade.
pub struct MapStateCursor<'a, W: Weight, F: Fst<W> + 'a> {
    siter: <F as Fst<W>>::StateCursor<'a>,
    shifted: bool,
    s: StateId,
}

impl<'a, W: Weight, F: Fst<W>> StateCursor for MapStateCursor<'a, W, F> {
    fn done(&self) -> bool {
        if self.shifted {
            self.s > 0 && self.siter.done()
        } else {
            self.siter.done()
        }
    }

    fn value(&self) -> StateId {
        if self.shifted {
            self.s
        } else {
            self.siter.value()
        }
    }

    fn next(&mut self) {
        if !self.shifted || self.s != 0 {
            self.siter.next();
        }
        self.s += 1;
    }

    fn reset(&mut self) {
        self.siter.reset();
        self.s = 0;
    }
}

/// Arc cursor over a map facade. In the shifted (weight-encoding) layout,
/// the mapped source arcs come first and the encoded final-weight arc to
/// the sink, when present, is last.
pub struct MapArcCursor<'a, W: Weight, F: Fst<W> + 'a> {
    aiter: Option<<F as Fst<W>>::ArcCursor<'a>>,
    imp: &'a MapImpl<W, F>,
    /// Encoded final-weight arc of the underlying state, if any.
    final_arc: Option<Arc<W>>,
    narcs: usize,
    pos: usize,
    arc: Arc<W>,
}

impl<'a, W: Weight, F: Fst<W>> MapArcCursor<'a, W, F> {
    fn update(&mut self) {
        if self.pos < self.narcs {
            if let Some(aiter) = &self.aiter {
                let mut arc = self.imp.mapper.map_arc(aiter.value());
                if self.imp.shifted() {
                    arc.nextstate += 1;
                }
                self.arc = arc;
            }
        } else if self.pos == self.narcs {
            if let Some(final_arc) = &self.final_arc {
                self.arc = final_arc.clone();
            }
        }
    }
}

impl<'a, W: Weight, F: Fst<W>> ArcCursor<W> for MapArcCursor<'a, W, F> {
    fn done(&self) -> bool {
        self.pos >= self.narcs + usize::from(self.final_arc.is_some())
    }

    fn value(&self) -> &Arc<W> {
        &self.arc
    }

    fn next(&mut self) {
        if self.pos < self.narcs {
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
            aiter.seek(pos.min(self.narcs));
        }
        self.pos = pos;
        self.update();
    }
}

macro_rules! map_fst_impl {
    ($facade:ident) => {
        impl<W: Weight, F: Fst<W>> Fst<W> for $facade<W, F> {
            type StateCursor<'a>
                = MapStateCursor<'a, W, F>
            where
                Self: 'a;
            type ArcCursor<'a>
                = MapArcCursor<'a, W, F>
            where
                Self: 'a;

            fn start(&self) -> Option<StateId> {
                let start = self.imp.fst.start()?;
                Some(if self.imp.shifted() { start + 1 } else { start })
            }

            fn final_weight(&self, s: StateId) -> W {
                if self.imp.shifted() {
                    // Finality lives entirely on the sink.
                    if s == 0 {
                        W::one()
                    } else {
                        W::zero()
                    }
                } else {
                    let final_arc = Arc::new(
                        EPSILON,
                        EPSILON,
                        self.imp.fst.final_weight(s),
                        NO_STATE_ID,
                    );
                    self.imp.mapper.map_arc(&final_arc).weight
                }
            }

            fn states(&self) -> MapStateCursor<'_, W, F> {
                MapStateCursor {
                    siter: self.imp.fst.states(),
                    shifted: self.imp.shifted(),
                    s: 0,
                }
            }

            fn arcs(&self, s: StateId) -> MapArcCursor<'_, W, F> {
                let imp: &MapImpl<W, F> = &self.imp;
                let (aiter, narcs, final_arc) = if imp.shifted() {
                    if s == 0 {
                        (None, 0, None)
                    } else {
                        let src = s - 1;
                        let final_weight = imp.fst.final_weight(src);
                        let final_arc = if final_weight != W::zero() {
                            let mapped = imp.mapper.map_arc(&Arc::new(
                                EPSILON,
                                EPSILON,
                                final_weight,
                                NO_STATE_ID,
                            ));
                            Some(Arc::new(mapped.ilabel, mapped.olabel, mapped.weight, 0))
                        } else {
                            None
                        };
                        (
                            Some(imp.fst.arcs(src)),
                            count_arcs(&imp.fst, src),
                            final_arc,
                        )
                    }
                } else {
                    (Some(imp.fst.arcs(s)), count_arcs(&imp.fst, s), None)
                };
                let mut cursor = MapArcCursor {
                    aiter,
                    imp,
                    final_arc,
                    narcs,
                    pos: 0,
                    arc: Arc::new(NO_LABEL, NO_LABEL, W::no_weight(), NO_STATE_ID),
                };
                cursor.update();
                cursor
            }

            fn properties(&self, mask: u64, test: bool) -> u64 {
                if mask & props::ERROR != 0
                    && (self.imp.mapper.error()
                        || self.imp.fst.properties(props::ERROR, false) != 0)
                {
                    self.imp
                        .properties
                        .set(self.imp.properties.get() | props::ERROR);
                }
                let (updated, result) =
                    test_properties(self, self.imp.properties.get(), mask, test);
                self.imp.properties.set(updated);
                result
            }

            fn num_arcs(&self, s: StateId) -> Option<usize> {
                if self.imp.shifted() {
                    if s == 0 {
                        Some(0)
                    } else {
                        let src = s - 1;
                        let extra =
                            usize::from(self.imp.fst.final_weight(src) != W::zero());
                        self.imp.fst.num_arcs(src).map(|n| n + extra)
                    }
                } else {
                    self.imp.fst.num_arcs(s)
                }
            }

            fn input_symbols(&self) -> Option<&SymbolTable> {
                self.imp.isymbols.as_ref()
            }

            fn output_symbols(&self) -> Option<&SymbolTable> {
                self.imp.osymbols.as_ref()
            }
        }
    };
}

map_fst_impl!(EncodeFst);
map_fst_impl!(DecodeFst);

/// Arc count of a source state, counting through the cursor if the source
/// does not track counts.
fn count_arcs<W: Weight, F: Fst<W>>(fst: &F, s: StateId) -> usize {
    if let Some(n) = fst.num_arcs(s) {
        return n;
    }
    let mut n = 0;
    let mut cursor = fst.arcs(s);
    while !cursor.done() {
        n += 1;
        cursor.next();
    }
    n
}
