// Type-erased FST handles. A handle carries a concrete VectorFst of some
// semiring behind a trait object tagged with its arc type; typed operation
// bodies recover the concrete machine by downcast.

use std::any::Any;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use weft::fst::Fst;
use weft::vector::VectorFst;
use weft::{FstError, StateId, Weight};

use crate::registry;
use crate::ScriptError;

/// Object-safe core of a type-erased FST handle.
pub trait FstClassBase: Any {
    fn arc_type(&self) -> &'static str;
    fn start(&self) -> Option<StateId>;
    fn num_states(&self) -> Option<usize>;
    fn num_arcs_total(&self) -> usize;
    fn properties(&self, mask: u64, test: bool) -> u64;
    fn write_bytes(&self, writer: &mut dyn Write) -> Result<(), FstError>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// The typed payload behind a handle.
pub struct TypedFstClass<W: Weight> {
    pub fst: VectorFst<W>,
}

impl<W: Weight> FstClassBase for TypedFstClass<W> {
    fn arc_type(&self) -> &'static str {
        W::ARC_TYPE
    }

    fn start(&self) -> Option<StateId> {
        self.fst.start()
    }

    fn num_states(&self) -> Option<usize> {
        self.fst.num_states()
    }

    fn num_arcs_total(&self) -> usize {
        let n = self.fst.num_states().unwrap_or(0);
        (0..n as StateId)
            .map(|s| self.fst.num_arcs(s).unwrap_or(0))
            .sum()
    }

    fn properties(&self, mask: u64, test: bool) -> u64 {
        self.fst.properties(mask, test)
    }

    fn write_bytes(&self, mut writer: &mut dyn Write) -> Result<(), FstError> {
        self.fst.write_to(&mut writer)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Reader registered per arc type: parses container bytes into a typed
/// handle.
pub fn read_typed<W: Weight>(mut data: &[u8]) -> Result<Box<dyn FstClassBase>, FstError> {
    let fst = VectorFst::<W>::read_from(&mut data)?;
    Ok(Box::new(TypedFstClass { fst }))
}

/// A read-only type-erased FST handle.
pub struct FstClass {
    imp: Box<dyn FstClassBase>,
}

impl std::fmt::Debug for FstClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FstClass")
            .field("arc_type", &self.imp.arc_type())
            .finish()
    }
}

impl FstClass {
    pub fn from_typed<W: Weight>(fst: VectorFst<W>) -> Self {
        Self {
            imp: Box::new(TypedFstClass { fst }),
        }
    }

    pub(crate) fn from_base(imp: Box<dyn FstClassBase>) -> Self {
        Self { imp }
    }

    /// Parse container bytes, dispatching on the arc-type tag in the
    /// header. An unknown arc type triggers one attempt to load a
    /// provider module for it.
    pub fn read_bytes(data: &[u8]) -> Result<Self, ScriptError> {
        let arc_type = weft::vector::peek_arc_type(&mut &data[..])?;
        let reader = registry::lookup_arc_type(&arc_type)
            .or_else(|| {
                crate::extension::load_arc_type_module(&arc_type)
                    .then(|| registry::lookup_arc_type(&arc_type))
                    .flatten()
            })
            .ok_or_else(|| ScriptError::UnknownArcType(arc_type.clone()))?;
        Ok(Self {
            imp: reader(data)?,
        })
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, ScriptError> {
        let mut data = Vec::new();
        File::open(path.as_ref())
            .and_then(|mut f| f.read_to_end(&mut data))
            .map_err(FstError::from)?;
        Self::read_bytes(&data)
    }

    pub fn write_bytes(&self) -> Result<Vec<u8>, ScriptError> {
        let mut buf = Vec::new();
        self.imp.write_bytes(&mut buf)?;
        Ok(buf)
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<(), ScriptError> {
        let file = File::create(path.as_ref()).map_err(FstError::from)?;
        let mut writer = BufWriter::new(file);
        self.imp.write_bytes(&mut writer)?;
        Ok(())
    }

    pub fn arc_type(&self) -> &'static str {
        self.imp.arc_type()
    }

    pub fn start(&self) -> Option<StateId> {
        self.imp.start()
    }

    pub fn num_states(&self) -> Option<usize> {
        self.imp.num_states()
    }

    pub fn num_arcs_total(&self) -> usize {
        self.imp.num_arcs_total()
    }

    pub fn properties(&self, mask: u64, test: bool) -> u64 {
        self.imp.properties(mask, test)
    }

    /// The concrete machine, if `W` matches the handle's arc type.
    pub fn fst<W: Weight>(&self) -> Option<&VectorFst<W>> {
        self.imp
            .as_any()
            .downcast_ref::<TypedFstClass<W>>()
            .map(|t| &t.fst)
    }
}

/// A mutable type-erased FST handle.
pub struct MutableFstClass {
    inner: FstClass,
}

impl std::fmt::Debug for MutableFstClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutableFstClass")
            .field("inner", &self.inner)
            .finish()
    }
}

impl MutableFstClass {
    pub fn from_typed<W: Weight>(fst: VectorFst<W>) -> Self {
        Self {
            inner: FstClass::from_typed(fst),
        }
    }

    /// An empty mutable machine of the named arc type.
    pub fn new_of_type(arc_type: &str) -> Result<Self, ScriptError> {
        let make = registry::lookup_arc_type_factory(arc_type)
            .ok_or_else(|| ScriptError::UnknownArcType(arc_type.to_string()))?;
        Ok(Self {
            inner: FstClass::from_base(make()),
        })
    }

    pub fn read_bytes(data: &[u8]) -> Result<Self, ScriptError> {
        Ok(Self {
            inner: FstClass::read_bytes(data)?,
        })
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, ScriptError> {
        Ok(Self {
            inner: FstClass::read(path)?,
        })
    }

    pub fn fst_mut<W: Weight>(&mut self) -> Option<&mut VectorFst<W>> {
        self.inner
            .imp
            .as_any_mut()
            .downcast_mut::<TypedFstClass<W>>()
            .map(|t| &mut t.fst)
    }

    /// View as the read-only handle.
    pub fn as_fst_class(&self) -> &FstClass {
        &self.inner
    }

    pub fn into_fst_class(self) -> FstClass {
        self.inner
    }
}

impl std::ops::Deref for MutableFstClass {
    type Target = FstClass;

    fn deref(&self) -> &FstClass {
        &self.inner
    }
}

/// Fails when the two handles disagree on arc type, naming the operation
/// in the error.
pub fn arc_types_match(a: &FstClass, b: &FstClass, op: &str) -> Result<(), ScriptError> {
    if a.arc_type() != b.arc_type() {
        return Err(ScriptError::ArcTypeMismatch {
            op: op.to_string(),
            left: a.arc_type().to_string(),
            right: b.arc_type().to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft::fst::MutableFst;
    use weft::{Arc, LogWeight, TropicalWeight};

    fn sample() -> VectorFst<TropicalWeight> {
        let mut fst = VectorFst::new();
        let s0 = fst.add_state();
        let s1 = fst.add_state();
        fst.set_start(s0);
        fst.set_final(s1, TropicalWeight::one());
        fst.add_arc(s0, Arc::new(1, 2, TropicalWeight::new(0.5), s1));
        fst
    }

    #[test]
    fn round_trip_preserves_arc_type() {
        let handle = FstClass::from_typed(sample());
        assert_eq!(handle.arc_type(), "standard");
        let bytes = handle.write_bytes().unwrap();
        let back = FstClass::read_bytes(&bytes).unwrap();
        assert_eq!(back.arc_type(), "standard");
        assert_eq!(back.num_states(), Some(2));
        assert_eq!(back.num_arcs_total(), 1);
        assert_eq!(back.start(), Some(0));
    }

    #[test]
    fn log_arc_type_dispatches() {
        let mut fst = VectorFst::<LogWeight>::new();
        let s = fst.add_state();
        fst.set_start(s);
        fst.set_final(s, LogWeight::one());
        let bytes = FstClass::from_typed(fst).write_bytes().unwrap();
        let back = FstClass::read_bytes(&bytes).unwrap();
        assert_eq!(back.arc_type(), "log");
        assert!(back.fst::<LogWeight>().is_some());
        assert!(back.fst::<TropicalWeight>().is_none());
    }

    #[test]
    fn downcast_requires_matching_type() {
        let handle = FstClass::from_typed(sample());
        assert!(handle.fst::<TropicalWeight>().is_some());
        assert!(handle.fst::<LogWeight>().is_none());
    }

    #[test]
    fn unknown_arc_type_reported() {
        let mut handle = MutableFstClass::from_typed(sample());
        let fst = handle.fst_mut::<TropicalWeight>().unwrap();
        let mut bytes = Vec::new();
        fst.write_to(&mut bytes).unwrap();
        // Corrupt the arc-type tag in place: "standard" -> "standarX".
        let pos = bytes.windows(8).position(|w| w == b"standard").unwrap();
        bytes[pos + 7] = b'X';
        match FstClass::read_bytes(&bytes) {
            Err(ScriptError::UnknownArcType(t)) => assert_eq!(t, "standarX"),
            other => panic!("expected UnknownArcType, got {other:?}"),
        }
    }

    #[test]
    fn mismatch_check_names_operation() {
        let a = FstClass::from_typed(sample());
        let mut log = VectorFst::<LogWeight>::new();
        log.add_state();
        let b = FstClass::from_typed(log);
        let err = arc_types_match(&a, &b, "compose").unwrap_err();
        match err {
            ScriptError::ArcTypeMismatch { op, left, right } => {
                assert_eq!(op, "compose");
                assert_eq!(left, "standard");
                assert_eq!(right, "log");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn new_of_type_creates_empty_typed() {
        let handle = MutableFstClass::new_of_type("log64").unwrap();
        assert_eq!(handle.arc_type(), "log64");
        assert_eq!(handle.num_states(), Some(0));
        assert!(MutableFstClass::new_of_type("nonesuch").is_err());
    }
}
