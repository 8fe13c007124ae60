// Built-in operations: typed bodies registered per arc type, plus the
// client-facing wrappers that box arguments and dispatch through the
// registry.

use std::any::Any;
use std::str::FromStr;

use weft::arcfilter::AnyArcFilter;
use weft::encode::{decode, encode, EncodeMapper, EncodeType};
use weft::queue::{FifoQueue, LifoQueue, Queue, StateOrderQueue};
use weft::vector::VectorFst;
use weft::visit::{visit, PartialCopyVisitor};
use weft::{FstError, Log64Weight, LogWeight, StateId, TropicalWeight, Weight};

use crate::fst_class::{FstClass, MutableFstClass};
use crate::registry::{self, OpFn};
use crate::ScriptError;

/// Queue discipline selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueKind {
    Fifo,
    Lifo,
    StateOrder,
}

impl FromStr for QueueKind {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, ScriptError> {
        match s {
            "fifo" => Ok(QueueKind::Fifo),
            "lifo" => Ok(QueueKind::Lifo),
            "state" => Ok(QueueKind::StateOrder),
            other => Err(ScriptError::UnknownQueue(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Arg packs
// ---------------------------------------------------------------------------

pub struct InvertArgs {
    pub fst: MutableFstClass,
}

pub struct EncodeArgs {
    pub fst: MutableFstClass,
    pub flags: u32,
    /// Serialized encode table, produced by the operation.
    pub mapper_bytes: Vec<u8>,
    pub outcome: Result<(), FstError>,
}

pub struct DecodeArgs {
    pub fst: MutableFstClass,
    /// Serialized encode table from the matching encode run.
    pub mapper_bytes: Vec<u8>,
    pub outcome: Result<(), FstError>,
}

pub struct CopyArgs {
    pub ifst: FstClass,
    pub queue: QueueKind,
    pub maxvisit: Option<StateId>,
    /// Materialized output, produced by the operation.
    pub ofst: Option<MutableFstClass>,
    pub num_initialized: StateId,
    pub num_finished: StateId,
}

// ---------------------------------------------------------------------------
// Typed bodies
// ---------------------------------------------------------------------------

fn invert_op<W: Weight>(args: &mut dyn Any) {
    let Some(args) = args.downcast_mut::<InvertArgs>() else {
        return;
    };
    let Some(fst) = args.fst.fst_mut::<W>() else {
        return;
    };
    weft::arc_map::invert(fst);
}

fn encode_op<W: Weight>(args: &mut dyn Any) {
    let Some(args) = args.downcast_mut::<EncodeArgs>() else {
        return;
    };
    let Some(fst) = args.fst.fst_mut::<W>() else {
        return;
    };
    let mapper = EncodeMapper::<W>::new(args.flags, EncodeType::Encode);
    encode(fst, &mapper);
    let mut buf = Vec::new();
    match mapper.write_to(&mut buf) {
        Ok(()) => {
            args.mapper_bytes = buf;
            args.outcome = Ok(());
        }
        Err(e) => args.outcome = Err(e),
    }
}

fn decode_op<W: Weight>(args: &mut dyn Any) {
    let Some(args) = args.downcast_mut::<DecodeArgs>() else {
        return;
    };
    let Some(fst) = args.fst.fst_mut::<W>() else {
        return;
    };
    let mapper =
        match EncodeMapper::<W>::read_from(&mut args.mapper_bytes.as_slice(), EncodeType::Encode)
        {
            Ok(mapper) => mapper,
            Err(e) => {
                args.outcome = Err(e);
                return;
            }
        };
    decode(fst, &mapper);
    args.outcome = Ok(());
}

fn copy_op<W: Weight>(args: &mut dyn Any) {
    let Some(args) = args.downcast_mut::<CopyArgs>() else {
        return;
    };
    let Some(src) = args.ifst.fst::<W>() else {
        return;
    };
    let mut out = VectorFst::<W>::new();
    let cap = args.maxvisit.unwrap_or(StateId::MAX);
    let (ninit, nfinish) = match args.queue {
        QueueKind::Fifo => drive(src, &mut out, FifoQueue::new(), cap),
        QueueKind::Lifo => drive(src, &mut out, LifoQueue::new(), cap),
        QueueKind::StateOrder => drive(src, &mut out, StateOrderQueue::new(), cap),
    };
    args.num_initialized = ninit;
    args.num_finished = nfinish;
    args.ofst = Some(MutableFstClass::from_typed(out));
}

fn drive<W: Weight, Q: Queue>(
    src: &VectorFst<W>,
    out: &mut VectorFst<W>,
    mut queue: Q,
    maxvisit: StateId,
) -> (StateId, StateId) {
    let mut visitor = PartialCopyVisitor::new(out, maxvisit, true, true);
    visit(src, &mut visitor, &mut queue, &AnyArcFilter, false);
    (visitor.num_initialized(), visitor.num_finished())
}

/// Register every built-in operation for every built-in arc type.
pub(crate) fn register_builtins(register: &mut dyn FnMut(&str, &str, OpFn)) {
    register_for::<TropicalWeight>(register);
    register_for::<LogWeight>(register);
    register_for::<Log64Weight>(register);
}

fn register_for<W: Weight>(register: &mut dyn FnMut(&str, &str, OpFn)) {
    register("invert", W::ARC_TYPE, invert_op::<W>);
    register("encode", W::ARC_TYPE, encode_op::<W>);
    register("decode", W::ARC_TYPE, decode_op::<W>);
    register("copy", W::ARC_TYPE, copy_op::<W>);
}

// ---------------------------------------------------------------------------
// Client-facing wrappers
// ---------------------------------------------------------------------------

/// Invert a transduction.
pub fn invert(fst: MutableFstClass) -> Result<MutableFstClass, ScriptError> {
    let arc_type = fst.arc_type();
    let mut args = InvertArgs { fst };
    registry::apply("invert", arc_type, &mut args)?;
    Ok(args.fst)
}

/// Encode a machine in place; returns the machine and the serialized
/// encode table needed to decode it later.
pub fn encode_fst(
    fst: MutableFstClass,
    flags: u32,
) -> Result<(MutableFstClass, Vec<u8>), ScriptError> {
    let arc_type = fst.arc_type();
    let mut args = EncodeArgs {
        fst,
        flags,
        mapper_bytes: Vec::new(),
        outcome: Ok(()),
    };
    registry::apply("encode", arc_type, &mut args)?;
    args.outcome?;
    Ok((args.fst, args.mapper_bytes))
}

/// Decode a machine in place through a previously written encode table.
pub fn decode_fst(
    fst: MutableFstClass,
    mapper_bytes: Vec<u8>,
) -> Result<MutableFstClass, ScriptError> {
    let arc_type = fst.arc_type();
    let mut args = DecodeArgs {
        fst,
        mapper_bytes,
        outcome: Ok(()),
    };
    registry::apply("decode", arc_type, &mut args)?;
    args.outcome?;
    Ok(args.fst)
}

/// Materialize a machine by a queue-driven visit; bounded when `maxvisit`
/// is given. Returns the copy and the (initialized, finished) counts.
pub fn copy_fst(
    ifst: FstClass,
    queue: QueueKind,
    maxvisit: Option<StateId>,
) -> Result<(MutableFstClass, StateId, StateId), ScriptError> {
    let arc_type = ifst.arc_type();
    let mut args = CopyArgs {
        ifst,
        queue,
        maxvisit,
        ofst: None,
        num_initialized: 0,
        num_finished: 0,
    };
    registry::apply("copy", arc_type, &mut args)?;
    let ofst = args.ofst.ok_or_else(|| ScriptError::OperationNotFound {
        op: "copy".to_string(),
        arc_type: arc_type.to_string(),
    })?;
    Ok((ofst, args.num_initialized, args.num_finished))
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft::encode::{ENCODE_LABELS, ENCODE_WEIGHTS};
    use weft::fst::{ArcCursor, Fst, MutableFst};
    use weft::Arc;

    type W = TropicalWeight;

    fn sample() -> MutableFstClass {
        let mut fst = VectorFst::<W>::new();
        let s0 = fst.add_state();
        let s1 = fst.add_state();
        fst.set_start(s0);
        fst.set_final(s1, W::one());
        fst.add_arc(s0, Arc::new(1, 2, W::new(0.5), s1));
        MutableFstClass::from_typed(fst)
    }

    #[test]
    fn invert_through_dispatch() {
        let inverted = invert(sample()).unwrap();
        let fst = inverted.fst::<W>().unwrap();
        let arc = fst.arcs(0).value().clone();
        assert_eq!(arc.ilabel, 2);
        assert_eq!(arc.olabel, 1);
    }

    #[test]
    fn encode_decode_through_dispatch() {
        let (encoded, mapper_bytes) =
            encode_fst(sample(), ENCODE_LABELS | ENCODE_WEIGHTS).unwrap();
        {
            let fst = encoded.fst::<W>().unwrap();
            let arc = fst.arcs(0).value().clone();
            assert_eq!(arc.ilabel, arc.olabel);
            assert_eq!(arc.weight, W::one());
        }
        let decoded = decode_fst(encoded, mapper_bytes).unwrap();
        let fst = decoded.fst::<W>().unwrap();
        let arc = fst.arcs(0).value().clone();
        assert_eq!((arc.ilabel, arc.olabel), (1, 2));
        assert_eq!(arc.weight, W::new(0.5));
        assert_eq!(fst.final_weight(1), W::one());
    }

    #[test]
    fn decode_with_garbage_mapper_fails() {
        let err = decode_fst(sample(), vec![0, 1, 2, 3, 4, 5, 6, 7, 8]).unwrap_err();
        assert!(matches!(err, ScriptError::Fst(_)));
    }

    #[test]
    fn copy_through_dispatch() {
        let handle = sample();
        let (copied, ninit, nfinish) =
            copy_fst(handle.into_fst_class(), QueueKind::Fifo, None).unwrap();
        assert_eq!(copied.num_states(), Some(2));
        assert_eq!(ninit, 2);
        assert_eq!(nfinish, 2);
    }

    #[test]
    fn bounded_copy_through_dispatch() {
        // Chain of 10.
        let mut fst = VectorFst::<W>::new();
        for _ in 0..10 {
            fst.add_state();
        }
        fst.set_start(0);
        fst.set_final(9, W::one());
        for s in 0..9 {
            fst.add_arc(s, Arc::new(1, 1, W::one(), s + 1));
        }
        let handle = FstClass::from_typed(fst);
        let (copied, ninit, nfinish) = copy_fst(handle, QueueKind::Fifo, Some(3)).unwrap();
        assert_eq!(ninit, 3);
        assert_eq!(nfinish, 3);
        assert_eq!(copied.num_states(), Some(3));
    }

    #[test]
    fn queue_kind_parsing() {
        assert_eq!("fifo".parse::<QueueKind>().unwrap(), QueueKind::Fifo);
        assert_eq!("lifo".parse::<QueueKind>().unwrap(), QueueKind::Lifo);
        assert_eq!("state".parse::<QueueKind>().unwrap(), QueueKind::StateOrder);
        assert!(matches!(
            "priority".parse::<QueueKind>(),
            Err(ScriptError::UnknownQueue(_))
        ));
    }
}
