// Process-wide registries: one mapping (operation name, arc type) to a
// type-erased operation body, one mapping arc-type tags to container
// readers and empty-machine factories.
//
// Both are append-only. Publication safety comes from initializing behind
// a OnceLock and guarding mutation with an RwLock: readers always observe
// fully published entries.

use std::any::Any;
use std::sync::OnceLock;

use hashbrown::HashMap;
use parking_lot::RwLock;
use weft::{FstError, Log64Weight, LogWeight, TropicalWeight, Weight};

use crate::fst_class::{read_typed, FstClassBase, TypedFstClass};
use crate::ScriptError;

/// A registered operation body. The argument is the operation's arg pack,
/// downcast by the typed body.
pub type OpFn = fn(&mut dyn Any);

/// Parses container bytes into a typed handle.
pub type ReadFn = fn(&[u8]) -> Result<Box<dyn FstClassBase>, FstError>;

/// Creates an empty typed handle.
pub type FactoryFn = fn() -> Box<dyn FstClassBase>;

struct ArcTypeEntry {
    read: ReadFn,
    make: FactoryFn,
}

struct Registry {
    operations: HashMap<(String, String), OpFn>,
    arc_types: HashMap<String, ArcTypeEntry>,
}

fn make_typed<W: Weight>() -> Box<dyn FstClassBase> {
    Box::new(TypedFstClass {
        fst: weft::vector::VectorFst::<W>::new(),
    })
}

fn builtin_registry() -> Registry {
    let mut registry = Registry {
        operations: HashMap::new(),
        arc_types: HashMap::new(),
    };
    register_arc_type_in(&mut registry, "standard", read_typed::<TropicalWeight>, make_typed::<TropicalWeight>);
    register_arc_type_in(&mut registry, "log", read_typed::<LogWeight>, make_typed::<LogWeight>);
    register_arc_type_in(&mut registry, "log64", read_typed::<Log64Weight>, make_typed::<Log64Weight>);
    crate::ops::register_builtins(&mut |name, arc_type, op| {
        registry
            .operations
            .insert((name.to_string(), arc_type.to_string()), op);
    });
    registry
}

fn register_arc_type_in(registry: &mut Registry, name: &str, read: ReadFn, make: FactoryFn) {
    registry
        .arc_types
        .insert(name.to_string(), ArcTypeEntry { read, make });
}

fn registry() -> &'static RwLock<Registry> {
    static REGISTRY: OnceLock<RwLock<Registry>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(builtin_registry()))
}

/// Register an operation body for one (operation, arc type) pair.
/// Re-registration replaces the previous body.
pub fn register_operation(name: &str, arc_type: &str, op: OpFn) {
    registry()
        .write()
        .operations
        .insert((name.to_string(), arc_type.to_string()), op);
}

pub fn lookup_operation(name: &str, arc_type: &str) -> Option<OpFn> {
    registry()
        .read()
        .operations
        .get(&(name.to_string(), arc_type.to_string()))
        .copied()
}

/// Register a loadable arc type: its container reader and empty-machine
/// factory.
pub fn register_arc_type(name: &str, read: ReadFn, make: FactoryFn) {
    register_arc_type_in(&mut registry().write(), name, read, make);
}

pub fn lookup_arc_type(name: &str) -> Option<ReadFn> {
    registry().read().arc_types.get(name).map(|e| e.read)
}

pub fn lookup_arc_type_factory(name: &str) -> Option<FactoryFn> {
    registry().read().arc_types.get(name).map(|e| e.make)
}

/// Dispatch an operation by name and arc type. An unknown arc type
/// triggers one provider-module load attempt before reporting a miss; a
/// miss has no effect on the args.
pub fn apply(name: &str, arc_type: &str, args: &mut dyn Any) -> Result<(), ScriptError> {
    let op = lookup_operation(name, arc_type).or_else(|| {
        crate::extension::load_arc_type_module(arc_type)
            .then(|| lookup_operation(name, arc_type))
            .flatten()
    });
    match op {
        Some(op) => {
            op(args);
            Ok(())
        }
        None => Err(ScriptError::OperationNotFound {
            op: name.to_string(),
            arc_type: arc_type.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FooArgs {
        calls: usize,
        payload: i32,
    }

    fn foo_op(args: &mut dyn Any) {
        let args = args.downcast_mut::<FooArgs>().expect("FooArgs");
        args.calls += 1;
        args.payload *= 2;
    }

    #[test]
    fn dispatch_reaches_registered_body_with_same_args() {
        register_operation("Foo", "standard", foo_op);
        let mut args = FooArgs {
            calls: 0,
            payload: 21,
        };
        apply("Foo", "standard", &mut args).unwrap();
        assert_eq!(args.calls, 1);
        assert_eq!(args.payload, 42);
    }

    #[test]
    fn unregistered_arc_type_is_a_miss_without_effect() {
        register_operation("FooMiss", "standard", foo_op);
        let mut args = FooArgs {
            calls: 0,
            payload: 7,
        };
        let err = apply("FooMiss", "log", &mut args).unwrap_err();
        assert!(matches!(err, ScriptError::OperationNotFound { .. }));
        assert_eq!(args.calls, 0);
        assert_eq!(args.payload, 7);
    }

    #[test]
    fn builtin_arc_types_present() {
        assert!(lookup_arc_type("standard").is_some());
        assert!(lookup_arc_type("log").is_some());
        assert!(lookup_arc_type("log64").is_some());
        assert!(lookup_arc_type("quaternion").is_none());
    }

    #[test]
    fn builtin_operations_cover_every_arc_type() {
        for arc_type in ["standard", "log", "log64"] {
            for op in ["invert", "encode", "decode", "copy"] {
                assert!(
                    lookup_operation(op, arc_type).is_some(),
                    "{op} missing for {arc_type}"
                );
            }
        }
    }
}
