// Loadable arc-type providers. An unknown arc type triggers one attempt
// to load a shared module named after it; the module's initializer is
// expected to call back into `registry::register_arc_type` (and register
// its operation bodies) as a side effect.

use std::sync::OnceLock;

use hashbrown::HashSet;
use parking_lot::Mutex;

/// Modules stay loaded for the life of the process so the function
/// pointers they registered remain valid.
struct LoadedModules {
    libraries: Vec<libloading::Library>,
    attempted: HashSet<String>,
}

fn loaded() -> &'static Mutex<LoadedModules> {
    static LOADED: OnceLock<Mutex<LoadedModules>> = OnceLock::new();
    LOADED.get_or_init(|| {
        Mutex::new(LoadedModules {
            libraries: Vec::new(),
            attempted: HashSet::new(),
        })
    })
}

/// Shared-module filename for an arc type, with the tag normalized to a
/// filesystem-legal symbol.
pub fn module_name(arc_type: &str) -> String {
    let legal: String = arc_type
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{legal}-arc.so")
}

/// Try to load the provider module for an arc type. Returns true when a
/// module was loaded and initialized; each arc type is attempted at most
/// once per process.
pub fn load_arc_type_module(arc_type: &str) -> bool {
    let mut loaded = loaded().lock();
    if !loaded.attempted.insert(arc_type.to_string()) {
        return false;
    }
    let name = module_name(arc_type);
    // Loading runs arbitrary initialization code from the module.
    let library = match unsafe { libloading::Library::new(&name) } {
        Ok(library) => library,
        Err(_) => return false,
    };
    let initialized = unsafe {
        library
            .get::<unsafe extern "C" fn()>(b"weft_register_arc_type")
            .map(|init| init())
            .is_ok()
    };
    if initialized {
        loaded.libraries.push(library);
    }
    initialized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_name_is_legalized() {
        assert_eq!(module_name("standard"), "standard-arc.so");
        assert_eq!(module_name("my weird/type"), "my_weird_type-arc.so");
    }

    #[test]
    fn missing_module_is_a_clean_miss() {
        assert!(!load_arc_type_module("no_such_arc_type_anywhere"));
        // Second attempt short-circuits.
        assert!(!load_arc_type_module("no_such_arc_type_anywhere"));
    }
}
