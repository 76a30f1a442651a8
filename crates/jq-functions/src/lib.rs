//! Default built-in function registry.
//!
//! The core evaluator only ever consumes a `lookup(name) -> callable`
//! interface (see `jq_value::function::Caller`); this crate is one concrete
//! resolver a caller can plug in via `with_functions`/`with_custom_function`,
//! not part of the engine's non-negotiable semantics. It depends on
//! `jq-value` and `jq-error` only — never the evaluator — so higher-order
//! built-ins (`$map`, `$filter`, `$reduce`, `$sort`, `$each`) reach back into
//! evaluation only through the `Caller` capability passed to every native
//! function at call time.

#![cfg_attr(test, allow(clippy::panic, clippy::unwrap_used, clippy::expect_used))]

mod builtins;
mod ordering;

use std::sync::Arc;

use jq_value::{FunctionLookup, NativeFunction};
use rustc_hash::FxHashMap;

/// A name -> callable table. Cheap to clone (the map holds only `Arc`s);
/// a caller's custom registrations build on a clone of [`Registry::default_registry`]
/// rather than mutating the shared default in place.
#[derive(Clone, Default)]
pub struct Registry {
    functions: FxHashMap<Arc<str>, Arc<NativeFunction>>,
}

impl Registry {
    pub fn new() -> Self {
        Registry { functions: FxHashMap::default() }
    }

    pub fn register(&mut self, function: NativeFunction) {
        self.functions.insert(Arc::clone(&function.name), Arc::new(function));
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<NativeFunction>> {
        self.functions.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(|k| &**k)
    }
}

impl FunctionLookup for Registry {
    fn lookup(&self, name: &str) -> Option<Arc<NativeFunction>> {
        Registry::lookup(self, name)
    }
}

/// The default registry: `$sum`, `$count`, `$max`, `$min`, `$average`,
/// `$sort`, `$distinct`, `$keys`, `$append`, `$exists`, `$string`, `$number`,
/// `$boolean`, `$not`, `$length`, `$substring`, `$uppercase`, `$lowercase`,
/// `$join`, `$split`, `$reverse`, `$map`, `$filter`, `$reduce`, `$each`,
/// `$merge`, `$now`, `$millis`, `$memoize`.
pub fn default_registry() -> Registry {
    let mut registry = Registry::new();
    for function in builtins::all() {
        registry.register(function);
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_contains_every_named_builtin() {
        let registry = default_registry();
        for name in [
            "sum", "count", "max", "min", "average", "sort", "distinct", "keys", "append",
            "exists", "string", "number", "boolean", "not", "length", "substring", "uppercase",
            "lowercase", "join", "split", "reverse", "map", "filter", "reduce", "each", "merge",
            "now", "millis", "memoize",
        ] {
            assert!(registry.lookup(name).is_some(), "missing builtin ${name}");
        }
    }

    #[test]
    fn custom_registry_starts_empty() {
        assert!(Registry::new().is_empty());
    }
}
