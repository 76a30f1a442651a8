//! Variable environment: a parent-pointer chain of frames.
//!
//! Frames are immutable once created: a lambda captures the environment
//! chain by cloning the (cheap, `Arc`-backed) handle, and `:=` grows the
//! chain by pushing a *new* frame rather than mutating an existing one.
//! That is what makes the append-only/no-retroactive-mutation guarantee in
//! the design notes hold without any interior mutability: a closure
//! captured before a later `:=` keeps pointing at the old tip of the chain
//! and simply never sees the new frame appended after it.

use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::value::Value;

struct Frame {
    vars: FxHashMap<String, Value>,
    parent: Option<Environment>,
}

/// A variable scope. Cheap to clone (one `Arc` bump); lookup walks from the
/// innermost frame outward.
#[derive(Clone)]
pub struct Environment(Arc<Frame>);

impl Environment {
    /// The empty root environment (no bindings, no parent).
    pub fn root() -> Self {
        Environment(Arc::new(Frame { vars: FxHashMap::default(), parent: None }))
    }

    /// Root environment seeded with host bindings.
    pub fn with_bindings(bindings: impl IntoIterator<Item = (String, Value)>) -> Self {
        let vars: FxHashMap<String, Value> = bindings.into_iter().collect();
        Environment(Arc::new(Frame { vars, parent: None }))
    }

    /// A fresh empty child frame — used when entering a block or a lambda
    /// body before any parameters/bindings are known.
    pub fn child(&self) -> Self {
        Environment(Arc::new(Frame { vars: FxHashMap::default(), parent: Some(self.clone()) }))
    }

    /// A child frame with one or more bindings established atomically —
    /// used to bind a lambda's parameters when it is called.
    pub fn child_with(&self, bindings: impl IntoIterator<Item = (String, Value)>) -> Self {
        let vars: FxHashMap<String, Value> = bindings.into_iter().collect();
        Environment(Arc::new(Frame { vars, parent: Some(self.clone()) }))
    }

    /// `:=`: grow the chain by one single-entry frame.
    pub fn bind(&self, name: impl Into<String>, value: Value) -> Self {
        self.child_with([(name.into(), value)])
    }

    /// Walk from the innermost frame outward, returning the first match.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        let mut frame = &self.0;
        loop {
            if let Some(v) = frame.vars.get(name) {
                return Some(v.clone());
            }
            match &frame.parent {
                Some(parent) => frame = &parent.0,
                None => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_outward() {
        let root = Environment::root().bind("x", Value::Number(1.0));
        let inner = root.child().bind("y", Value::Number(2.0));
        assert_eq!(inner.lookup("x"), Some(Value::Number(1.0)));
        assert_eq!(inner.lookup("y"), Some(Value::Number(2.0)));
        assert_eq!(inner.lookup("z"), None);
    }

    #[test]
    fn closures_do_not_see_later_binds() {
        let env = Environment::root();
        let captured = env.clone();
        let _later = env.bind("x", Value::Number(1.0));
        assert_eq!(captured.lookup("x"), None);
    }

    #[test]
    fn inner_binding_shadows_outer() {
        let outer = Environment::root().bind("x", Value::Number(1.0));
        let inner = outer.bind("x", Value::Number(2.0));
        assert_eq!(inner.lookup("x"), Some(Value::Number(2.0)));
        assert_eq!(outer.lookup("x"), Some(Value::Number(1.0)));
    }
}
