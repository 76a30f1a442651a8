//! The tree-walking evaluator: one `eval` function pattern-matching over
//! every [`NodeKind`] variant, plus the helpers each arm delegates to.

use std::cmp::Ordering;
use std::sync::Arc;

use jq_ast::{Arg, BinaryOp, Callee, NodeId, NodeKind, SortDirection, SortKey, VariableRef};
use jq_error::EvalError;
use jq_value::{Caller, FunctionValue, Lambda, OrderedObject, PartialApplication, Sequence, Value};

use crate::concurrency::map_maybe_parallel;
use crate::context::EvalContext;
use crate::ordering::{compare, merge_sort_by};
use crate::signature::apply_signature;

/// Evaluate one AST node under `ctx`, returning its value. Path/filter/
/// sort/wildcard/descendant results are left as [`Value::Sequence`]
/// internally (not singleton-unwrapped) so they can keep flattening
/// correctly through further path propagation; only the top-level caller
/// ([`crate::eval_root`]) collapses the final result.
pub fn eval(ctx: &EvalContext, id: NodeId) -> Result<Value, EvalError> {
    let node = ctx.compiled.node(id);
    let pos = node.pos;
    match &node.kind {
        NodeKind::StringLiteral(s) => Ok(Value::string(s.clone())),
        NodeKind::NumberLiteral(n) => Value::number(*n).map_err(|e| e.at(pos)),
        NodeKind::BoolLiteral(b) => Ok(Value::Bool(*b)),
        NodeKind::NullLiteral => Ok(Value::Null),
        NodeKind::Name(name) | NodeKind::EscapedName(name) => Ok(field_access(&ctx.focus, name)),
        NodeKind::Variable(var) => eval_variable(ctx, var, pos),
        NodeKind::Wildcard => Ok(eval_wildcard(&ctx.focus)),
        NodeKind::Descendant => Ok(eval_descendant(&ctx.focus)),
        NodeKind::Parent => {
            ctx.parent.clone().ok_or_else(|| EvalError::parent_outside_path().at(pos))
        }
        NodeKind::Path { lhs, rhs, keep_array } => eval_path(ctx, *lhs, *rhs, *keep_array),
        NodeKind::Filter { lhs, predicate, keep_array } => {
            eval_filter(ctx, *lhs, *predicate, *keep_array)
        }
        NodeKind::Sort { lhs, keys } => eval_sort(ctx, *lhs, keys),
        NodeKind::Binary { op, lhs, rhs } => eval_binary(ctx, *op, *lhs, *rhs, pos),
        NodeKind::Neg(inner) => eval_neg(ctx, *inner, pos),
        NodeKind::Condition { cond, then_branch, else_branch } => {
            eval_condition(ctx, *cond, *then_branch, *else_branch)
        }
        NodeKind::Block(exprs) => eval_block(ctx, exprs),
        NodeKind::Bind { value, .. } => {
            // A lone `:=` reached directly (not hosted by a `Block`, e.g. a
            // single-expression lambda body): its own value is the bound
            // value, since nothing downstream can observe the binding.
            Ok(to_scalar(eval(ctx, *value)?))
        }
        NodeKind::ArrayCtor(elements) => eval_array_ctor(ctx, elements),
        NodeKind::ObjectCtor { base: Some(base), pairs, .. } => {
            eval_object_ctor_grouping(ctx, *base, pairs)
        }
        NodeKind::ObjectCtor { base: None, pairs, .. } => eval_object_ctor_prefix(ctx, pairs),
        NodeKind::FunctionCall { callee, args } => eval_function_call(ctx, callee, args),
        NodeKind::PartialApplication { callee, args } => {
            eval_partial_application(ctx, callee, args)
        }
        NodeKind::Lambda { params, body, signature, self_name } => {
            Ok(Value::Function(FunctionValue::Lambda(Arc::new(Lambda {
                params: params.clone(),
                body: *body,
                compiled: Arc::clone(&ctx.compiled),
                captured_env: ctx.env.clone(),
                self_name: self_name.clone(),
                signature: signature.clone().map(Arc::from),
            }))))
        }
        NodeKind::Placeholder => Ok(Value::Undefined),
        // The value model has no dedicated regex variant; a regex literal
        // evaluates to the merged-flag pattern text, ready to be consumed
        // by a registry built-in the same way a plain string argument
        // would be.
        NodeKind::RegexLiteral(pattern) => Ok(Value::string(pattern.clone())),
        NodeKind::Apply { lhs, rhs } => eval_apply(ctx, *lhs, *rhs),
        NodeKind::Range { from, to } => eval_range(ctx, *from, *to, pos),
        NodeKind::ContextRef | NodeKind::IndexRef => Ok(Value::Undefined),
    }
}

/// Collapse a [`Value::Sequence`] to the value observable outside path
/// propagation: empty becomes `Undefined`, a protected or multi-element
/// sequence becomes an array, a bare singleton unwraps to its element.
/// Every consumer that isn't itself doing path/array-ctor flattening calls
/// this on a child's result before using it.
pub(crate) fn to_scalar(v: Value) -> Value {
    match v {
        Value::Sequence(seq) => seq.finish(),
        other => other,
    }
}

/// Field access broadcasts over an array/sequence focus the same way a
/// `.` path step would, so a bare `name` behaves identically whether it's
/// the whole query or the right-hand side of `A.name` — nested arrays of
/// arrays recurse naturally.
fn field_access(focus: &Value, name: &str) -> Value {
    match focus {
        Value::Object(obj) => obj.get(name).cloned().unwrap_or(Value::Undefined),
        Value::Array(items) => {
            let mut seq = Sequence::new();
            for item in items {
                let v = field_access(item, name);
                if !v.is_undefined() {
                    seq.push(v);
                }
            }
            Value::Sequence(seq)
        }
        Value::Sequence(items) => {
            let mut seq = Sequence::new();
            for item in items.iter() {
                let v = field_access(item, name);
                if !v.is_undefined() {
                    seq.push(v);
                }
            }
            Value::Sequence(seq)
        }
        _ => Value::Undefined,
    }
}

fn eval_variable(ctx: &EvalContext, var: &VariableRef, pos: usize) -> Result<Value, EvalError> {
    match var {
        VariableRef::Focus => Ok(ctx.focus.clone()),
        VariableRef::Root => Ok(ctx.root.clone()),
        VariableRef::Named(name) => {
            ctx.env.lookup(name).ok_or_else(|| EvalError::undefined_variable(name).at(pos))
        }
    }
}

/// `*`: all values of an object focus, or the elements of an array focus
/// flattened one level (an array-of-arrays yields the inner arrays'
/// elements, not the inner arrays themselves).
fn eval_wildcard(focus: &Value) -> Value {
    let source: Vec<Value> = match focus {
        Value::Object(obj) => return Value::Sequence(Sequence::from_iter(obj.values().cloned())),
        Value::Array(items) => items.clone(),
        Value::Sequence(seq) => seq.items().to_vec(),
        _ => return Value::Undefined,
    };
    let mut flat = Vec::with_capacity(source.len());
    for item in source {
        match item {
            Value::Array(inner) => flat.extend(inner),
            other => flat.push(other),
        }
    }
    Value::Sequence(Sequence::from_iter(flat))
}

/// `**`: pre-order traversal of every descendant of the focus (the focus
/// itself excluded) — each child is emitted, then its own descendants,
/// before moving to the next sibling.
fn eval_descendant(focus: &Value) -> Value {
    let mut out = Vec::new();
    collect_descendants(focus, &mut out);
    Value::Sequence(Sequence::from_iter(out))
}

fn collect_descendants(v: &Value, out: &mut Vec<Value>) {
    match v {
        Value::Object(obj) => {
            for val in obj.values() {
                out.push(val.clone());
                collect_descendants(val, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                out.push(item.clone());
                collect_descendants(item, out);
            }
        }
        Value::Sequence(seq) => {
            for item in seq.iter() {
                out.push(item.clone());
                collect_descendants(item, out);
            }
        }
        _ => {}
    }
}

/// The elements a `Path` step iterates over: a scalar or an object is a
/// one-element sequence containing itself; an array/sequence is iterated
/// element-wise unless `keep_array` protects it, in which case it is
/// itself the sole element of the next step.
fn elements_for_path(value: Value, keep_array: bool) -> Vec<Value> {
    match value {
        Value::Undefined => Vec::new(),
        Value::Object(_) => vec![value],
        Value::Array(_) | Value::Sequence(_) if keep_array => vec![value],
        Value::Array(items) => items,
        Value::Sequence(seq) => seq.into_items(),
        other => vec![other],
    }
}

fn eval_path(ctx: &EvalContext, lhs: NodeId, rhs: NodeId, keep_array: bool) -> Result<Value, EvalError> {
    ctx.check_cancelled()?;
    let lhs_val = eval(ctx, lhs)?;
    let elements = elements_for_path(lhs_val, keep_array);
    let mapped = map_maybe_parallel(ctx.shared.concurrent, elements, |elem| {
        let step_ctx = ctx.with_focus(elem);
        eval(&step_ctx, rhs)
    })?;
    let mut seq = Sequence::new();
    for v in mapped {
        if !v.is_undefined() {
            seq.push(v);
        }
    }
    if keep_array {
        seq.set_keep_singleton(true);
    }
    Ok(Value::Sequence(seq))
}

fn eval_filter(
    ctx: &EvalContext,
    lhs: NodeId,
    predicate: Option<NodeId>,
    keep_array: bool,
) -> Result<Value, EvalError> {
    ctx.check_cancelled()?;
    let lhs_val = eval(ctx, lhs)?;
    let elements = lhs_val.iter_as_sequence();

    let Some(predicate) = predicate else {
        // `A[]`: match every element, marking the result keep_array so
        // downstream path steps don't flatten it away.
        let mut seq = Sequence::from_iter(elements);
        seq.set_keep_singleton(true);
        return Ok(Value::Sequence(seq));
    };

    let n = elements.len() as i64;
    let indexed: Vec<(usize, Value)> = elements.iter().cloned().enumerate().collect();
    let flags = map_maybe_parallel(ctx.shared.concurrent, indexed, |(i, elem)| {
        let step_ctx = ctx.with_focus(elem);
        let value = to_scalar(eval(&step_ctx, predicate)?);
        Ok(match value {
            Value::Number(k) => {
                let idx = k.floor() as i64;
                let normalized = ((idx % n) + n) % n;
                normalized == i as i64
            }
            Value::Undefined => false,
            other => other.is_truthy(),
        })
    })?;

    let mut result = Sequence::new();
    for (elem, keep) in elements.into_iter().zip(flags) {
        if keep {
            result.push(elem);
        }
    }
    if keep_array {
        result.set_keep_singleton(true);
    }
    Ok(Value::Sequence(result))
}

fn eval_sort(ctx: &EvalContext, lhs: NodeId, keys: &[SortKey]) -> Result<Value, EvalError> {
    let elements = eval(ctx, lhs)?.iter_as_sequence();
    let sorted = merge_sort_by(elements, &mut |a, b| compare_by_keys(ctx, keys, a, b))?;
    Ok(Value::Sequence(Sequence::from_iter(sorted)))
}

fn compare_by_keys(
    ctx: &EvalContext,
    keys: &[SortKey],
    a: &Value,
    b: &Value,
) -> Result<Ordering, EvalError> {
    for key in keys {
        let ord = match key.direction {
            SortDirection::Comparator => {
                let f = eval(ctx, key.expr)?;
                let greater = to_scalar(apply_function(ctx, &f, vec![a.clone(), b.clone()])?).is_truthy();
                if greater {
                    Ordering::Greater
                } else {
                    let lesser =
                        to_scalar(apply_function(ctx, &f, vec![b.clone(), a.clone()])?).is_truthy();
                    if lesser {
                        Ordering::Less
                    } else {
                        Ordering::Equal
                    }
                }
            }
            SortDirection::Ascending | SortDirection::Descending => {
                let ka = to_scalar(eval(&ctx.with_focus(a.clone()), key.expr)?);
                let kb = to_scalar(eval(&ctx.with_focus(b.clone()), key.expr)?);
                let ord = compare(&ka, &kb)?;
                if key.direction == SortDirection::Descending {
                    ord.reverse()
                } else {
                    ord
                }
            }
        };
        if ord != Ordering::Equal {
            return Ok(ord);
        }
    }
    Ok(Ordering::Equal)
}

fn eval_binary(
    ctx: &EvalContext,
    op: BinaryOp,
    lhs: NodeId,
    rhs: NodeId,
    pos: usize,
) -> Result<Value, EvalError> {
    match op {
        BinaryOp::And => {
            let l = to_scalar(eval(ctx, lhs)?);
            if !l.is_truthy() {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(to_scalar(eval(ctx, rhs)?).is_truthy()))
        }
        BinaryOp::Or => {
            let l = to_scalar(eval(ctx, lhs)?);
            if l.is_truthy() {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(to_scalar(eval(ctx, rhs)?).is_truthy()))
        }
        BinaryOp::Coalesce => {
            let l = to_scalar(eval(ctx, lhs)?);
            if l.is_undefined() {
                Ok(to_scalar(eval(ctx, rhs)?))
            } else {
                Ok(l)
            }
        }
        _ => {
            let l = to_scalar(eval(ctx, lhs)?);
            let r = to_scalar(eval(ctx, rhs)?);
            eval_binary_values(op, l, r, pos)
        }
    }
}

fn eval_binary_values(op: BinaryOp, l: Value, r: Value, pos: usize) -> Result<Value, EvalError> {
    match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            arith(op, l, r, pos)
        }
        BinaryOp::Concat => Ok(Value::string(format!("{}{}", l.display_string(), r.display_string()))),
        BinaryOp::Eq => Ok(eq_result(l, r, false)),
        BinaryOp::Ne => Ok(eq_result(l, r, true)),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => compare_result(op, l, r, pos),
        BinaryOp::In => {
            let member = r.iter_as_sequence().iter().any(|x| x.structural_eq(&l));
            Ok(Value::Bool(member))
        }
        BinaryOp::And | BinaryOp::Or | BinaryOp::Coalesce => {
            unreachable!("short-circuit operators are handled in eval_binary")
        }
    }
}

/// `=`/`!=` are three-valued: either side `Undefined` makes the whole
/// comparison `Undefined` (not `false`) rather than falling back to
/// [`Value::structural_eq`]'s "two undefineds are equal" rule, which is
/// reserved for `distinct`/group-by-style structural comparisons.
fn eq_result(l: Value, r: Value, negate: bool) -> Value {
    if l.is_undefined() || r.is_undefined() {
        return Value::Undefined;
    }
    let eq = l.structural_eq(&r);
    Value::Bool(if negate { !eq } else { eq })
}

fn compare_result(op: BinaryOp, l: Value, r: Value, pos: usize) -> Result<Value, EvalError> {
    if l.is_undefined() || r.is_undefined() {
        return Ok(Value::Undefined);
    }
    let ord = compare(&l, &r).map_err(|e| e.at(pos))?;
    let result = match op {
        BinaryOp::Lt => ord == Ordering::Less,
        BinaryOp::Le => ord != Ordering::Greater,
        BinaryOp::Gt => ord == Ordering::Greater,
        BinaryOp::Ge => ord != Ordering::Less,
        _ => unreachable!(),
    };
    Ok(Value::Bool(result))
}

fn arith(op: BinaryOp, l: Value, r: Value, pos: usize) -> Result<Value, EvalError> {
    let (Value::Number(a), Value::Number(b)) = (&l, &r) else {
        return Err(EvalError::invalid_operand_type(binary_op_symbol(op)).at(pos));
    };
    let (a, b) = (*a, *b);
    match op {
        BinaryOp::Add => Value::number(a + b).map_err(|e| e.at(pos)),
        BinaryOp::Sub => Value::number(a - b).map_err(|e| e.at(pos)),
        BinaryOp::Mul => Value::number(a * b).map_err(|e| e.at(pos)),
        BinaryOp::Div => {
            if b == 0.0 {
                return Err(EvalError::division_by_zero().at(pos));
            }
            Value::number(a / b).map_err(|e| e.at(pos))
        }
        BinaryOp::Mod => {
            if b == 0.0 {
                return Err(EvalError::modulo_by_zero().at(pos));
            }
            Value::number(a % b).map_err(|e| e.at(pos))
        }
        _ => unreachable!(),
    }
}

fn binary_op_symbol(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        _ => "?",
    }
}

fn eval_neg(ctx: &EvalContext, inner: NodeId, pos: usize) -> Result<Value, EvalError> {
    match to_scalar(eval(ctx, inner)?) {
        Value::Number(n) => Value::number(-n).map_err(|e| e.at(pos)),
        other => Err(EvalError::negation_of_non_number(other.type_name()).at(pos)),
    }
}

fn eval_condition(
    ctx: &EvalContext,
    cond: NodeId,
    then_branch: NodeId,
    else_branch: Option<NodeId>,
) -> Result<Value, EvalError> {
    if to_scalar(eval(ctx, cond)?).is_truthy() {
        eval(ctx, then_branch)
    } else {
        match else_branch {
            Some(e) => eval(ctx, e),
            None => Ok(Value::Undefined),
        }
    }
}

fn eval_block(ctx: &EvalContext, exprs: &[NodeId]) -> Result<Value, EvalError> {
    let mut env = ctx.env.child();
    let mut result = Value::Undefined;
    for &id in exprs {
        ctx.check_cancelled()?;
        let step_ctx = ctx.with_env(env.clone());
        if let NodeKind::Bind { name, value } = &ctx.compiled.node(id).kind {
            let v = to_scalar(eval(&step_ctx, *value)?);
            env = env.bind(name.clone(), v.clone());
            result = v;
        } else {
            result = eval(&step_ctx, id)?;
        }
    }
    Ok(result)
}

/// `[e1, e2, ...]`: each element's value flattens one level into the array
/// unless it is a `keep_array`-protected sequence, in which case it
/// collapses to its own singleton/array form and is pushed as one item.
/// `Undefined` elements are dropped.
fn eval_array_ctor(ctx: &EvalContext, elements: &[NodeId]) -> Result<Value, EvalError> {
    let mut items = Vec::with_capacity(elements.len());
    for &id in elements {
        match eval(ctx, id)? {
            Value::Undefined => {}
            Value::Sequence(seq) if !seq.keep_singleton() => items.extend(seq.into_items()),
            Value::Sequence(seq) => items.push(seq.finish()),
            other => items.push(other),
        }
    }
    Ok(Value::Array(items))
}

fn eval_object_ctor_prefix(ctx: &EvalContext, pairs: &[(NodeId, NodeId)]) -> Result<Value, EvalError> {
    let mut obj = OrderedObject::new();
    for (key_id, value_id) in pairs {
        let key = to_scalar(eval(ctx, *key_id)?);
        let Value::String(key) = key else {
            return Err(EvalError::invalid_operand_type("{}").at(ctx.compiled.node(*key_id).pos));
        };
        let value = to_scalar(eval(ctx, *value_id)?);
        if !value.is_undefined() {
            obj.insert(key.to_string(), value);
        }
    }
    Ok(Value::Object(obj))
}

/// `base{key: value, ...}`: evaluate `base` to a sequence, group its
/// elements by each pair's key expression (structural string equality,
/// first-seen order), then evaluate the value expression once per group
/// with the whole group (as a sequence) bound as focus. Multiple pairs
/// each contribute their own grouping to the one resulting object; a
/// later pair's key overwrites an earlier one's value at the same name,
/// consistent with `OrderedObject`'s last-write-wins insert.
fn eval_object_ctor_grouping(
    ctx: &EvalContext,
    base: NodeId,
    pairs: &[(NodeId, NodeId)],
) -> Result<Value, EvalError> {
    let elements = eval(ctx, base)?.iter_as_sequence();
    let mut result = OrderedObject::new();
    for (key_id, value_id) in pairs {
        let mut groups: Vec<(Arc<str>, Vec<Value>)> = Vec::new();
        for elem in &elements {
            let key_val = to_scalar(eval(&ctx.with_focus(elem.clone()), *key_id)?);
            let Value::String(key_str) = key_val else {
                return Err(EvalError::invalid_operand_type("{}").at(ctx.compiled.node(*key_id).pos));
            };
            match groups.iter_mut().find(|(k, _)| *k == key_str) {
                Some((_, members)) => members.push(elem.clone()),
                None => groups.push((key_str, vec![elem.clone()])),
            }
        }
        for (key_str, members) in groups {
            let group_ctx = ctx.with_focus(Value::Sequence(Sequence::from_iter(members)));
            let value = to_scalar(eval(&group_ctx, *value_id)?);
            if !value.is_undefined() {
                result.insert(key_str.to_string(), value);
            }
        }
    }
    Ok(Value::Object(result))
}

fn resolve_callee(ctx: &EvalContext, callee: &Callee) -> Result<Value, EvalError> {
    match callee {
        Callee::Name(name) => {
            if let Some(v) = ctx.env.lookup(name) {
                require_function(v)
            } else if let Some(native) = ctx.shared.registry.lookup(name) {
                Ok(Value::Function(FunctionValue::Native(native)))
            } else {
                Err(EvalError::undefined_function(name))
            }
        }
        Callee::Expr(id) => require_function(to_scalar(eval(ctx, *id)?)),
    }
}

fn require_function(v: Value) -> Result<Value, EvalError> {
    if matches!(v, Value::Function(_)) {
        Ok(v)
    } else {
        Err(EvalError::invocation_of_non_function())
    }
}

fn eval_function_call(ctx: &EvalContext, callee: &Callee, args: &[NodeId]) -> Result<Value, EvalError> {
    let func = resolve_callee(ctx, callee)?;
    let mut values = Vec::with_capacity(args.len());
    for &id in args {
        values.push(to_scalar(eval(ctx, id)?));
    }
    apply_function(ctx, &func, values)
}

fn eval_partial_application(
    ctx: &EvalContext,
    callee: &Callee,
    args: &[Arg],
) -> Result<Value, EvalError> {
    let Value::Function(base) = resolve_callee(ctx, callee)? else {
        return Err(EvalError::invocation_of_non_function());
    };
    let mut bound = Vec::with_capacity(args.len());
    for a in args {
        match a {
            Arg::Expr(id) => bound.push(Some(to_scalar(eval(ctx, *id)?))),
            Arg::Placeholder => bound.push(None),
        }
    }
    Ok(Value::Function(FunctionValue::Partial(Arc::new(PartialApplication { base, bound_args: bound }))))
}

fn eval_apply(ctx: &EvalContext, lhs: NodeId, rhs: NodeId) -> Result<Value, EvalError> {
    let piped = to_scalar(eval(ctx, lhs)?);
    if let NodeKind::FunctionCall { callee, args } = &ctx.compiled.node(rhs).kind {
        let func = resolve_callee(ctx, callee)?;
        let mut values = Vec::with_capacity(args.len() + 1);
        values.push(piped);
        for &id in args {
            values.push(to_scalar(eval(ctx, id)?));
        }
        apply_function(ctx, &func, values)
    } else {
        let f = to_scalar(eval(ctx, rhs)?);
        apply_function(ctx, &f, vec![piped])
    }
}

fn eval_range(ctx: &EvalContext, from: NodeId, to: NodeId, pos: usize) -> Result<Value, EvalError> {
    let from = to_scalar(eval(ctx, from)?);
    let to = to_scalar(eval(ctx, to)?);
    let (Value::Number(from), Value::Number(to)) = (&from, &to) else {
        return Err(EvalError::invalid_operand_type("..").at(pos));
    };
    if from.fract() != 0.0 || to.fract() != 0.0 {
        return Err(EvalError::range_bounds_not_integral().at(pos));
    }
    let (lo, hi) = (*from as i64, *to as i64);
    if hi < lo {
        return Ok(Value::Sequence(Sequence::new()));
    }
    let len = hi - lo + 1;
    const MAX_RANGE_LEN: i64 = 10_000_000;
    if len > MAX_RANGE_LEN {
        return Err(EvalError::range_too_large(len as f64).at(pos));
    }
    let items: Vec<Value> = (lo..=hi).map(|n| Value::Number(n as f64)).collect();
    Ok(Value::Sequence(Sequence::from_iter(items)))
}

/// Invoke a function value: a lambda (new environment frame, recursion
/// depth tracked), a native built-in (via the [`Caller`] capability), a
/// partial application (fills its placeholder slots from `args`, in
/// order), or a memoized wrapper.
pub fn apply_function(ctx: &EvalContext, f: &Value, args: Vec<Value>) -> Result<Value, EvalError> {
    let Value::Function(func) = f else {
        return Err(EvalError::invocation_of_non_function());
    };
    match func {
        FunctionValue::Lambda(l) => call_lambda(ctx, l, args),
        FunctionValue::Native(n) => {
            let args = apply_signature(n.signature.as_deref(), args, &ctx.focus)?;
            let mut caller = EvaluatorCaller { ctx };
            (n.func)(&mut caller, &args)
        }
        FunctionValue::Partial(p) => {
            let mut remaining = args.into_iter();
            let filled: Vec<Value> = p
                .bound_args
                .iter()
                .map(|slot| match slot {
                    Some(v) => v.clone(),
                    None => remaining.next().unwrap_or(Value::Undefined),
                })
                .collect();
            apply_function(ctx, &Value::Function(p.base.clone()), filled)
        }
        FunctionValue::Memoized(m) => {
            let mut caller = EvaluatorCaller { ctx };
            m.call(&mut caller, args)
        }
    }
}

fn call_lambda(ctx: &EvalContext, lambda: &Arc<Lambda>, args: Vec<Value>) -> Result<Value, EvalError> {
    // Checked at every lambda entry, not just path/filter/block nodes: a
    // tight native loop that calls back into a lambda once per element
    // (`$reduce`, `$map`, `$filter`, `$sort`, `$each`) would otherwise
    // never observe cancellation, since that loop lives outside the
    // evaluator, in `jq-functions`, and has no direct access to the eval
    // context.
    ctx.check_cancelled()?;
    ctx.shared.enter_call()?;
    let result = call_lambda_inner(ctx, lambda, args);
    ctx.shared.exit_call();
    result
}

fn call_lambda_inner(
    ctx: &EvalContext,
    lambda: &Arc<Lambda>,
    args: Vec<Value>,
) -> Result<Value, EvalError> {
    let mut env = lambda.captured_env.clone();
    if let Some(name) = &lambda.self_name {
        env = env.bind(name.clone(), Value::Function(FunctionValue::Lambda(Arc::clone(lambda))));
    }
    let args = apply_signature(lambda.signature.as_deref(), args, &ctx.focus)?;
    let bindings: Vec<(String, Value)> = lambda
        .params
        .iter()
        .enumerate()
        .map(|(i, p)| (p.clone(), args.get(i).cloned().unwrap_or(Value::Undefined)))
        .collect();
    let env = env.child_with(bindings);
    let body_ctx = EvalContext {
        shared: Arc::clone(&ctx.shared),
        compiled: Arc::clone(&lambda.compiled),
        env,
        focus: ctx.focus.clone(),
        parent: ctx.parent.clone(),
        root: ctx.root.clone(),
    };
    eval(&body_ctx, lambda.body)
}

/// The evaluator's implementation of [`Caller`]: how native higher-order
/// built-ins (`$map`, `$filter`, `$reduce`, `$sort`, `$each`) call back
/// into function values they were handed as arguments.
struct EvaluatorCaller<'a> {
    ctx: &'a EvalContext,
}

impl Caller for EvaluatorCaller<'_> {
    fn call(&mut self, f: &Value, args: Vec<Value>) -> Result<Value, EvalError> {
        apply_function(self.ctx, f, args)
    }

    fn now_millis(&self) -> f64 {
        self.ctx.shared.now_millis()
    }

    fn is_cancelled(&self) -> bool {
        self.ctx.shared.is_cancelled()
    }
}
