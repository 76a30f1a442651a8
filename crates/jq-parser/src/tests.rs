use super::*;

fn root_kind(src: &str) -> NodeKind {
    let compiled = compile(src).expect("should parse");
    compiled.node(compiled.root()).kind.clone()
}

#[test]
fn precedence_mul_over_add() {
    // 1 + 2 * 3 should parse as 1 + (2 * 3).
    let kind = root_kind("1 + 2 * 3");
    match kind {
        NodeKind::Binary { op: BinaryOp::Add, rhs, .. } => {
            let compiled = compile("1 + 2 * 3").expect("parses");
            assert!(matches!(
                compiled.node(rhs).kind,
                NodeKind::Binary { op: BinaryOp::Mul, .. }
            ));
        }
        other => panic!("expected Add at root, got {other:?}"),
    }
}

#[test]
fn comparison_binds_tighter_than_and() {
    // 2 + 3 > 4 and 5 < 10 => (2+3 > 4) and (5 < 10)
    let kind = root_kind("2 + 3 > 4 and 5 < 10");
    assert!(matches!(kind, NodeKind::Binary { op: BinaryOp::And, .. }));
}

#[test]
fn ternary_else_arm_is_right_associative() {
    // a ? b : c ? d : e  =>  a ? b : (c ? d : e)
    let compiled = compile("a ? b : c ? d : e").expect("parses");
    match compiled.node(compiled.root()).kind {
        NodeKind::Condition { else_branch: Some(else_id), .. } => {
            assert!(matches!(
                compiled.node(else_id).kind,
                NodeKind::Condition { .. }
            ));
        }
        ref other => panic!("expected outer Condition, got {other:?}"),
    }
}

#[test]
fn bind_is_right_associative_and_names_a_recursive_lambda() {
    let compiled = compile("$fact := function($n){ $n }").expect("parses");
    match &compiled.node(compiled.root()).kind {
        NodeKind::Bind { name, value } => {
            assert_eq!(name, "fact");
            match &compiled.node(*value).kind {
                NodeKind::Lambda { self_name, .. } => {
                    assert_eq!(self_name.as_deref(), Some("fact"));
                }
                other => panic!("expected Lambda, got {other:?}"),
            }
        }
        other => panic!("expected Bind, got {other:?}"),
    }
}

#[test]
fn compile_source_round_trips_verbatim() {
    let src = "users[age > 30].name";
    let compiled = compile(src).expect("parses");
    assert_eq!(&*compiled.source, src);
}

#[test]
fn path_chain_builds_left_nested_nodes() {
    // a.b.c => Path{ Path{a, b}, c }
    let compiled = compile("a.b.c").expect("parses");
    match &compiled.node(compiled.root()).kind {
        NodeKind::Path { lhs, rhs, .. } => {
            assert!(matches!(compiled.node(*rhs).kind, NodeKind::Name(ref n) if n == "c"));
            assert!(matches!(compiled.node(*lhs).kind, NodeKind::Path { .. }));
        }
        other => panic!("expected Path, got {other:?}"),
    }
}

#[test]
fn empty_bracket_filter_sets_keep_array() {
    let compiled = compile("items[]").expect("parses");
    assert!(matches!(
        compiled.node(compiled.root()).kind,
        NodeKind::Filter { predicate: None, keep_array: true, .. }
    ));
}

#[test]
fn keep_array_propagates_through_chained_dot() {
    let compiled = compile("items[].name").expect("parses");
    assert!(matches!(
        compiled.node(compiled.root()).kind,
        NodeKind::Path { keep_array: true, .. }
    ));
}

#[test]
fn placeholder_promotes_call_to_partial_application() {
    let compiled = compile("add(1, ?)").expect("parses");
    assert!(matches!(
        compiled.node(compiled.root()).kind,
        NodeKind::PartialApplication { .. }
    ));
}

#[test]
fn call_with_bare_name_callee_stores_name() {
    let compiled = compile("sum(prices)").expect("parses");
    match &compiled.node(compiled.root()).kind {
        NodeKind::FunctionCall { callee: Callee::Name(name), .. } => assert_eq!(name, "sum"),
        other => panic!("expected FunctionCall, got {other:?}"),
    }
}

#[test]
fn apply_operator_chains_left_associatively() {
    // 5 ~> f ~> g parses as Apply{Apply{5,f}, g}
    let compiled = compile("5 ~> f ~> g").expect("parses");
    match &compiled.node(compiled.root()).kind {
        NodeKind::Apply { lhs, .. } => {
            assert!(matches!(compiled.node(*lhs).kind, NodeKind::Apply { .. }));
        }
        other => panic!("expected Apply, got {other:?}"),
    }
}

#[test]
fn sort_key_with_two_arg_lambda_is_a_comparator() {
    let compiled = compile("$sort(1..5, function($a,$b){$a < $b})").expect("parses");
    match &compiled.node(compiled.root()).kind {
        NodeKind::FunctionCall { .. } => {}
        other => panic!("expected FunctionCall for the $sort builtin, got {other:?}"),
    }

    let compiled = compile("xs ^ (function($a,$b){$a.k > $b.k})").expect("parses");
    match &compiled.node(compiled.root()).kind {
        NodeKind::Sort { keys, .. } => {
            assert_eq!(keys[0].direction, SortDirection::Comparator);
        }
        other => panic!("expected Sort, got {other:?}"),
    }
}

#[test]
fn ascending_and_descending_sort_markers() {
    let compiled = compile("xs ^ (<name, >age)").expect("parses");
    match &compiled.node(compiled.root()).kind {
        NodeKind::Sort { keys, .. } => {
            assert_eq!(keys[0].direction, SortDirection::Ascending);
            assert_eq!(keys[1].direction, SortDirection::Descending);
        }
        other => panic!("expected Sort, got {other:?}"),
    }
}

#[test]
fn grouping_constructor_is_distinguished_from_plain_object() {
    let plain = compile("{\"a\": 1}").expect("parses");
    assert!(matches!(
        plain.node(plain.root()).kind,
        NodeKind::ObjectCtor { is_grouping: false, .. }
    ));

    let grouping = compile("users{department: name}").expect("parses");
    assert!(matches!(
        grouping.node(grouping.root()).kind,
        NodeKind::ObjectCtor { is_grouping: true, .. }
    ));
}

#[test]
fn lambda_signature_is_captured_verbatim_and_body_parses() {
    let compiled = compile("function($x)<n-:n>{ $x }").expect("parses");
    match &compiled.node(compiled.root()).kind {
        NodeKind::Lambda { signature, params, .. } => {
            assert_eq!(signature.as_deref(), Some("<n-:n>"));
            assert_eq!(params, &vec!["x".to_string()]);
        }
        other => panic!("expected Lambda, got {other:?}"),
    }
}

#[test]
fn lambda_keyword_synonym_is_accepted() {
    assert!(compile("λ($x){ $x }").is_ok());
}

#[test]
fn division_vs_regex_is_context_sensitive() {
    // After a value, '/' is division.
    let compiled = compile("10 / 2").expect("parses");
    assert!(matches!(
        compiled.node(compiled.root()).kind,
        NodeKind::Binary { op: BinaryOp::Div, .. }
    ));

    // In prefix (nud) position, '/' starts a regex literal.
    let compiled = compile("/abc/").expect("parses");
    assert!(matches!(compiled.node(compiled.root()).kind, NodeKind::RegexLiteral(_)));
}

#[test]
fn unterminated_string_is_rejected() {
    assert!(compile("\"abc").is_err());
}

#[test]
fn unclosed_comment_is_rejected() {
    assert!(compile("1 + /* oops").is_err());
}

#[test]
fn unexpected_trailing_token_is_rejected() {
    assert!(compile("1 2").is_err());
}

#[test]
fn bind_requires_a_named_variable_on_the_left() {
    assert!(compile("1 := 2").is_err());
}

#[test]
fn recovery_collects_errors_in_array_elements_but_still_fails() {
    let (result, errors) = compile_with_recovery("[1, , 3]");
    assert!(result.is_err());
    assert!(!errors.is_empty());
}

#[test]
fn deeply_nested_groups_trip_the_parser_recursion_budget_instead_of_overflowing_the_stack() {
    let deeply_nested = "(".repeat(1000) + "1" + &")".repeat(1000);
    let err = compile_with_max_depth(&deeply_nested, 64).expect_err("should hit the depth cap");
    assert_eq!(err.code.as_str(), "S0303");
}

#[test]
fn a_generous_depth_budget_still_parses_moderate_nesting() {
    let nested = "(".repeat(50) + "1" + &")".repeat(50);
    assert!(compile(&nested).is_ok());
}

proptest::proptest! {
    #[test]
    fn arbitrary_name_paths_round_trip_source(a in "[a-z][a-z0-9]{0,5}", b in "[a-z][a-z0-9]{0,5}") {
        let src = format!("{a}.{b}");
        if let Ok(compiled) = compile(&src) {
            proptest::prop_assert_eq!(&*compiled.source, src.as_str());
        }
    }
}
