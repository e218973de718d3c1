//! Runtime value semantics: truthiness, equality, coercion, builtins.

use std::rc::Rc;

use machine_dialect::hir::{BinaryOp, CompareOp, UnaryOp};
use machine_dialect::vm::builtins;
use machine_dialect::vm::ops;
use machine_dialect::vm::{Value, VmErrorKind};

fn text(s: &str) -> Value {
    Value::Str(Rc::from(s))
}

#[test]
fn truthiness_follows_the_falsy_set() {
    assert!(!Value::Empty.is_truthy());
    assert!(!Value::Bool(false).is_truthy());
    assert!(!Value::Int(0).is_truthy());
    assert!(!Value::Float(0.0).is_truthy());
    assert!(!text("").is_truthy());
    assert!(Value::Bool(true).is_truthy());
    assert!(Value::Int(-1).is_truthy());
    assert!(Value::Float(0.5).is_truthy());
    assert!(text("x").is_truthy());
}

#[test]
fn value_equality_coerces_across_numerics() {
    assert!(ops::value_eq(&Value::Int(5), &Value::Float(5.0)));
    assert!(ops::value_eq(&Value::Float(5.0), &Value::Int(5)));
    assert!(!ops::value_eq(&Value::Int(5), &Value::Float(5.5)));
}

#[test]
fn strict_equality_requires_the_same_tag() {
    assert!(!ops::strict_eq(&Value::Int(5), &Value::Float(5.0)));
    assert!(ops::strict_eq(&Value::Int(5), &Value::Int(5)));
    assert!(ops::strict_eq(&Value::Float(5.0), &Value::Float(5.0)));
}

#[test]
fn empty_is_only_equal_to_empty() {
    for other in [Value::Int(0), Value::Bool(false), text("")] {
        assert!(!ops::value_eq(&Value::Empty, &other), "{other:?}");
        assert!(!ops::strict_eq(&Value::Empty, &other), "{other:?}");
    }
    assert!(ops::value_eq(&Value::Empty, &Value::Empty));
    assert!(ops::strict_eq(&Value::Empty, &Value::Empty));
}

#[test]
fn integer_arithmetic_wraps_at_the_boundaries() {
    let max = Value::Int(i64::MAX);
    let min = Value::Int(i64::MIN);
    assert_eq!(
        ops::binary(BinaryOp::Add, &max, &Value::Int(1)).unwrap(),
        Value::Int(i64::MIN)
    );
    assert_eq!(
        ops::binary(BinaryOp::Sub, &min, &Value::Int(1)).unwrap(),
        Value::Int(i64::MAX)
    );
    assert_eq!(
        ops::binary(BinaryOp::Mul, &max, &Value::Int(2)).unwrap(),
        Value::Int(i64::MAX.wrapping_mul(2))
    );
    assert_eq!(
        ops::unary(UnaryOp::Neg, &min).unwrap(),
        Value::Int(i64::MIN)
    );
}

#[test]
fn mixed_arithmetic_promotes_to_float() {
    assert_eq!(
        ops::binary(BinaryOp::Add, &Value::Int(1), &Value::Float(0.5)).unwrap(),
        Value::Float(1.5)
    );
    assert_eq!(
        ops::binary(BinaryOp::Div, &Value::Float(1.0), &Value::Int(4)).unwrap(),
        Value::Float(0.25)
    );
}

#[test]
fn string_concatenation_needs_two_strings() {
    assert_eq!(
        ops::binary(BinaryOp::Add, &text("ab"), &text("cd")).unwrap(),
        text("abcd")
    );
    let error = ops::binary(BinaryOp::Add, &text("ab"), &Value::Int(1)).unwrap_err();
    assert_eq!(error.kind, VmErrorKind::TypeMismatch);
}

#[test]
fn division_by_zero_raises_for_int_and_float() {
    for (left, right) in [
        (Value::Int(1), Value::Int(0)),
        (Value::Float(1.0), Value::Float(0.0)),
        (Value::Int(1), Value::Float(0.0)),
    ] {
        let error = ops::binary(BinaryOp::Div, &left, &right).unwrap_err();
        assert_eq!(error.kind, VmErrorKind::DivisionByZero);
        let error = ops::binary(BinaryOp::Mod, &left, &right).unwrap_err();
        assert_eq!(error.kind, VmErrorKind::DivisionByZero);
    }
}

#[test]
fn integer_division_truncates() {
    assert_eq!(
        ops::binary(BinaryOp::Div, &Value::Int(7), &Value::Int(2)).unwrap(),
        Value::Int(3)
    );
    assert_eq!(
        ops::binary(BinaryOp::Div, &Value::Int(-7), &Value::Int(2)).unwrap(),
        Value::Int(-3)
    );
}

#[test]
fn power_handles_negative_exponents_as_float() {
    assert_eq!(
        ops::binary(BinaryOp::Pow, &Value::Int(2), &Value::Int(10)).unwrap(),
        Value::Int(1024)
    );
    assert_eq!(
        ops::binary(BinaryOp::Pow, &Value::Int(2), &Value::Int(-1)).unwrap(),
        Value::Float(0.5)
    );
}

#[test]
fn ordering_works_for_numbers_and_strings() {
    assert_eq!(
        ops::compare(CompareOp::Lt, &Value::Int(1), &Value::Float(1.5)).unwrap(),
        Value::Bool(true)
    );
    assert_eq!(
        ops::compare(CompareOp::Gte, &text("b"), &text("a")).unwrap(),
        Value::Bool(true)
    );
    let error = ops::compare(CompareOp::Lt, &Value::Int(1), &text("a")).unwrap_err();
    assert_eq!(error.kind, VmErrorKind::TypeMismatch);
}

#[test]
fn logical_ops_yield_the_deciding_operand() {
    assert_eq!(
        ops::logical_and(Value::Bool(false), Value::Int(3)),
        Value::Bool(false)
    );
    assert_eq!(ops::logical_and(Value::Int(1), Value::Int(3)), Value::Int(3));
    assert_eq!(ops::logical_or(Value::Int(1), Value::Int(3)), Value::Int(1));
    assert_eq!(
        ops::logical_or(Value::Empty, Value::Int(3)),
        Value::Int(3)
    );
}

#[test]
fn builtin_registry_declares_the_full_set() {
    for name in [
        "print", "say", "type", "len", "str", "int", "float", "bool", "abs", "min", "max",
        "is_empty", "round",
    ] {
        assert!(builtins::lookup(name).is_some(), "missing builtin {name}");
    }
    assert!(builtins::lookup("nonsense").is_none());
}

#[test]
fn builtin_type_len_str() {
    let mut sink = Vec::new();
    let mut out = |line: &str| sink.push(line.to_string());
    let type_id = builtins::lookup("type").unwrap();
    assert_eq!(
        builtins::invoke(type_id, &[Value::Int(1)], &mut out).unwrap(),
        text("whole number")
    );
    let len_id = builtins::lookup("len").unwrap();
    assert_eq!(
        builtins::invoke(len_id, &[text("héllo")], &mut out).unwrap(),
        Value::Int(5)
    );
    let str_id = builtins::lookup("str").unwrap();
    assert_eq!(
        builtins::invoke(str_id, &[Value::Float(2.5)], &mut out).unwrap(),
        text("2.5")
    );
}

#[test]
fn builtin_conversions_and_rounding() {
    let mut out = |_: &str| {};
    let int_id = builtins::lookup("int").unwrap();
    assert_eq!(
        builtins::invoke(int_id, &[Value::Float(3.9)], &mut out).unwrap(),
        Value::Int(3)
    );
    assert_eq!(
        builtins::invoke(int_id, &[text(" 42 ")], &mut out).unwrap(),
        Value::Int(42)
    );
    assert!(builtins::invoke(int_id, &[text("nope")], &mut out).is_err());
    let round_id = builtins::lookup("round").unwrap();
    assert_eq!(
        builtins::invoke(round_id, &[Value::Float(2.5)], &mut out).unwrap(),
        Value::Int(3)
    );
    let bool_id = builtins::lookup("bool").unwrap();
    assert_eq!(
        builtins::invoke(bool_id, &[Value::Empty], &mut out).unwrap(),
        Value::Bool(false)
    );
}

#[test]
fn builtin_min_max_and_is_empty() {
    let mut out = |_: &str| {};
    let min_id = builtins::lookup("min").unwrap();
    let max_id = builtins::lookup("max").unwrap();
    assert_eq!(
        builtins::invoke(
            min_id,
            &[Value::Int(3), Value::Float(1.5), Value::Int(2)],
            &mut out
        )
        .unwrap(),
        Value::Float(1.5)
    );
    assert_eq!(
        builtins::invoke(max_id, &[Value::Int(3), Value::Int(9)], &mut out).unwrap(),
        Value::Int(9)
    );
    let is_empty_id = builtins::lookup("is_empty").unwrap();
    assert_eq!(
        builtins::invoke(is_empty_id, &[Value::Empty], &mut out).unwrap(),
        Value::Bool(true)
    );
    assert_eq!(
        builtins::invoke(is_empty_id, &[Value::Int(0)], &mut out).unwrap(),
        Value::Bool(false)
    );
}

#[test]
fn builtin_arity_is_checked() {
    let mut out = |_: &str| {};
    let len_id = builtins::lookup("len").unwrap();
    let error = builtins::invoke(len_id, &[], &mut out).unwrap_err();
    assert_eq!(error.kind, VmErrorKind::WrongArity);
    let min_id = builtins::lookup("min").unwrap();
    let error = builtins::invoke(min_id, &[], &mut out).unwrap_err();
    assert_eq!(error.kind, VmErrorKind::WrongArity);
}

#[test]
fn say_prints_and_returns_empty() {
    let mut sink = Vec::new();
    let mut out = |line: &str| sink.push(line.to_string());
    let say_id = builtins::lookup("say").unwrap();
    let result = builtins::invoke(say_id, &[Value::Int(1), text("two")], &mut out).unwrap();
    assert_eq!(result, Value::Empty);
    assert_eq!(sink, vec!["1 two".to_string()]);
}
