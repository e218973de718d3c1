//! Builtin function registry.
//!
//! Builtins are installed into the globals map before execution and are
//! dispatched by index. Arity is declared per builtin and checked at the
//! call site before invocation.

use std::rc::Rc;

use crate::vm::error::VmError;
use crate::vm::ops;
use crate::hir::CompareOp;
use crate::vm::value::Value;

/// Declared argument count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly this many arguments.
    Fixed(u8),
    /// At least this many arguments.
    AtLeast(u8),
}

/// One builtin's registration entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinSpec {
    /// Callable name.
    pub name: &'static str,
    /// Declared arity.
    pub arity: Arity,
}

/// The read-only builtin registry, indexed by builtin id.
pub const BUILTINS: &[BuiltinSpec] = &[
    BuiltinSpec {
        name: "print",
        arity: Arity::AtLeast(0),
    },
    BuiltinSpec {
        name: "say",
        arity: Arity::AtLeast(0),
    },
    BuiltinSpec {
        name: "type",
        arity: Arity::Fixed(1),
    },
    BuiltinSpec {
        name: "len",
        arity: Arity::Fixed(1),
    },
    BuiltinSpec {
        name: "str",
        arity: Arity::Fixed(1),
    },
    BuiltinSpec {
        name: "int",
        arity: Arity::Fixed(1),
    },
    BuiltinSpec {
        name: "float",
        arity: Arity::Fixed(1),
    },
    BuiltinSpec {
        name: "bool",
        arity: Arity::Fixed(1),
    },
    BuiltinSpec {
        name: "abs",
        arity: Arity::Fixed(1),
    },
    BuiltinSpec {
        name: "min",
        arity: Arity::AtLeast(1),
    },
    BuiltinSpec {
        name: "max",
        arity: Arity::AtLeast(1),
    },
    BuiltinSpec {
        name: "is_empty",
        arity: Arity::Fixed(1),
    },
    BuiltinSpec {
        name: "round",
        arity: Arity::Fixed(1),
    },
];

/// Looks a builtin up by name.
pub fn lookup(name: &str) -> Option<u8> {
    BUILTINS
        .iter()
        .position(|spec| spec.name == name)
        .map(|index| index as u8)
}

/// Returns a builtin's registration entry.
pub fn spec(id: u8) -> Option<&'static BuiltinSpec> {
    BUILTINS.get(id as usize)
}

/// Checks a call's argument count against the declared arity.
pub fn check_arity(spec: &BuiltinSpec, found: usize) -> Result<(), VmError> {
    let found_u8 = found.min(u8::MAX as usize) as u8;
    match spec.arity {
        Arity::Fixed(expected) if found != expected as usize => {
            Err(VmError::wrong_arity(spec.name, expected, found_u8))
        }
        Arity::AtLeast(expected) if found < expected as usize => Err(VmError::wrong_arity(
            spec.name,
            format!("at least {expected}"),
            found_u8,
        )),
        _ => Ok(()),
    }
}

/// Invokes a builtin. `output` receives `print`/`say` lines.
pub fn invoke(
    id: u8,
    args: &[Value],
    output: &mut dyn FnMut(&str),
) -> Result<Value, VmError> {
    let spec = spec(id).ok_or_else(|| {
        VmError::invalid_instruction(format!("builtin id {id} does not resolve"))
    })?;
    check_arity(spec, args.len())?;
    match spec.name {
        "print" | "say" => {
            let line = args
                .iter()
                .map(Value::to_display_string)
                .collect::<Vec<_>>()
                .join(" ");
            output(&line);
            Ok(Value::Empty)
        }
        "type" => Ok(Value::Str(Rc::from(args[0].type_name()))),
        "len" => match &args[0] {
            Value::Str(text) | Value::Url(text) => Ok(Value::Int(text.chars().count() as i64)),
            other => Err(VmError::type_mismatch(format!(
                "cannot get the length of {}",
                other.type_name()
            ))),
        },
        "str" => Ok(Value::Str(Rc::from(args[0].to_display_string()))),
        "int" => to_int(&args[0]),
        "float" => to_float(&args[0]),
        "bool" => Ok(Value::Bool(args[0].is_truthy())),
        "abs" => match &args[0] {
            Value::Int(value) => Ok(Value::Int(value.wrapping_abs())),
            Value::Float(value) => Ok(Value::Float(value.abs())),
            other => Err(VmError::type_mismatch(format!(
                "cannot take the absolute value of {}",
                other.type_name()
            ))),
        },
        "min" => fold_extreme(args, CompareOp::Lt),
        "max" => fold_extreme(args, CompareOp::Gt),
        "is_empty" => Ok(Value::Bool(matches!(args[0], Value::Empty))),
        "round" => match &args[0] {
            Value::Int(value) => Ok(Value::Int(*value)),
            Value::Float(value) => Ok(Value::Int(value.round() as i64)),
            other => Err(VmError::type_mismatch(format!(
                "cannot round {}",
                other.type_name()
            ))),
        },
        _ => Err(VmError::internal(format!(
            "builtin `{}` has no implementation",
            spec.name
        ))),
    }
}

fn to_int(value: &Value) -> Result<Value, VmError> {
    match value {
        Value::Int(inner) => Ok(Value::Int(*inner)),
        Value::Float(inner) => Ok(Value::Int(inner.trunc() as i64)),
        Value::Bool(inner) => Ok(Value::Int(i64::from(*inner))),
        Value::Str(text) => text.trim().parse::<i64>().map(Value::Int).map_err(|_| {
            VmError::type_mismatch(format!("cannot convert {text:?} to a whole number"))
        }),
        other => Err(VmError::type_mismatch(format!(
            "cannot convert {} to a whole number",
            other.type_name()
        ))),
    }
}

fn to_float(value: &Value) -> Result<Value, VmError> {
    match value {
        Value::Int(inner) => Ok(Value::Float(*inner as f64)),
        Value::Float(inner) => Ok(Value::Float(*inner)),
        Value::Bool(inner) => Ok(Value::Float(if *inner { 1.0 } else { 0.0 })),
        Value::Str(text) => text.trim().parse::<f64>().map(Value::Float).map_err(|_| {
            VmError::type_mismatch(format!("cannot convert {text:?} to a number"))
        }),
        other => Err(VmError::type_mismatch(format!(
            "cannot convert {} to a number",
            other.type_name()
        ))),
    }
}

fn fold_extreme(args: &[Value], op: CompareOp) -> Result<Value, VmError> {
    let mut best = args[0].clone();
    for candidate in &args[1..] {
        if let Value::Bool(true) = ops::compare(op, candidate, &best)? {
            best = candidate.clone();
        }
    }
    Ok(best)
}
