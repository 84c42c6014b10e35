//! Statement and expression evaluation against a [`Namespace`].

use crate::namespace::Namespace;

use super::error::ScriptError;
use super::parser::{BinOp, Expr, Program, StmtKind, UnaryOp};
use super::value::Value;

/// Run every statement of `program` in order, mutating `namespace` in place.
///
/// Execution stops at the first failing statement; assignments made by the
/// statements before it stay in the namespace.
pub fn execute(program: &Program, namespace: &mut Namespace) -> Result<(), ScriptError> {
    for stmt in &program.statements {
        match &stmt.kind {
            StmtKind::Assign(name, expr) => {
                let value = eval_expr(expr, namespace)?;
                namespace.set(name, value);
            }
            StmtKind::AugAssign(name, op, expr) => {
                let current = namespace
                    .get(name)
                    .cloned()
                    .ok_or_else(|| ScriptError::UndefinedName(name.clone()))?;
                let rhs = eval_expr(expr, namespace)?;
                namespace.set(name, binary(*op, current, rhs)?);
            }
            StmtKind::Delete(name) => {
                if namespace.remove(name).is_none() {
                    return Err(ScriptError::UndefinedName(name.clone()));
                }
            }
            StmtKind::Expr(expr) => {
                eval_expr(expr, namespace)?;
            }
        }
    }
    Ok(())
}

/// Evaluate a single expression. Reads the namespace but never writes it.
pub fn eval_expr(expr: &Expr, namespace: &Namespace) -> Result<Value, ScriptError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Name(name) => namespace
            .get(name)
            .cloned()
            .ok_or_else(|| ScriptError::UndefinedName(name.clone())),
        Expr::Unary(op, operand) => unary(*op, eval_expr(operand, namespace)?),
        Expr::Binary(op, left, right) => {
            let l = eval_expr(left, namespace)?;
            let r = eval_expr(right, namespace)?;
            binary(*op, l, r)
        }
        Expr::And(left, right) => {
            let l = eval_expr(left, namespace)?;
            if l.truthy() {
                eval_expr(right, namespace)
            } else {
                Ok(l)
            }
        }
        Expr::Or(left, right) => {
            let l = eval_expr(left, namespace)?;
            if l.truthy() {
                Ok(l)
            } else {
                eval_expr(right, namespace)
            }
        }
        Expr::Call(name, args) => {
            let values = args
                .iter()
                .map(|arg| eval_expr(arg, namespace))
                .collect::<Result<Vec<_>, _>>()?;
            call_builtin(name, values)
        }
    }
}

fn unary(op: UnaryOp, value: Value) -> Result<Value, ScriptError> {
    match (op, value) {
        (UnaryOp::Not, v) => Ok(Value::Bool(!v.truthy())),
        (UnaryOp::Neg, Value::Int(n)) => n
            .checked_neg()
            .map(Value::Int)
            .ok_or(ScriptError::Overflow("negation")),
        (UnaryOp::Neg, Value::Float(n)) => Ok(Value::Float(-n)),
        (UnaryOp::Neg, Value::Bool(b)) => Ok(Value::Int(-i64::from(b))),
        (UnaryOp::Pos, v) if v.is_number() => Ok(match v {
            Value::Bool(b) => Value::Int(i64::from(b)),
            other => other,
        }),
        (op, v) => Err(ScriptError::Type(format!(
            "bad operand type for unary {}: {}",
            if op == UnaryOp::Neg { "-" } else { "+" },
            v.type_name()
        ))),
    }
}

fn type_mismatch(op: BinOp, l: &Value, r: &Value) -> ScriptError {
    ScriptError::Type(format!(
        "unsupported operand types for {}: {} and {}",
        op.symbol(),
        l.type_name(),
        r.type_name()
    ))
}

/// Longest string `+` or `*` may produce, in bytes.
const MAX_STRING_LEN: usize = 1 << 24;

fn binary(op: BinOp, l: Value, r: Value) -> Result<Value, ScriptError> {
    match op {
        BinOp::Eq => return Ok(Value::Bool(l.loose_eq(&r))),
        BinOp::Ne => return Ok(Value::Bool(!l.loose_eq(&r))),
        BinOp::Lt => return Ok(Value::Bool(l.compare(&r)?.is_lt())),
        BinOp::Le => return Ok(Value::Bool(l.compare(&r)?.is_le())),
        BinOp::Gt => return Ok(Value::Bool(l.compare(&r)?.is_gt())),
        BinOp::Ge => return Ok(Value::Bool(l.compare(&r)?.is_ge())),
        _ => {}
    }

    match (&l, &r) {
        (Value::Str(a), Value::Str(b)) if op == BinOp::Add => {
            if a.len() + b.len() > MAX_STRING_LEN {
                return Err(ScriptError::Overflow("+"));
            }
            return Ok(Value::Str(format!("{a}{b}")));
        }
        (Value::Str(s), n) | (n, Value::Str(s)) if op == BinOp::Mul && n.as_i64().is_some() => {
            let times = usize::try_from(n.as_i64().unwrap_or(0).max(0))
                .map_err(|_| ScriptError::Overflow("*"))?;
            match s.len().checked_mul(times) {
                Some(len) if len <= MAX_STRING_LEN => return Ok(Value::Str(s.repeat(times))),
                _ => return Err(ScriptError::Overflow("*")),
            }
        }
        _ => {}
    }

    if let (Some(a), Some(b)) = (l.as_i64(), r.as_i64()) {
        return int_arith(op, a, b);
    }
    match (l.as_f64(), r.as_f64()) {
        (Some(a), Some(b)) => float_arith(op, a, b),
        _ => Err(type_mismatch(op, &l, &r)),
    }
}

fn int_arith(op: BinOp, a: i64, b: i64) -> Result<Value, ScriptError> {
    let checked = match op {
        BinOp::Add => a.checked_add(b),
        BinOp::Sub => a.checked_sub(b),
        BinOp::Mul => a.checked_mul(b),
        BinOp::Div => return float_arith(op, a as f64, b as f64),
        BinOp::FloorDiv | BinOp::Mod if b == 0 => return Err(ScriptError::DivisionByZero),
        BinOp::FloorDiv => a.checked_div_euclid(b).map(|q| {
            // With a negative divisor an inexact Euclidean quotient sits one above the floor.
            if b < 0 && a.rem_euclid(b) != 0 { q - 1 } else { q }
        }),
        BinOp::Mod => a.checked_rem(b).map(|m| if m != 0 && (m < 0) != (b < 0) { m + b } else { m }),
        BinOp::Pow if b < 0 => return float_arith(op, a as f64, b as f64),
        BinOp::Pow => u32::try_from(b).ok().and_then(|e| a.checked_pow(e)),
        _ => unreachable!("comparison operators are handled before arithmetic"),
    };
    checked
        .map(Value::Int)
        .ok_or(ScriptError::Overflow(op.symbol()))
}

fn float_arith(op: BinOp, a: f64, b: f64) -> Result<Value, ScriptError> {
    let value = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div | BinOp::FloorDiv | BinOp::Mod if b == 0.0 => {
            return Err(ScriptError::DivisionByZero)
        }
        BinOp::Div => a / b,
        BinOp::FloorDiv => (a / b).floor(),
        BinOp::Mod => a - b * (a / b).floor(),
        BinOp::Pow => a.powf(b),
        _ => unreachable!("comparison operators are handled before arithmetic"),
    };
    Ok(Value::Float(value))
}

fn arity(name: &str, expected: &'static str, got: usize) -> ScriptError {
    ScriptError::Arity {
        name: name.to_string(),
        expected,
        got,
    }
}

fn numeric<'v>(name: &str, value: &'v Value) -> Result<&'v Value, ScriptError> {
    if value.is_number() {
        Ok(value)
    } else {
        Err(ScriptError::Type(format!(
            "{name}() expects a number, got {}",
            value.type_name()
        )))
    }
}

fn call_builtin(name: &str, mut args: Vec<Value>) -> Result<Value, ScriptError> {
    match name {
        "abs" => {
            let [v] = <[Value; 1]>::try_from(args).map_err(|a| arity(name, "1", a.len()))?;
            match numeric(name, &v)? {
                Value::Float(n) => Ok(Value::Float(n.abs())),
                other => other
                    .as_i64()
                    .and_then(i64::checked_abs)
                    .map(Value::Int)
                    .ok_or(ScriptError::Overflow("abs")),
            }
        }
        "min" | "max" => {
            if args.is_empty() {
                return Err(arity(name, "at least 1", 0));
            }
            let mut best = args.remove(0);
            for candidate in args {
                let ordering = candidate.compare(&best)?;
                let better = if name == "min" { ordering.is_lt() } else { ordering.is_gt() };
                if better {
                    best = candidate;
                }
            }
            Ok(best)
        }
        "round" => match args.as_slice() {
            [v] => {
                let n = numeric(name, v)?.as_f64().unwrap_or(0.0);
                let rounded = n.round();
                if rounded.is_finite() && rounded.abs() < i64::MAX as f64 {
                    Ok(Value::Int(rounded as i64))
                } else {
                    Err(ScriptError::Overflow("round"))
                }
            }
            [v, digits] => {
                let n = numeric(name, v)?.as_f64().unwrap_or(0.0);
                let digits = digits.as_i64().ok_or_else(|| {
                    ScriptError::Type("round() digits must be an integer".into())
                })?;
                let factor = 10f64.powi(digits.clamp(-308, 308) as i32);
                Ok(Value::Float((n * factor).round() / factor))
            }
            _ => Err(arity(name, "1 or 2", args.len())),
        },
        "int" => {
            let [v] = <[Value; 1]>::try_from(args).map_err(|a| arity(name, "1", a.len()))?;
            match v {
                Value::Float(n) if n.is_finite() && n.abs() < i64::MAX as f64 => {
                    Ok(Value::Int(n.trunc() as i64))
                }
                Value::Float(_) => Err(ScriptError::Overflow("int")),
                Value::Str(s) => s.trim().parse::<i64>().map(Value::Int).map_err(|_| {
                    ScriptError::Type(format!("cannot convert '{s}' to int"))
                }),
                other => other.as_i64().map(Value::Int).ok_or_else(|| {
                    ScriptError::Type(format!("cannot convert {} to int", other.type_name()))
                }),
            }
        }
        "float" => {
            let [v] = <[Value; 1]>::try_from(args).map_err(|a| arity(name, "1", a.len()))?;
            match v {
                Value::Str(s) => s.trim().parse::<f64>().map(Value::Float).map_err(|_| {
                    ScriptError::Type(format!("cannot convert '{s}' to float"))
                }),
                other => other.as_f64().map(Value::Float).ok_or_else(|| {
                    ScriptError::Type(format!("cannot convert {} to float", other.type_name()))
                }),
            }
        }
        "str" => {
            let [v] = <[Value; 1]>::try_from(args).map_err(|a| arity(name, "1", a.len()))?;
            Ok(Value::Str(v.to_string()))
        }
        "len" => {
            let [v] = <[Value; 1]>::try_from(args).map_err(|a| arity(name, "1", a.len()))?;
            match v {
                Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
                other => Err(ScriptError::Type(format!(
                    "{} has no length",
                    other.type_name()
                ))),
            }
        }
        _ => Err(ScriptError::UnknownFunction(name.to_string())),
    }
}
