//! Arithmetic evaluation over shell state.
//!
//! Values are 64-bit signed and wrap on overflow. Variable references read
//! scalars; a value that is itself an expression is evaluated recursively
//! with a depth bound, matching how bash resolves `x=y+1; echo $((x))`.

use super::state::{ShellState, Value};
use crate::parser::{parse_arith, ArithExpr, BinOp, UnaryOp};

const MAX_NAME_RECURSION: u32 = 16;

/// Evaluate expression text against `state`. Assignments and increments
/// mutate the state.
pub fn eval_arith(state: &mut ShellState, src: &str) -> Result<i64, String> {
    let expr = parse_arith(src)?;
    eval_expr(state, &expr, 0)
}

fn eval_expr(state: &mut ShellState, expr: &ArithExpr, depth: u32) -> Result<i64, String> {
    match expr {
        ArithExpr::Number(n) => Ok(*n),
        ArithExpr::Var(name) => read_var(state, name, depth),
        ArithExpr::Assign { name, op, value } => {
            let rhs = eval_expr(state, value, depth)?;
            let result = match op {
                None => rhs,
                Some(bin) => {
                    let current = read_var(state, name, depth)?;
                    apply_binary(*bin, current, rhs)?
                }
            };
            state.set(name, Value::Scalar(result.to_string()));
            Ok(result)
        }
        ArithExpr::Incr { name, delta, prefix } => {
            let current = read_var(state, name, depth)?;
            let updated = current.wrapping_add(*delta);
            state.set(name, Value::Scalar(updated.to_string()));
            Ok(if *prefix { updated } else { current })
        }
        ArithExpr::Unary { op, operand } => {
            let v = eval_expr(state, operand, depth)?;
            Ok(match op {
                UnaryOp::Neg => v.wrapping_neg(),
                UnaryOp::Plus => v,
                UnaryOp::Not => i64::from(v == 0),
                UnaryOp::BitNot => !v,
            })
        }
        ArithExpr::Binary { op, lhs, rhs } => {
            // Logical operators short-circuit; the rest are strict.
            match op {
                BinOp::LogicalAnd => {
                    if eval_expr(state, lhs, depth)? == 0 {
                        return Ok(0);
                    }
                    Ok(i64::from(eval_expr(state, rhs, depth)? != 0))
                }
                BinOp::LogicalOr => {
                    if eval_expr(state, lhs, depth)? != 0 {
                        return Ok(1);
                    }
                    Ok(i64::from(eval_expr(state, rhs, depth)? != 0))
                }
                _ => {
                    let l = eval_expr(state, lhs, depth)?;
                    let r = eval_expr(state, rhs, depth)?;
                    apply_binary(*op, l, r)
                }
            }
        }
        ArithExpr::Ternary {
            cond,
            then_expr,
            else_expr,
        } => {
            if eval_expr(state, cond, depth)? != 0 {
                eval_expr(state, then_expr, depth)
            } else {
                eval_expr(state, else_expr, depth)
            }
        }
        ArithExpr::Sequence(exprs) => {
            let mut last = 0;
            for e in exprs {
                last = eval_expr(state, e, depth)?;
            }
            Ok(last)
        }
    }
}

fn read_var(state: &mut ShellState, name: &str, depth: u32) -> Result<i64, String> {
    if depth > MAX_NAME_RECURSION {
        return Err(format!("expression recursion level exceeded: {name}"));
    }
    let text = state.get_scalar(name);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    if let Ok(n) = trimmed.parse::<i64>() {
        return Ok(n);
    }
    // The value is itself an expression.
    let expr = parse_arith(trimmed)?;
    eval_expr(state, &expr, depth + 1)
}

fn apply_binary(op: BinOp, l: i64, r: i64) -> Result<i64, String> {
    Ok(match op {
        BinOp::Add => l.wrapping_add(r),
        BinOp::Sub => l.wrapping_sub(r),
        BinOp::Mul => l.wrapping_mul(r),
        BinOp::Div => {
            if r == 0 {
                return Err("division by 0".to_string());
            }
            l.wrapping_div(r)
        }
        BinOp::Rem => {
            if r == 0 {
                return Err("division by 0".to_string());
            }
            l.wrapping_rem(r)
        }
        BinOp::Pow => {
            if r < 0 {
                return Err("exponent less than 0".to_string());
            }
            let exp = u32::try_from(r).unwrap_or(u32::MAX);
            l.wrapping_pow(exp)
        }
        BinOp::Shl => l.wrapping_shl((r & 63) as u32),
        BinOp::Shr => l.wrapping_shr((r & 63) as u32),
        BinOp::Lt => i64::from(l < r),
        BinOp::Le => i64::from(l <= r),
        BinOp::Gt => i64::from(l > r),
        BinOp::Ge => i64::from(l >= r),
        BinOp::Eq => i64::from(l == r),
        BinOp::Ne => i64::from(l != r),
        BinOp::BitAnd => l & r,
        BinOp::BitXor => l ^ r,
        BinOp::BitOr => l | r,
        BinOp::LogicalAnd | BinOp::LogicalOr => unreachable!("short-circuit handled above"),
    })
}
