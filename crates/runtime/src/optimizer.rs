//! Constant folding over a parsed program.
//!
//! Operators whose operands are literals are evaluated once, ahead of
//! time. Anything that would fail at runtime (division by zero, type
//! mismatches) is left in place so the error still surfaces when, and
//! only if, the expression is reached.

use crate::ast::{BinaryOp, Expr, Program, Stmt, Target};
use crate::ops;
use crate::value::Value;

/// Fold constant sub-expressions in place.
pub fn optimize(program: &mut Program) {
    fold_block(&mut program.statements);
}

fn fold_block(statements: &mut [Stmt]) {
    for statement in statements {
        fold_stmt(statement);
    }
}

fn fold_stmt(statement: &mut Stmt) {
    match statement {
        Stmt::Expr(expr) | Stmt::Throw(expr) | Stmt::Return(Some(expr)) => fold(expr),
        Stmt::Assign { target, value } => {
            if let Target::Index { path, .. } = target {
                path.iter_mut().for_each(fold);
            }
            fold(value);
        }
        Stmt::FuncDef { body, .. } => {
            if let Some(body) = std::sync::Arc::get_mut(body) {
                fold_block(body);
            }
        }
        Stmt::While { condition, body } => {
            fold(condition);
            fold_block(body);
        }
        Stmt::For { iterable, body, .. } => {
            fold(iterable);
            fold_block(body);
        }
        Stmt::Return(None)
        | Stmt::Break
        | Stmt::Continue
        | Stmt::Import { .. }
        | Stmt::Export(_) => {}
    }
}

fn fold(expr: &mut Expr) {
    match expr {
        Expr::Array(items) => items.iter_mut().for_each(fold),
        Expr::Dict(entries) => entries.iter_mut().for_each(|(_, value)| fold(value)),
        Expr::Unary { op, operand } => {
            fold(operand);
            if let Some(value) = literal(operand) {
                if let Some(folded) = ops::unary(*op, value).ok().and_then(into_literal) {
                    *expr = folded;
                }
            }
        }
        Expr::Binary { left, op, right } => {
            fold(left);
            fold(right);
            if let Some(folded) = fold_binary(left, *op, right) {
                *expr = folded;
            }
        }
        Expr::Call { callee, args } => {
            fold(callee);
            args.iter_mut().for_each(fold);
        }
        Expr::Index { object, index } => {
            fold(object);
            fold(index);
        }
        Expr::If {
            branches,
            otherwise,
        } => {
            for (condition, body) in branches {
                fold(condition);
                fold_block(body);
            }
            if let Some(body) = otherwise {
                fold_block(body);
            }
        }
        Expr::Lambda { body, .. } => {
            if let Some(body) = std::sync::Arc::get_mut(body) {
                fold_block(body);
            }
        }
        Expr::Number(_) | Expr::Str(_) | Expr::Bool(_) | Expr::Null | Expr::Ident(_) => {}
    }
}

fn fold_binary(left: &mut Expr, op: BinaryOp, right: &mut Expr) -> Option<Expr> {
    let lhs = literal(left)?;
    match op {
        // Only the left side decides whether the right is evaluated.
        BinaryOp::And | BinaryOp::Or => {
            let short_circuits = lhs.is_truthy() == (op == BinaryOp::Or);
            let taken = if short_circuits { left } else { right };
            Some(std::mem::replace(taken, Expr::Null))
        }
        _ => {
            let rhs = literal(right)?;
            ops::binary(op, lhs, rhs).ok().and_then(into_literal)
        }
    }
}

fn literal(expr: &Expr) -> Option<Value> {
    match expr {
        Expr::Number(n) => Some(Value::Number(*n)),
        Expr::Str(s) => Some(Value::String(s.clone())),
        Expr::Bool(b) => Some(Value::Bool(*b)),
        Expr::Null => Some(Value::Null),
        _ => None,
    }
}

fn into_literal(value: Value) -> Option<Expr> {
    match value {
        Value::Number(n) => Some(Expr::Number(n)),
        Value::String(s) => Some(Expr::Str(s)),
        Value::Bool(b) => Some(Expr::Bool(b)),
        Value::Null => Some(Expr::Null),
        _ => None,
    }
}
