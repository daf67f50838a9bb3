//! Bridge from the expression algebra to `sea_query` for SQL backends.

use super::expression::{Expression, LeftTerm, Operator, RightTerm};
use crate::error::TideError;
use crate::value::Value;
use sea_query::{Alias, Expr, ExprTrait, LikeExpr};

/// Storage value → `sea_query` value.
#[must_use]
pub fn to_sea_value(value: &Value) -> sea_query::Value {
    match value {
        Value::Null => sea_query::Value::String(None),
        Value::Bool(b) => (*b).into(),
        Value::Integer(v) => (*v).into(),
        Value::Double(v) => (*v).into(),
        Value::Decimal(d) => (*d).into(),
        Value::Text(s) => s.clone().into(),
        Value::Bytes(b) => b.clone().into(),
        Value::Guid(g) => (*g).into(),
        Value::DateTime(dt) => (*dt).into(),
        Value::DateTimeOffset(dt) => (*dt).into(),
    }
}

fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn like_text(value: &Value) -> Option<String> {
    match value {
        Value::Text(s) => Some(s.clone()),
        Value::Integer(v) => Some(v.to_string()),
        Value::Double(v) => Some(v.to_string()),
        Value::Decimal(d) => Some(d.to_string()),
        Value::Guid(g) => Some(g.to_string()),
        _ => None,
    }
}

enum Step<'e> {
    Visit(&'e Expression),
    /// Join the last `n` rendered operands of one `And`/`Or` chain.
    Chain(Operator, usize),
    /// Finish a non-logical node whose nested operands are rendered.
    Node(&'e Expression),
}

impl Expression {
    /// Render this tree as a `sea_query` condition.
    ///
    /// `Contains`/`StartsWith`/`EndsWith` become `LIKE` patterns with `%`, `_` and
    /// `\` escaped; `ContainsNot` becomes `NOT LIKE`. Comparing against
    /// [`RightTerm::Null`] with `Equals`/`NotEquals` renders `IS [NOT] NULL`.
    ///
    /// Runs of the same logical operator are flattened and regrouped as a
    /// balanced tree, so a list folded from `n` clauses renders at depth
    /// `log2(n)` instead of `n`.
    ///
    /// # Errors
    ///
    /// Returns [`TideError::InvalidArgument`] when a node's terms do not fit its
    /// operator (e.g. `And` with a column operand, `In` without a list).
    pub fn to_sea_expr(&self) -> Result<Expr, TideError> {
        let mut steps = vec![Step::Visit(self)];
        let mut rendered: Vec<Expr> = Vec::new();
        while let Some(step) = steps.pop() {
            match step {
                Step::Visit(expr) if expr.operator.is_logical() => {
                    let operands = chain_operands(expr)?;
                    steps.push(Step::Chain(expr.operator, operands.len()));
                    steps.extend(operands.into_iter().rev().map(Step::Visit));
                }
                Step::Visit(expr) => {
                    steps.push(Step::Node(expr));
                    if let RightTerm::Expression(right) = &expr.right {
                        steps.push(Step::Visit(right.as_ref()));
                    }
                    if let LeftTerm::Expression(left) = &expr.left {
                        steps.push(Step::Visit(left.as_ref()));
                    }
                }
                Step::Chain(op, n) => {
                    let at = rendered.len().checked_sub(n).ok_or_else(|| malformed(self))?;
                    let operands = rendered.split_off(at);
                    rendered.push(balanced(op, operands).ok_or_else(|| malformed(self))?);
                }
                Step::Node(expr) => {
                    let right = match &expr.right {
                        RightTerm::Expression(_) => Some(rendered.pop().ok_or_else(|| malformed(expr))?),
                        _ => None,
                    };
                    let left = match &expr.left {
                        LeftTerm::Column(name) => Expr::col(Alias::new(name.clone())),
                        LeftTerm::Expression(_) => rendered.pop().ok_or_else(|| malformed(expr))?,
                    };
                    rendered.push(render_node(expr, left, right)?);
                }
            }
        }
        match (rendered.pop(), rendered.is_empty()) {
            (Some(expr), true) => Ok(expr),
            _ => Err(malformed(self)),
        }
    }
}

fn malformed(expr: &Expression) -> TideError {
    TideError::InvalidArgument(format!("malformed expression node: {expr}"))
}

/// Operands of the maximal run of `expr.operator` rooted at `expr`, left to right.
fn chain_operands(expr: &Expression) -> Result<Vec<&Expression>, TideError> {
    let mut operands = Vec::new();
    let mut pending = vec![expr];
    while let Some(node) = pending.pop() {
        if node.operator != expr.operator {
            operands.push(node);
            continue;
        }
        let (LeftTerm::Expression(left), RightTerm::Expression(right)) = (&node.left, &node.right)
        else {
            return Err(malformed(node));
        };
        pending.push(right.as_ref());
        pending.push(left.as_ref());
    }
    Ok(operands)
}

/// Join operands pairwise, level by level, keeping their order.
fn balanced(op: Operator, mut operands: Vec<Expr>) -> Option<Expr> {
    while operands.len() > 1 {
        let mut joined = Vec::with_capacity(operands.len().div_ceil(2));
        let mut it = operands.into_iter();
        while let Some(left) = it.next() {
            joined.push(match it.next() {
                Some(right) if op == Operator::And => left.and(right),
                Some(right) => left.or(right),
                None => left,
            });
        }
        operands = joined;
    }
    operands.pop()
}

fn render_node(expr: &Expression, left: Expr, nested_right: Option<Expr>) -> Result<Expr, TideError> {
    let op = expr.operator;
    let invalid = || malformed(expr);
    match (op, &expr.right) {
        (Operator::IsNull, _) | (Operator::Equals, RightTerm::Null) => Ok(left.is_null()),
        (Operator::IsNotNull, _) | (Operator::NotEquals, RightTerm::Null) => Ok(left.is_not_null()),
        (Operator::In, RightTerm::List(values)) => Ok(left.is_in(values.iter().map(to_sea_value))),
        (Operator::NotIn, RightTerm::List(values)) => {
            Ok(left.is_not_in(values.iter().map(to_sea_value)))
        }
        (
            Operator::Contains | Operator::ContainsNot | Operator::StartsWith | Operator::EndsWith,
            RightTerm::Value(value),
        ) => {
            let text = like_text(value).ok_or_else(invalid)?;
            let text = escape_like(&text);
            let pattern = match op {
                Operator::StartsWith => format!("{text}%"),
                Operator::EndsWith => format!("%{text}"),
                _ => format!("%{text}%"),
            };
            let like = LikeExpr::new(pattern).escape('\\');
            Ok(if op == Operator::ContainsNot { left.not_like(like) } else { left.like(like) })
        }
        (_, RightTerm::Value(value)) => {
            compare(op, left, Expr::val(to_sea_value(value))).ok_or_else(invalid)
        }
        (_, RightTerm::Expression(_)) => {
            let right = nested_right.ok_or_else(invalid)?;
            compare(op, left, right).ok_or_else(invalid)
        }
        _ => Err(invalid()),
    }
}

fn compare(op: Operator, left: Expr, right: Expr) -> Option<Expr> {
    Some(match op {
        Operator::Equals => left.eq(right),
        Operator::NotEquals => left.ne(right),
        Operator::GreaterThan => left.gt(right),
        Operator::GreaterThanOrEqual => left.gte(right),
        Operator::LessThan => left.lt(right),
        Operator::LessThanOrEqual => left.lte(right),
        _ => return None,
    })
}
