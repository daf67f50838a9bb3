//! Boolean expression algebra for filter predicates.
//!
//! A filter is a binary tree of [`Expression`] nodes (term, operator, term).
//! Trees are plain owned values: composition clones what it needs and never
//! aliases a tree the caller still holds.
//!
//! ```
//! use tidemark::{Expression, Operator, Value};
//!
//! let adults = Expression::greater_than_or_equal("age", 18);
//! let named = Expression::starts_with("firstname", "Ad");
//! let filter = Expression::list_to_nested_and(vec![adults, named]).unwrap();
//! assert_eq!(filter.operator, Operator::And);
//! assert_eq!(filter.to_string(), "(age >= 18 AND firstname STARTS WITH 'Ad')");
//! ```

use crate::error::TideError;
use crate::value::Value;
use std::fmt;

/// Expression operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    And,
    Or,
    Equals,
    NotEquals,
    In,
    NotIn,
    Contains,
    ContainsNot,
    StartsWith,
    EndsWith,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    IsNull,
    IsNotNull,
}

impl Operator {
    /// Whether this operator joins two sub-expressions.
    #[must_use]
    pub fn is_logical(self) -> bool {
        matches!(self, Operator::And | Operator::Or)
    }

    /// Whether this operator takes no right operand.
    #[must_use]
    pub fn is_unary(self) -> bool {
        matches!(self, Operator::IsNull | Operator::IsNotNull)
    }

    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::And => "AND",
            Operator::Or => "OR",
            Operator::Equals => "=",
            Operator::NotEquals => "<>",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::Contains => "CONTAINS",
            Operator::ContainsNot => "NOT CONTAINS",
            Operator::StartsWith => "STARTS WITH",
            Operator::EndsWith => "ENDS WITH",
            Operator::GreaterThan => ">",
            Operator::GreaterThanOrEqual => ">=",
            Operator::LessThan => "<",
            Operator::LessThanOrEqual => "<=",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Left operand: a column name or a nested expression.
#[derive(Debug, Clone, PartialEq)]
pub enum LeftTerm {
    Column(String),
    Expression(Box<Expression>),
}

impl From<&str> for LeftTerm {
    fn from(column: &str) -> Self {
        LeftTerm::Column(column.to_string())
    }
}

impl From<String> for LeftTerm {
    fn from(column: String) -> Self {
        LeftTerm::Column(column)
    }
}

impl From<Expression> for LeftTerm {
    fn from(expr: Expression) -> Self {
        LeftTerm::Expression(Box::new(expr))
    }
}

/// Right operand: null, a literal, a list of literals, or a nested expression.
#[derive(Debug, Clone, PartialEq)]
pub enum RightTerm {
    Null,
    Value(Value),
    List(Vec<Value>),
    Expression(Box<Expression>),
}

impl From<Value> for RightTerm {
    fn from(value: Value) -> Self {
        RightTerm::Value(value)
    }
}

impl From<Vec<Value>> for RightTerm {
    fn from(values: Vec<Value>) -> Self {
        RightTerm::List(values)
    }
}

impl From<Expression> for RightTerm {
    fn from(expr: Expression) -> Self {
        RightTerm::Expression(Box::new(expr))
    }
}

/// One node of a filter tree.
///
/// `Clone`, `PartialEq`, `Display` and `Drop` walk the tree with an explicit
/// stack, so folded lists of any length can be copied, compared, printed and
/// dropped.
#[derive(Debug)]
pub struct Expression {
    pub left: LeftTerm,
    pub operator: Operator,
    pub right: RightTerm,
}

impl Expression {
    /// Direct construction, no validation.
    pub fn new(left: impl Into<LeftTerm>, operator: Operator, right: impl Into<RightTerm>) -> Self {
        Self {
            left: left.into(),
            operator,
            right: right.into(),
        }
    }

    fn compare(column: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self::new(LeftTerm::Column(column.into()), operator, RightTerm::Value(value.into()))
    }

    pub fn equals(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, Operator::Equals, value)
    }

    pub fn not_equals(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, Operator::NotEquals, value)
    }

    pub fn greater_than(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, Operator::GreaterThan, value)
    }

    pub fn greater_than_or_equal(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, Operator::GreaterThanOrEqual, value)
    }

    pub fn less_than(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, Operator::LessThan, value)
    }

    pub fn less_than_or_equal(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, Operator::LessThanOrEqual, value)
    }

    pub fn contains(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, Operator::Contains, value)
    }

    pub fn contains_not(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, Operator::ContainsNot, value)
    }

    pub fn starts_with(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, Operator::StartsWith, value)
    }

    pub fn ends_with(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, Operator::EndsWith, value)
    }

    pub fn is_in<V, I>(column: impl Into<String>, values: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        let values = values.into_iter().map(Into::into).collect::<Vec<_>>();
        Self::new(LeftTerm::Column(column.into()), Operator::In, RightTerm::List(values))
    }

    pub fn not_in<V, I>(column: impl Into<String>, values: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        let values = values.into_iter().map(Into::into).collect::<Vec<_>>();
        Self::new(LeftTerm::Column(column.into()), Operator::NotIn, RightTerm::List(values))
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Self::new(LeftTerm::Column(column.into()), Operator::IsNull, RightTerm::Null)
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        Self::new(LeftTerm::Column(column.into()), Operator::IsNotNull, RightTerm::Null)
    }

    /// `(column >= low) AND (column <= high)`.
    ///
    /// # Errors
    ///
    /// Returns [`TideError::InvalidArgument`] unless `range` holds exactly two values.
    pub fn between(column: impl Into<String>, range: Vec<Value>) -> Result<Self, TideError> {
        let column = column.into();
        let [low, high]: [Value; 2] = range.try_into().map_err(|range: Vec<Value>| {
            TideError::InvalidArgument(format!(
                "between on {column} needs exactly two values, got {}",
                range.len()
            ))
        })?;
        Ok(Self::new(
            Self::compare(column.clone(), Operator::GreaterThanOrEqual, low),
            Operator::And,
            Self::compare(column, Operator::LessThanOrEqual, high),
        ))
    }

    /// `self AND other`, consuming both.
    #[must_use]
    pub fn and(self, other: Expression) -> Self {
        Self::new(self, Operator::And, other)
    }

    /// `self OR other`, consuming both.
    #[must_use]
    pub fn or(self, other: Expression) -> Self {
        Self::new(self, Operator::Or, other)
    }

    /// New root `clause AND <copy of existing>`.
    ///
    /// `existing` is deep-copied, so the returned tree shares nothing with it.
    #[must_use]
    pub fn prepend_and(existing: &Expression, clause: Expression) -> Self {
        Self::new(clause, Operator::And, existing.clone())
    }

    /// New root `clause OR <copy of existing>`.
    #[must_use]
    pub fn prepend_or(existing: &Expression, clause: Expression) -> Self {
        Self::new(clause, Operator::Or, existing.clone())
    }

    /// Fold a list into `e1 AND (e2 AND (... AND eN))`.
    ///
    /// A single expression is returned unchanged. The fold is iterative.
    ///
    /// # Errors
    ///
    /// Returns [`TideError::InvalidArgument`] for an empty list.
    pub fn list_to_nested_and(list: Vec<Expression>) -> Result<Self, TideError> {
        fold(list, Operator::And)
    }

    /// Fold a list into `e1 OR (e2 OR (... OR eN))`.
    ///
    /// # Errors
    ///
    /// Returns [`TideError::InvalidArgument`] for an empty list.
    pub fn list_to_nested_or(list: Vec<Expression>) -> Result<Self, TideError> {
        fold(list, Operator::Or)
    }

    /// Number of node levels in the tree (a single node has depth 1).
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut max = 0;
        let mut stack = vec![(self, 1usize)];
        while let Some((node, level)) = stack.pop() {
            max = max.max(level);
            for child in node.children() {
                stack.push((child, level + 1));
            }
        }
        max
    }

    /// Column names referenced anywhere in the tree, in first-seen order.
    #[must_use]
    pub fn referenced_columns(&self) -> Vec<&str> {
        let mut columns: Vec<&str> = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if let LeftTerm::Column(name) = &node.left {
                if !columns.contains(&name.as_str()) {
                    columns.push(name);
                }
            }
            // Push right first so the left subtree is visited first
            let children: Vec<&Expression> = node.children().collect();
            stack.extend(children.into_iter().rev());
        }
        columns
    }

    /// Direct sub-expressions (left, then right).
    pub fn children(&self) -> impl Iterator<Item = &Expression> {
        let left = match &self.left {
            LeftTerm::Expression(e) => Some(e.as_ref()),
            LeftTerm::Column(_) => None,
        };
        let right = match &self.right {
            RightTerm::Expression(e) => Some(e.as_ref()),
            _ => None,
        };
        left.into_iter().chain(right)
    }
}

fn fold(mut list: Vec<Expression>, operator: Operator) -> Result<Expression, TideError> {
    let mut acc = list.pop().ok_or_else(|| {
        TideError::InvalidArgument(format!("cannot fold an empty expression list with {operator}"))
    })?;
    while let Some(prev) = list.pop() {
        acc = Expression::new(prev, operator, acc);
    }
    Ok(acc)
}

// Copy of `node` with nested expressions replaced by placeholders.
fn shallow_copy(node: &Expression) -> Expression {
    Expression {
        left: match &node.left {
            LeftTerm::Column(name) => LeftTerm::Column(name.clone()),
            LeftTerm::Expression(_) => LeftTerm::Column(String::new()),
        },
        operator: node.operator,
        right: match &node.right {
            RightTerm::Expression(_) => RightTerm::Null,
            other => other.clone(),
        },
    }
}

impl Clone for Expression {
    fn clone(&self) -> Self {
        let mut root = shallow_copy(self);
        {
            let mut stack: Vec<(&Expression, &mut Expression)> = vec![(self, &mut root)];
            while let Some((source, target)) = stack.pop() {
                if let LeftTerm::Expression(child) = &source.left {
                    target.left = LeftTerm::Expression(Box::new(shallow_copy(child)));
                }
                if let RightTerm::Expression(child) = &source.right {
                    target.right = RightTerm::Expression(Box::new(shallow_copy(child)));
                }
                let Expression { left, right, .. } = target;
                if let (LeftTerm::Expression(from), LeftTerm::Expression(to)) = (&source.left, left) {
                    stack.push((from.as_ref(), to.as_mut()));
                }
                if let (RightTerm::Expression(from), RightTerm::Expression(to)) =
                    (&source.right, right)
                {
                    stack.push((from.as_ref(), to.as_mut()));
                }
            }
        }
        root
    }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        let mut stack = vec![(self, other)];
        while let Some((a, b)) = stack.pop() {
            if a.operator != b.operator {
                return false;
            }
            match (&a.left, &b.left) {
                (LeftTerm::Column(x), LeftTerm::Column(y)) if x == y => {}
                (LeftTerm::Expression(x), LeftTerm::Expression(y)) => {
                    stack.push((x.as_ref(), y.as_ref()));
                }
                _ => return false,
            }
            match (&a.right, &b.right) {
                (RightTerm::Expression(x), RightTerm::Expression(y)) => {
                    stack.push((x.as_ref(), y.as_ref()));
                }
                (RightTerm::Expression(_), _) | (_, RightTerm::Expression(_)) => return false,
                (x, y) if x != y => return false,
                _ => {}
            }
        }
        true
    }
}

// Dismantle nested nodes with an explicit stack so that dropping a very deep tree
// (e.g. a long folded list) does not recurse.
impl Drop for Expression {
    fn drop(&mut self) {
        let mut stack: Vec<Box<Expression>> = Vec::new();
        detach_children(self, &mut stack);
        while let Some(mut node) = stack.pop() {
            detach_children(&mut node, &mut stack);
        }
    }
}

fn detach_children(node: &mut Expression, stack: &mut Vec<Box<Expression>>) {
    if matches!(node.left, LeftTerm::Expression(_)) {
        if let LeftTerm::Expression(child) =
            std::mem::replace(&mut node.left, LeftTerm::Column(String::new()))
        {
            stack.push(child);
        }
    }
    if matches!(node.right, RightTerm::Expression(_)) {
        if let RightTerm::Expression(child) = std::mem::replace(&mut node.right, RightTerm::Null) {
            stack.push(child);
        }
    }
}

impl fmt::Display for LeftTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeftTerm::Column(name) => f.write_str(name),
            LeftTerm::Expression(e) => write!(f, "{e}"),
        }
    }
}

impl fmt::Display for RightTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RightTerm::Null => f.write_str("NULL"),
            RightTerm::Value(v) => write!(f, "{v}"),
            RightTerm::List(values) => {
                f.write_str("(")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str(")")
            }
            RightTerm::Expression(e) => write!(f, "{e}"),
        }
    }
}

enum Piece<'a> {
    Node(&'a Expression),
    Text(&'a str),
    Operand(&'a RightTerm),
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut pieces = vec![Piece::Node(self)];
        while let Some(piece) = pieces.pop() {
            let node = match piece {
                Piece::Text(text) => {
                    f.write_str(text)?;
                    continue;
                }
                Piece::Operand(term) => {
                    write!(f, "{term}")?;
                    continue;
                }
                Piece::Node(node) => node,
            };
            let left = match &node.left {
                LeftTerm::Column(name) => Piece::Text(name.as_str()),
                LeftTerm::Expression(e) => Piece::Node(e.as_ref()),
            };
            let right = match &node.right {
                RightTerm::Expression(e) => Piece::Node(e.as_ref()),
                other => Piece::Operand(other),
            };
            let symbol = Piece::Text(node.operator.symbol());
            // Pushed in reverse output order
            if node.operator.is_logical() {
                pieces.extend([
                    Piece::Text(")"),
                    right,
                    Piece::Text(" "),
                    symbol,
                    Piece::Text(" "),
                    left,
                    Piece::Text("("),
                ]);
            } else if node.operator.is_unary() {
                pieces.extend([symbol, Piece::Text(" "), left]);
            } else {
                pieces.extend([right, Piece::Text(" "), symbol, Piece::Text(" "), left]);
            }
        }
        Ok(())
    }
}
