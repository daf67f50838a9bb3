//! Filter expressions and ordering.
//!
//! - **`expression`** - the expression tree and its algebra (`between`, prepend, fold)
//! - **`order`** - ordering passed to selects
//! - **`sea`** - rendering of expressions to `sea_query` for SQL backends

pub mod expression;
pub mod order;
pub mod sea;

#[doc(inline)]
pub use expression::{Expression, LeftTerm, Operator, RightTerm};
pub use order::{Direction, OrderBy};
pub use sea::to_sea_value;
