//! Filter grammar, sort spec and paging over a table snapshot.

pub mod engine;
pub mod filter;
pub mod sort;

pub use engine::{Page, PageRequest, QueryEngine};
pub use filter::{Condition, Filter, Literal, Operator, Predicate};
pub use sort::{Direction, SortKey, SortSpec};
