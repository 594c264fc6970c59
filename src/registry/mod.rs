//! The item and function registry.
//!
//! A fixed, read-only mapping from what an expression can reference to how
//! each pass treats it: program variables, functions, and metadata items.

mod functions;
mod items;
mod value;
mod variables;

pub use functions::{AggregateFunction, Arity, DateUnit, FunctionKind};
pub use items::{resolve_item, ResolvedItem};
pub use value::{DataType, SampleValue};
pub use variables::ProgramVariable;
