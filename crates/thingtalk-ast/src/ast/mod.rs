//! Program tree.
//!
//! - `value`: constants, references and placeholders
//! - `filter`: boolean filters and their operators
//! - `invocation`: calls to device functions
//! - `table` / `stream`: query-side and trigger-side expressions
//! - `statement`: rules, declarations, datasets, permission rules
//! - `program`: the root
//! - `walk`: node path resolution

pub mod filter;
pub mod invocation;
pub mod program;
pub mod statement;
pub mod stream;
pub mod table;
pub mod value;
mod walk;

pub use filter::{ComputeFilter, Filter, FilterAtom, FilterOp};
pub use invocation::{DeviceSelector, InputParam, Invocation, OutputParam, Selector};
pub use program::{Program, TopLevel};
pub use statement::{
    Action, Annotations, Dataset, Declaration, DeclarationBody, DeclarationKind, Example,
    PermissionFunction, PermissionRule, Rule, RuleTrigger, PERMISSION_SOURCE,
};
pub use stream::Stream;
pub use table::{
    aggregate_schema, compute_schema, join_schema, projection_schema, AggregateOp, SortDirection,
    Table, DEFAULT_COMPUTE_ALIAS,
};
pub use value::{ComputeOp, DateEdge, DateValue, LocationValue, Value};
