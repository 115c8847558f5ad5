//! Schema accumulation module
//!
//! Derives table headers from JSON records.
//!
//! # Features
//!
//! - **Flattening**: Nested objects become `parent_child` leaf columns
//! - **Header Union**: Fields observed across records (and runs) are merged
//! - **Stable Ordering**: Primary key columns first, the rest sorted

mod accumulator;
mod flatten;

pub use accumulator::{merge_header, order_header, HeaderAccumulator};
pub use flatten::{flatten, flatten_with, FlattenOptions, DEFAULT_SEPARATOR, SCALAR_FIELD};
