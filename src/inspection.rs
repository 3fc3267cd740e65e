//! Per-chunk inspection: an observer that only looks at the bytes and a
//! transform that may rewrite them before they are forwarded.

pub mod patterns;
pub mod pipeline;

pub use patterns::{create_matcher, create_replacer};
pub use pipeline::{Matcher, Pipeline, Replacer};
