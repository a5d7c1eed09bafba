//! Wildcard matching and boolean tag queries

mod matcher;
mod tags;

pub use matcher::{normalize, Matcher};
pub use tags::{contains_tag, contains_tag_pattern};
