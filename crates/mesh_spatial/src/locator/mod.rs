//! Bucketed point locators
//!
//! A uniform grid over the dataset bounds localizes nearest-neighbor and
//! merge queries to a handful of buckets instead of the whole point set.

mod grid;
mod merge;

pub use grid::BucketGrid;
pub use merge::{InsertResult, LocatorError, PointMergeLocator};
