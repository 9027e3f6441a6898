//! Stopping criteria for KD tree construction.
//!
//! A node keeps splitting while it is shallower than the depth limit and its
//! criterion value exceeds the threshold. The criterion is measured on the
//! node's bounding box or polygon count.

use std::fmt;
use std::str::FromStr;

use crate::{Aabb, Error, Result};

/// Metric compared against the threshold to decide whether a node splits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SplitCriterion {
    /// Number of polygons in the node.
    #[default]
    Polycount,
    /// Volume of the node's bounding box.
    Volume,
    /// Surface area of the node's bounding box.
    Area,
    /// Longest extent of the node's bounding box.
    Extent,
}

impl SplitCriterion {
    /// Evaluates the metric for a node with `polygon_count` polygons and
    /// bounds `aabb`.
    pub fn measure(self, polygon_count: usize, aabb: &Aabb) -> f64 {
        match self {
            SplitCriterion::Polycount => polygon_count as f64,
            SplitCriterion::Volume => aabb.volume(),
            SplitCriterion::Area => aabb.area(),
            SplitCriterion::Extent => aabb.longest_extent(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SplitCriterion::Polycount => "polycount",
            SplitCriterion::Volume => "volume",
            SplitCriterion::Area => "area",
            SplitCriterion::Extent => "extent",
        }
    }
}

impl fmt::Display for SplitCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SplitCriterion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "polycount" => Ok(SplitCriterion::Polycount),
            "volume" => Ok(SplitCriterion::Volume),
            "area" => Ok(SplitCriterion::Area),
            "extent" => Ok(SplitCriterion::Extent),
            other => Err(Error::Configuration(format!(
                "unknown split criterion '{other}'"
            ))),
        }
    }
}

/// Depth limit, criterion and threshold used while building a tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitLimit {
    max_depth: u32,
    criterion: SplitCriterion,
    threshold: f64,
}

impl SplitLimit {
    /// Creates a limit, rejecting a negative depth or a threshold that is
    /// not a positive number.
    pub fn new(max_depth: i32, criterion: SplitCriterion, threshold: f64) -> Result<Self> {
        let max_depth = u32::try_from(max_depth).map_err(|_| {
            Error::Configuration(format!("max depth must not be negative, got {max_depth}"))
        })?;
        if !(threshold.is_finite() && threshold > 0.0) {
            return Err(Error::Configuration(format!(
                "threshold must be a positive number, got {threshold}"
            )));
        }
        Ok(Self {
            max_depth,
            criterion,
            threshold,
        })
    }

    #[inline]
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    #[inline]
    pub fn criterion(&self) -> SplitCriterion {
        self.criterion
    }

    #[inline]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Returns `true` if a node at `depth` with the given contents must split.
    pub fn should_split(&self, depth: u32, polygon_count: usize, aabb: &Aabb) -> bool {
        depth < self.max_depth && self.criterion.measure(polygon_count, aabb) > self.threshold
    }
}
