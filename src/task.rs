//! Tasks partition a record's components by purpose.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A named, ordered tag such as `default`, `detect` or `segment`.
///
/// Order only decides the sequence in which a record builds and visits its
/// task composites. Two tasks are the same task when their names match.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    name: String,
    order: u32,
}

impl Task {
    pub const DEFAULT: &'static str = "default";
    pub const DETECT: &'static str = "detect";
    pub const SEGMENT: &'static str = "segment";
    pub const CLASSIFY: &'static str = "classify";

    pub fn new(name: impl Into<String>, order: u32) -> Self {
        Self {
            name: name.into(),
            order,
        }
    }

    pub fn detect() -> Self {
        Self::new(Self::DETECT, 1)
    }

    pub fn segment() -> Self {
        Self::new(Self::SEGMENT, 2)
    }

    pub fn classify() -> Self {
        Self::new(Self::CLASSIFY, 3)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn order(&self) -> u32 {
        self.order
    }

    /// Sort key used when laying out task composites.
    pub(crate) fn cmp_order(&self, other: &Task) -> Ordering {
        self.order
            .cmp(&other.order)
            .then_with(|| self.name.cmp(&other.name))
    }
}

impl Default for Task {
    fn default() -> Self {
        Self::new(Self::DEFAULT, 0)
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Task {}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
