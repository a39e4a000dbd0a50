//! # Usage Scenarios
//!
//! The fixed set of application contexts an aspect may run under. An
//! eligibility result is a subset of these flags, never a plain boolean.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, Not};

/// Bit-flag subset of usage scenarios
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsageScenarios(u8);

impl UsageScenarios {
    /// No scenario: the aspect may not run at all
    pub const NONE: Self = Self(0);
    /// Application inherited from a base declaration
    pub const INHERITANCE: Self = Self(0b001);
    /// Direct application to the declaration
    pub const DEFAULT: Self = Self(0b010);
    /// On-demand invocation from a live template
    pub const LIVE_TEMPLATE: Self = Self(0b100);
    /// Every scenario
    pub const ALL: Self = Self(0b111);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Scenarios in `self` but not in `other`
    pub fn minus(self, other: Self) -> Self {
        Self(self.0 & !other.0 & Self::ALL.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn is_all(self) -> bool {
        self == Self::ALL
    }
}

impl BitOr for UsageScenarios {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitAnd for UsageScenarios {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        self.intersection(rhs)
    }
}

impl Not for UsageScenarios {
    type Output = Self;
    fn not(self) -> Self {
        Self(!self.0 & Self::ALL.0)
    }
}

impl Default for UsageScenarios {
    fn default() -> Self {
        Self::ALL
    }
}

impl fmt::Display for UsageScenarios {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "none");
        }
        if self.is_all() {
            return write!(f, "all");
        }
        let mut names = Vec::new();
        if self.contains(Self::INHERITANCE) {
            names.push("inheritance");
        }
        if self.contains(Self::DEFAULT) {
            names.push("default");
        }
        if self.contains(Self::LIVE_TEMPLATE) {
            names.push("live_template");
        }
        write!(f, "{}", names.join("|"))
    }
}
