//! # Aspect and Layer Types
//!
//! An [`AspectClass`] is the compiled identity of one transformation: its
//! layer chain, its inheritance link, its declared ordering constraints and
//! its eligibility rule. Classes are produced once per aspect-logic compile
//! and are immutable until the next compile replaces them wholesale.

use crate::eligibility::rule::EligibilityRule;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of one layer: the owning aspect class plus the intra-class index.
/// Index 0 is the class's default layer; named sub-stages follow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerId {
    pub aspect: String,
    pub index: u16,
}

impl LayerId {
    pub fn new(aspect: impl Into<String>, index: u16) -> Self {
        Self {
            aspect: aspect.into(),
            index,
        }
    }

    /// Default layer of an aspect class
    pub fn default_layer(aspect: impl Into<String>) -> Self {
        Self::new(aspect, 0)
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.index == 0 {
            write!(f, "{}", self.aspect)
        } else {
            write!(f, "{}:{}", self.aspect, self.index)
        }
    }
}

/// Compiled identity of one aspect class
#[derive(Clone)]
pub struct AspectClass {
    pub name: String,
    /// Position of the class in aspect-logic declaration order, used as the
    /// deterministic tie-break for equally ranked layers
    pub declaration_order: u32,
    /// Named sub-stages after the default layer
    pub layer_names: Vec<String>,
    /// Base aspect class this one derives from
    pub base: Option<String>,
    /// Aspect classes this one must fully precede
    pub before: Vec<String>,
    /// Aspect classes this one must fully follow
    pub after: Vec<String>,
    /// Eligibility rule gating application per declaration
    pub eligibility: EligibilityRule,
}

impl fmt::Debug for AspectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AspectClass")
            .field("name", &self.name)
            .field("declaration_order", &self.declaration_order)
            .field("layer_names", &self.layer_names)
            .field("base", &self.base)
            .field("before", &self.before)
            .field("after", &self.after)
            .finish()
    }
}

impl AspectClass {
    pub fn new(name: impl Into<String>, declaration_order: u32) -> Self {
        Self {
            name: name.into(),
            declaration_order,
            layer_names: Vec::new(),
            base: None,
            before: Vec::new(),
            after: Vec::new(),
            eligibility: EligibilityRule::always(),
        }
    }

    /// Append a named sub-stage after the default layer
    pub fn with_layer(mut self, layer_name: impl Into<String>) -> Self {
        self.layer_names.push(layer_name.into());
        self
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    /// Declare that this class executes before `other`
    pub fn executes_before(mut self, other: impl Into<String>) -> Self {
        self.before.push(other.into());
        self
    }

    /// Declare that this class executes after `other`
    pub fn executes_after(mut self, other: impl Into<String>) -> Self {
        self.after.push(other.into());
        self
    }

    pub fn with_eligibility(mut self, rule: EligibilityRule) -> Self {
        self.eligibility = rule;
        self
    }

    /// Total number of layers including the default layer
    pub fn layer_count(&self) -> u16 {
        1 + self.layer_names.len() as u16
    }

    /// Layer ids in intra-class order
    pub fn layer_ids(&self) -> impl Iterator<Item = LayerId> + '_ {
        (0..self.layer_count()).map(move |index| LayerId::new(self.name.clone(), index))
    }

    pub fn first_layer(&self) -> LayerId {
        LayerId::default_layer(self.name.clone())
    }

    pub fn last_layer(&self) -> LayerId {
        LayerId::new(self.name.clone(), self.layer_count() - 1)
    }
}

/// One layer with its assigned execution rank
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedLayer {
    pub layer: LayerId,
    pub rank: u32,
}

/// Deterministically ordered rank assignment for a full layer set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedLayers {
    layers: Vec<RankedLayer>,
}

impl RankedLayers {
    pub(crate) fn new(layers: Vec<RankedLayer>) -> Self {
        Self { layers }
    }

    pub fn iter(&self) -> impl Iterator<Item = &RankedLayer> {
        self.layers.iter()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn rank_of(&self, layer: &LayerId) -> Option<u32> {
        self.layers
            .iter()
            .find(|l| &l.layer == layer)
            .map(|l| l.rank)
    }

    /// Highest rank present, if any layers exist
    pub fn max_rank(&self) -> Option<u32> {
        self.layers.iter().map(|l| l.rank).max()
    }

    /// Layers of one rank, in deterministic tie-break order
    pub fn layers_at_rank(&self, rank: u32) -> impl Iterator<Item = &RankedLayer> {
        self.layers.iter().filter(move |l| l.rank == rank)
    }
}
