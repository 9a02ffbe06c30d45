//! Neighborhood weighting.
//!
//! For every target slice the table lists the slices within the radius
//! that contribute to its synthetic reference, together with their
//! weights. Slices at the stack boundary simply get fewer neighbors.

use std::collections::BTreeMap;
use histostack_core::{SliceIndex, SliceRange};
use crate::error::{IterationError, Result};
use crate::validation::validate_neighbor_weight;

/// Weight assigned to a neighbor of a target slice.
pub trait WeightFunction: Send + Sync {
    fn weight(&self, target: SliceIndex, neighbor: SliceIndex) -> f64;

    fn name(&self) -> &'static str;
}

/// Every neighbor contributes with weight 1.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformWeight;

impl WeightFunction for UniformWeight {
    fn weight(&self, _target: SliceIndex, _neighbor: SliceIndex) -> f64 {
        1.0
    }

    fn name(&self) -> &'static str {
        "uniform"
    }
}

/// Weight decays with slice distance as `exp(-d² / 2σ²)`.
#[derive(Debug, Clone, Copy)]
pub struct GaussianDecayWeight {
    sigma: f64,
}

impl GaussianDecayWeight {
    /// `sigma` must be finite and positive.
    pub fn new(sigma: f64) -> Result<Self> {
        if !sigma.is_finite() || sigma <= 0.0 {
            return Err(IterationError::configuration(format!(
                "Gaussian decay sigma must be finite and positive, got {}",
                sigma
            )));
        }
        Ok(Self { sigma })
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }
}

impl WeightFunction for GaussianDecayWeight {
    fn weight(&self, target: SliceIndex, neighbor: SliceIndex) -> f64 {
        let d = (neighbor - target) as f64;
        (-(d * d) / (2.0 * self.sigma * self.sigma)).exp()
    }

    fn name(&self) -> &'static str {
        "gaussian-decay"
    }
}

/// A contributing neighbor and its weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: SliceIndex,
    pub weight: f64,
}

/// Per-slice adjacency lists of contributing neighbors.
///
/// Every slice of the range has an entry, possibly empty. Neighbor lists
/// are sorted by index.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightTable {
    range: SliceRange,
    radius: u32,
    neighbors: BTreeMap<SliceIndex, Vec<Neighbor>>,
}

impl WeightTable {
    pub fn range(&self) -> SliceRange {
        self.range
    }

    pub fn radius(&self) -> u32 {
        self.radius
    }

    /// Neighbors of `target`; empty for slices outside the range.
    pub fn neighbors(&self, target: SliceIndex) -> &[Neighbor] {
        self.neighbors.get(&target).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Weight of the pair `(target, neighbor)`, if the pair exists.
    pub fn weight(&self, target: SliceIndex, neighbor: SliceIndex) -> Option<f64> {
        self.neighbors(target)
            .iter()
            .find(|n| n.index == neighbor)
            .map(|n| n.weight)
    }

    /// Total number of `(target, neighbor)` pairs.
    pub fn pair_count(&self) -> usize {
        self.neighbors.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pair_count() == 0
    }

    /// Iterate over `(target, neighbors)` in ascending slice order.
    pub fn iter(&self) -> impl Iterator<Item = (SliceIndex, &[Neighbor])> {
        self.neighbors.iter().map(|(&i, n)| (i, n.as_slice()))
    }
}

/// Compute uniform neighborhood weights.
pub fn compute_weights(range: SliceRange, radius: u32) -> WeightTable {
    let mut neighbors = BTreeMap::new();
    for target in range.iter() {
        let list: Vec<Neighbor> = range
            .window(target, radius)
            .filter(|&j| j != target)
            .map(|index| Neighbor { index, weight: 1.0 })
            .collect();
        neighbors.insert(target, list);
    }

    WeightTable { range, radius, neighbors }
}

/// Compute neighborhood weights with a custom weighting function.
///
/// Fails if the function yields a negative or non-finite weight.
pub fn compute_weights_with(
    range: SliceRange,
    radius: u32,
    function: &dyn WeightFunction,
) -> Result<WeightTable> {
    let mut neighbors = BTreeMap::new();
    for target in range.iter() {
        let mut list = Vec::new();
        for index in range.window(target, radius).filter(|&j| j != target) {
            let weight = function.weight(target, index);
            validate_neighbor_weight(target, index, weight)?;
            list.push(Neighbor { index, weight });
        }
        let total: f64 = list.iter().map(|n| n.weight).sum();
        if !list.is_empty() && !(total.is_finite() && total > 0.0) {
            return Err(IterationError::configuration(format!(
                "{} weights of slice {} sum to {}",
                function.name(),
                target,
                total
            )));
        }
        neighbors.insert(target, list);
    }

    tracing::debug!(
        "Computed {} weights for {} slices (radius {})",
        function.name(),
        range.len(),
        radius
    );

    Ok(WeightTable { range, radius, neighbors })
}
