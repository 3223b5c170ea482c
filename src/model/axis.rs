//! The five relational axes.

use serde::{Deserialize, Serialize};

/// Five relational scores, each an integer in `[0, 99]`.
///
/// The same shape describes a single member, a pair of members and the
/// whole family; only the derivation differs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AxisSet {
    pub authority_flow: u8,
    pub care_flow: u8,
    pub emotional_dependency: u8,
    pub decision_influence: u8,
    pub resource_flow: u8,
}

impl AxisSet {
    /// Upper bound of every axis.
    pub const MAX: u8 = 99;

    /// Axis names in declaration order.
    pub const NAMES: [&'static str; 5] = [
        "authority_flow",
        "care_flow",
        "emotional_dependency",
        "decision_influence",
        "resource_flow",
    ];

    pub fn values(&self) -> [u8; 5] {
        [
            self.authority_flow,
            self.care_flow,
            self.emotional_dependency,
            self.decision_influence,
            self.resource_flow,
        ]
    }

    fn from_values(v: [u8; 5]) -> Self {
        Self {
            authority_flow: v[0],
            care_flow: v[1],
            emotional_dependency: v[2],
            decision_influence: v[3],
            resource_flow: v[4],
        }
    }

    /// Look an axis up by its name.
    pub fn get(&self, name: &str) -> Option<u8> {
        Self::NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| self.values()[i])
    }

    /// Combine two sets axis by axis.
    pub fn zip_with(&self, other: &AxisSet, f: impl Fn(u8, u8) -> u8) -> AxisSet {
        let (a, b) = (self.values(), other.values());
        Self::from_values(std::array::from_fn(|i| f(a[i], b[i])))
    }

    /// Floored per-axis mean of a non-empty slice. `None` for an empty one.
    pub fn mean(sets: &[AxisSet]) -> Option<AxisSet> {
        if sets.is_empty() {
            return None;
        }
        let mut sums = [0u32; 5];
        for set in sets {
            for (sum, v) in sums.iter_mut().zip(set.values()) {
                *sum += u32::from(v);
            }
        }
        let n = sets.len() as u32;
        Some(Self::from_values(sums.map(|s| (s / n) as u8)))
    }

    pub fn in_range(&self) -> bool {
        self.values().iter().all(|v| *v <= Self::MAX)
    }
}
