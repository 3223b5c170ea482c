//! Chart bodies and the per-member longitude mapping.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The closed set of bodies a chart contributes to the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BodyName {
    Sun,
    Moon,
    Mars,
    Mercury,
    Jupiter,
    Venus,
    Saturn,
    Rahu,
    Ketu,
    Ascendant,
}

impl BodyName {
    pub const COUNT: usize = 10;

    /// Every body, in resolution order.
    pub const ALL: [BodyName; Self::COUNT] = [
        BodyName::Sun,
        BodyName::Moon,
        BodyName::Mars,
        BodyName::Mercury,
        BodyName::Jupiter,
        BodyName::Venus,
        BodyName::Saturn,
        BodyName::Rahu,
        BodyName::Ketu,
        BodyName::Ascendant,
    ];

    /// Canonical (capitalized) chart key.
    pub fn as_str(&self) -> &'static str {
        match self {
            BodyName::Sun => "Sun",
            BodyName::Moon => "Moon",
            BodyName::Mars => "Mars",
            BodyName::Mercury => "Mercury",
            BodyName::Jupiter => "Jupiter",
            BodyName::Venus => "Venus",
            BodyName::Saturn => "Saturn",
            BodyName::Rahu => "Rahu",
            BodyName::Ketu => "Ketu",
            BodyName::Ascendant => "Ascendant",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for BodyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Longitudes resolved from one chart.
///
/// Unresolved bodies stay absent rather than being zero-filled, so callers
/// can tell "not in the chart" from "at 0°". Arithmetic goes through
/// [`AxisInput::degree`], which reads an absent body as 0.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AxisInput {
    degrees: [Option<f64>; BodyName::COUNT],
}

impl AxisInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`AxisInput::set`].
    pub fn with(mut self, body: BodyName, degree: f64) -> Self {
        self.set(body, degree);
        self
    }

    pub fn set(&mut self, body: BodyName, degree: f64) {
        self.degrees[body.index()] = Some(degree);
    }

    pub fn get(&self, body: BodyName) -> Option<f64> {
        self.degrees[body.index()]
    }

    /// Degree used by the axis arithmetic; missing bodies contribute 0.
    pub fn degree(&self, body: BodyName) -> f64 {
        self.get(body).unwrap_or(0.0)
    }

    pub fn contains(&self, body: BodyName) -> bool {
        self.get(body).is_some()
    }

    /// Number of resolved bodies.
    pub fn len(&self) -> usize {
        self.degrees.iter().filter(|d| d.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (BodyName, f64)> + '_ {
        BodyName::ALL
            .iter()
            .filter_map(|&body| self.get(body).map(|d| (body, d)))
    }
}

impl FromIterator<(BodyName, f64)> for AxisInput {
    fn from_iter<I: IntoIterator<Item = (BodyName, f64)>>(iter: I) -> Self {
        let mut input = AxisInput::new();
        for (body, degree) in iter {
            input.set(body, degree);
        }
        input
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_body_reads_as_zero() {
        let input = AxisInput::new().with(BodyName::Sun, 12.5);
        assert_eq!(input.get(BodyName::Moon), None);
        assert_eq!(input.degree(BodyName::Moon), 0.0);
        assert_eq!(input.degree(BodyName::Sun), 12.5);
    }

    #[test]
    fn test_zero_degree_is_present() {
        let input = AxisInput::new().with(BodyName::Ketu, 0.0);
        assert!(input.contains(BodyName::Ketu));
        assert_eq!(input.len(), 1);
    }

    #[test]
    fn test_iter_follows_body_order() {
        let input: AxisInput = [(BodyName::Venus, 3.0), (BodyName::Sun, 1.0)].into_iter().collect();
        let bodies: Vec<_> = input.iter().map(|(b, _)| b).collect();
        assert_eq!(bodies, vec![BodyName::Sun, BodyName::Venus]);
    }
}
