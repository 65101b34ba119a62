use serde::Deserialize;

// Bottom boundary condition of the deepest layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BottomBoundary {
    #[default]
    FreeDrainage, // Percolation leaves the profile
    Impermeable,  // No deep loss
}

impl BottomBoundary {
    pub fn is_permeable(self) -> bool {
        matches!(self, BottomBoundary::FreeDrainage)
    }
}

// What to do when percolation would drive a layer's moisture below zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegativeMoisturePolicy {
    #[default]
    DiscardPercolation, // Drop the percolation term for that cell and step
    LimitPercolation,   // Percolate only the water that is there
}

impl NegativeMoisturePolicy {
    /// Apply the policy to a percolation amount [mm] drawn from a layer
    /// holding `storage` [mm]. Returns the percolation to use and whether
    /// the clamp fired.
    pub fn apply(self, percolation: f64, storage: f64, tolerance: f64) -> (f64, bool) {
        if storage - percolation >= -tolerance {
            return (percolation, false);
        }
        match self {
            NegativeMoisturePolicy::DiscardPercolation => (0.0, true),
            NegativeMoisturePolicy::LimitPercolation => (storage.max(0.0), true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percolation_within_storage_passes_through() {
        let policy = NegativeMoisturePolicy::DiscardPercolation;
        assert_eq!(policy.apply(2.0, 5.0, 0.0), (2.0, false));
    }

    #[test]
    fn discard_drops_the_whole_term() {
        let policy = NegativeMoisturePolicy::DiscardPercolation;
        assert_eq!(policy.apply(6.0, 5.0, 0.0), (0.0, true));
    }

    #[test]
    fn limit_drains_to_empty() {
        let policy = NegativeMoisturePolicy::LimitPercolation;
        assert_eq!(policy.apply(6.0, 5.0, 0.0), (5.0, true));
    }

    #[test]
    fn tolerance_allows_small_overdraw() {
        let policy = NegativeMoisturePolicy::DiscardPercolation;
        assert_eq!(policy.apply(5.5, 5.0, 1.0), (5.5, false));
    }

    #[test]
    fn impermeable_bottom_is_not_permeable() {
        assert!(BottomBoundary::FreeDrainage.is_permeable());
        assert!(!BottomBoundary::Impermeable.is_permeable());
    }
}
