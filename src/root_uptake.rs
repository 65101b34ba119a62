use crate::crop_table::LayerSoil;

/// Air-dry moisture as a fraction of the wilting point.
pub const AIR_DRY_FRACTION: f64 = 0.33;

// Water-stress parameters of one layer (FAO-56 dual coefficient method)
#[derive(Debug, Clone, Copy)]
pub struct StressParams {
    theta_wp: f64,   // Wilting point [-]
    theta_fc: f64,   // Field capacity [-]
    depletion: f64,  // Depletable fraction of available water [-]
}

impl StressParams {
    pub fn new(soil: &LayerSoil, depletion_fraction: f64) -> Self {
        StressParams {
            theta_wp: soil.theta_wp,
            theta_fc: soil.theta_fc,
            depletion: depletion_fraction,
        }
    }

    // Moisture below which transpiration is stressed
    pub fn theta_critical(&self) -> f64 {
        self.theta_wp + (1.0 - self.depletion) * (self.theta_fc - self.theta_wp)
    }

    // Transpiration reduction coefficient Ks in [0, 1]
    pub fn ks(&self, theta: f64) -> f64 {
        let span = self.theta_critical() - self.theta_wp;
        if span <= 0.0 {
            return if theta > self.theta_wp { 1.0 } else { 0.0 };
        }
        ((theta - self.theta_wp) / span).clamp(0.0, 1.0)
    }

    // Evaporation reduction coefficient Kr in [0, 1]
    pub fn kr(&self, theta: f64) -> f64 {
        let air_dry = AIR_DRY_FRACTION * self.theta_wp;
        ((theta - air_dry) / (self.theta_fc - air_dry)).clamp(0.0, 1.0)
    }

    pub fn air_dry(&self) -> f64 {
        AIR_DRY_FRACTION * self.theta_wp
    }

    pub fn theta_wp(&self) -> f64 {
        self.theta_wp
    }
}

// Share of potential transpiration drawn from a layer holding `root_depth_layer`
// mm of a root system `root_depth` mm deep; roots are denser near the surface
pub fn transpiration_share(root_depth: f64, root_depth_layer: f64, pot_transpir: f64) -> f64 {
    if root_depth <= 0.0 {
        return 0.0;
    }
    let frac = root_depth_layer / root_depth;
    2.0 * (1.0 - 0.5 * frac) * frac * pot_transpir
}
