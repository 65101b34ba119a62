// Soil temperature by the damping-depth method with a lag coefficient
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermalSoil {
    pub bulk_density: f64,         // [g/cm³]
    pub total_depth: f64,          // Whole-profile thickness [mm]
    pub lag: f64,                  // Lag coefficient in (0, 1)
    pub mean_air_temperature: f64, // Mean annual air temperature [°C]
}

impl ThermalSoil {
    pub fn max_damping_depth(&self) -> f64 {
        let pb = self.bulk_density;
        2500.0 * pb / (pb + 686.0 * (-5.63 * pb).exp())
    }

    // Damping depth [mm] scaled by the water held in the layer
    pub fn damping_depth(&self, water_depth: f64) -> f64 {
        let dd_max = self.max_damping_depth();
        let phi = water_depth / ((0.356 - 0.144 * self.bulk_density) * self.total_depth);
        dd_max * ((500.0 / dd_max).ln() * ((1.0 - phi) / (1.0 + phi)).powi(2)).exp()
    }
}

pub fn surface_temperature(biomass_cover: f64, previous_surface: f64, bare_soil: f64) -> f64 {
    biomass_cover * previous_surface + (1.0 - biomass_cover) * bare_soil
}

/**
Lagged temperature of a layer whose centre lies `centre_depth` mm below the
surface and holds `water_depth` mm of water.
*/
pub fn layer_temperature(
    soil: &ThermalSoil,
    previous: f64,
    centre_depth: f64,
    water_depth: f64,
    surface: f64,
) -> f64 {
    let zd = centre_depth / soil.damping_depth(water_depth);
    let df = zd / (zd + (-0.867 - 2.708 * zd).exp());
    let equilibrium = df * (soil.mean_air_temperature - surface) + surface;
    soil.lag * previous + (1.0 - soil.lag) * equilibrium
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn soil() -> ThermalSoil {
        ThermalSoil {
            bulk_density: 1.4,
            total_depth: 300.0,
            lag: 0.8,
            mean_air_temperature: 12.2,
        }
    }

    #[test]
    fn damping_depth_shrinks_as_soil_dries() {
        let soil = soil();
        let wet = soil.damping_depth(100.0);
        let dry = soil.damping_depth(0.0);
        assert_relative_eq!(dry, 500.0, epsilon = 1e-9);
        assert!(wet > dry && wet <= soil.max_damping_depth());
    }

    #[test]
    fn deep_layers_track_the_annual_mean() {
        let soil = soil();
        let shallow = layer_temperature(&soil, 20.0, 5.0, 4.0, 20.0);
        let deep = layer_temperature(&soil, 20.0, 5000.0, 4.0, 20.0);
        assert_relative_eq!(shallow, 20.0 - 0.2 * (20.0 - 12.2) * shallow_factor(&soil), epsilon = 1e-9);
        assert!(deep < shallow);
        assert!(deep > 12.2);
    }

    fn shallow_factor(soil: &ThermalSoil) -> f64 {
        let zd = 5.0 / soil.damping_depth(4.0);
        zd / (zd + (-0.867 - 2.708 * zd).exp())
    }

    #[test]
    fn uniform_temperatures_stay_put() {
        let soil = soil();
        assert_relative_eq!(layer_temperature(&soil, 12.2, 80.0, 50.0, 12.2), 12.2, epsilon = 1e-12);
        assert_relative_eq!(surface_temperature(0.3, 10.0, 10.0), 10.0, epsilon = 1e-12);
        assert_relative_eq!(surface_temperature(0.0, 4.0, 18.0), 18.0);
    }
}
