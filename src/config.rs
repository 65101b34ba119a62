//! Run configuration, loaded from TOML.
//!
//! Every section falls back to its `Default`, which carries the calibrated
//! constants of the reference catchment (S-metolachlor on loamy fields, 2 m
//! cells, 280 daily steps from 1 October 2015).

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::boundary_cond::{BottomBoundary, NegativeMoisturePolicy};
use crate::error::{ModelError, ModelResult};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    pub simulation: SimulationConfig,
    pub grid: GridConfig,
    pub soil: SoilConfig,
    pub hydro: HydroConfig,
    pub pesticide: PesticideConfig,
    pub applications: ApplicationConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    pub start_year: i32,
    pub start_month: u32,
    pub start_day: u32,
    /// Number of daily steps.
    pub n_steps: usize,
    /// Simulation days (0-based) at which full-grid snapshots are kept.
    pub milestone_days: Vec<usize>,
    /// Relative tolerance on the outlet mass-balance residuals.
    pub balance_tolerance: f64,
    /// Keep a diagnostic snapshot whenever a clamp fires or a residual
    /// exceeds the tolerance.
    pub diagnostic_snapshots: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            start_year: 2015,
            start_month: 10,
            start_day: 1,
            n_steps: 280,
            milestone_days: vec![199, 273],
            balance_tolerance: 1e-6,
            diagnostic_snapshots: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridConfig {
    /// Cell edge length [m].
    pub cell_size: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig { cell_size: 2.0 }
    }
}

impl GridConfig {
    /// Cell area [m²].
    pub fn cell_area(&self) -> f64 {
        self.cell_size * self.cell_size
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SoilConfig {
    /// Bulk density [g/cm³ = kg/L].
    pub bulk_density: f64,
    /// Organic carbon fraction [kg/kg].
    pub organic_carbon: f64,
    /// Mixing-layer depth [mm].
    pub z0_depth: f64,
    /// Second layer depth [mm].
    pub z1_depth: f64,
    /// Total profile depth at the lowest cell [mm]; deeper upslope by the
    /// elevation difference.
    pub profile_depth: f64,
    pub initial_theta: [f64; 3],
    /// Initial soil and surface temperature [°C].
    pub initial_temperature: f64,
    /// Temperature lag coefficient, 0 < lag < 1.
    pub lag: f64,
    /// Mean annual air temperature [°C].
    pub mean_air_temperature: f64,
}

impl Default for SoilConfig {
    fn default() -> Self {
        SoilConfig {
            bulk_density: 1.4,
            organic_carbon: 0.021,
            z0_depth: 10.0,
            z1_depth: 140.0,
            profile_depth: 300.0,
            initial_theta: [0.4; 3],
            initial_temperature: 15.0,
            lag: 0.8,
            mean_air_temperature: 12.2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HydroConfig {
    /// Subsurface lateral-flow coefficient per layer, in [0, 1].
    pub lateral_coefficient: [f64; 3],
    /// Drainage exponent (gamma) of the tau parameterisation, per layer.
    pub drainage_exponent: [f64; 3],
    /// Calibration multiplier on saturated conductivity, per layer.
    pub conductivity_scale: [f64; 3],
    /// Artificial (tile) drainage per layer. The mixing layer cannot be drained.
    pub artificial_drainage: [bool; 3],
    pub artificial_drainage_coefficient: f64,
    pub bottom_boundary: BottomBoundary,
    pub evapotranspiration: bool,
    /// LAI decline coefficient in the late season.
    pub lai_decline: f64,
    pub negative_moisture_policy: NegativeMoisturePolicy,
    /// Overdraw [mm] tolerated before the negative-moisture policy fires.
    pub negative_moisture_tolerance: f64,
}

impl Default for HydroConfig {
    fn default() -> Self {
        HydroConfig {
            lateral_coefficient: [0.25; 3],
            drainage_exponent: [0.8063; 3],
            conductivity_scale: [1.0, 1.0, 0.5],
            artificial_drainage: [false; 3],
            artificial_drainage_coefficient: 0.25,
            bottom_boundary: BottomBoundary::FreeDrainage,
            evapotranspiration: true,
            lai_decline: 0.03,
            negative_moisture_policy: NegativeMoisturePolicy::DiscardPercolation,
            negative_moisture_tolerance: 0.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PesticideConfig {
    /// Organic-carbon partition coefficient [mL/g].
    pub k_oc: f64,
    /// Dimensionless Henry constant at the reference temperature.
    pub henry: f64,
    /// Enthalpy of volatilisation [J/mol].
    pub henry_enthalpy: f64,
    /// Diffusion coefficient in free air [m²/day].
    pub air_diffusion: f64,
    /// Laminar air boundary layer above the soil [m].
    pub boundary_layer: f64,
    /// Volatilise only on application days (peak loss period).
    pub volatilize_on_application_only: bool,
    /// Reference half-life [days].
    pub dt50_ref: f64,
    /// Reference temperature [°C].
    pub temp_ref: f64,
    /// Moisture-correction exponent.
    pub beta_moisture: f64,
    /// Activation energy [J/mol].
    pub activation_energy: f64,
    /// Gas constant [J/mol/K].
    pub gas_constant: f64,
    /// Isotope ratio of the reference standard (VPDB for carbon).
    pub r_standard: f64,
    /// Kinetic fractionation factor, heavy over light rate constant.
    pub alpha_iso: f64,
    /// Background residue per layer [mg/kg soil].
    pub background_concentration: [f64; 3],
    /// Background isotope signature [‰].
    pub background_delta: f64,
}

impl Default for PesticideConfig {
    fn default() -> Self {
        PesticideConfig {
            k_oc: 120.0,
            henry: 3.1326141504e-8,
            henry_enthalpy: 95_000.0,
            air_diffusion: 0.43,
            boundary_layer: 0.005,
            volatilize_on_application_only: true,
            dt50_ref: 15.0,
            temp_ref: 20.0,
            beta_moisture: 1.0,
            activation_energy: 54_000.0,
            gas_constant: 8.314,
            r_standard: 0.0112372,
            alpha_iso: 0.9985,
            background_concentration: [0.06, 0.03, 0.00001],
            background_delta: -23.7,
        }
    }
}

impl PesticideConfig {
    /// Soil-water distribution coefficient [L/kg].
    pub fn k_d(&self, organic_carbon: f64) -> f64 {
        self.k_oc * organic_carbon
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Dose {
    /// Farmer × crop code.
    pub code: u32,
    /// Active ingredient [mg/m²].
    pub dose: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplicationEvent {
    /// Simulation day (0-based) of the application.
    pub day: usize,
    /// Farmer × crop codes treated on that day.
    pub codes: Vec<u32>,
    /// Isotope signature of the product [‰].
    pub delta: f64,
}

/// A missing `[applications]` table keeps the reference schedule; a present
/// one replaces it entirely.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplicationConfig {
    #[serde(default, rename = "dose")]
    pub doses: Vec<Dose>,
    #[serde(default, rename = "event")]
    pub events: Vec<ApplicationEvent>,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        // Product label rate [L/m²] times active ingredient [mg/L]
        let gold = 960_000.0;
        let dual_gold = 915_000.0;
        let corn = 2.0e-4 * gold;
        let beet = 0.6e-4 * 2.0 * gold;
        let early_beet = 0.6e-4 * 3.0 * gold;
        let doses = [
            (1111, early_beet),
            (1122, corn),
            (1212, corn),
            (1312, corn),
            (1412, 2.1e-4 * dual_gold),
            (1511, beet),
            (1611, beet),
            (1711, early_beet),
        ]
        .into_iter()
        .map(|(code, dose)| Dose { code, dose })
        .collect();

        let events = vec![
            ApplicationEvent {
                day: 177,
                codes: vec![1111, 1711],
                delta: -32.3,
            },
            ApplicationEvent {
                day: 197,
                codes: vec![1511, 1611],
                delta: -32.3,
            },
            ApplicationEvent {
                day: 238,
                codes: vec![1212, 1412, 1312],
                delta: -32.3,
            },
        ];
        ApplicationConfig { doses, events }
    }
}

impl ModelConfig {
    pub fn from_toml_str(text: &str) -> ModelResult<Self> {
        let config: ModelConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> ModelResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> ModelResult<()> {
        let positive = [
            ("grid.cell_size", self.grid.cell_size),
            ("soil.bulk_density", self.soil.bulk_density),
            ("soil.z0_depth", self.soil.z0_depth),
            ("soil.z1_depth", self.soil.z1_depth),
            ("pesticide.dt50_ref", self.pesticide.dt50_ref),
            ("pesticide.r_standard", self.pesticide.r_standard),
            ("pesticide.alpha_iso", self.pesticide.alpha_iso),
            ("pesticide.gas_constant", self.pesticide.gas_constant),
            ("pesticide.air_diffusion", self.pesticide.air_diffusion),
        ];
        for (name, value) in positive {
            if !(value > 0.0) {
                return Err(ModelError::invalid(name, value, "must be positive"));
            }
        }

        let lag = self.soil.lag;
        if !(lag > 0.0 && lag < 1.0) {
            return Err(ModelError::invalid("soil.lag", lag, "must lie in (0, 1)"));
        }
        if self.soil.profile_depth <= self.soil.z0_depth + self.soil.z1_depth {
            return Err(ModelError::invalid(
                "soil.profile_depth",
                self.soil.profile_depth,
                "must exceed the two upper layers",
            ));
        }
        for (i, &c) in self.hydro.lateral_coefficient.iter().enumerate() {
            if !(0.0..=1.0).contains(&c) {
                return Err(ModelError::invalid(
                    &format!("hydro.lateral_coefficient[{i}]"),
                    c,
                    "must lie in [0, 1]",
                ));
            }
        }
        let c_adr = self.hydro.artificial_drainage_coefficient;
        if !(0.0..=1.0).contains(&c_adr) {
            return Err(ModelError::invalid(
                "hydro.artificial_drainage_coefficient",
                c_adr,
                "must lie in [0, 1]",
            ));
        }
        if self.hydro.artificial_drainage[0] {
            return Err(ModelError::invalid(
                "hydro.artificial_drainage[0]",
                1.0,
                "the mixing layer cannot be drained",
            ));
        }
        for (i, &theta) in self.soil.initial_theta.iter().enumerate() {
            if !(0.0..=1.0).contains(&theta) {
                return Err(ModelError::invalid(
                    &format!("soil.initial_theta[{i}]"),
                    theta,
                    "must be a volumetric fraction",
                ));
            }
        }
        for dose in &self.applications.doses {
            if dose.dose < 0.0 {
                return Err(ModelError::invalid(
                    &format!("applications.dose[{}]", dose.code),
                    dose.dose,
                    "must not be negative",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn defaults_are_valid() {
        ModelConfig::default().validate().unwrap();
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = ModelConfig::from_toml_str("").unwrap();
        assert_eq!(config.simulation.n_steps, 280);
        assert_eq!(config.applications.events.len(), 3);
        assert_relative_eq!(
            config.pesticide.k_d(config.soil.organic_carbon),
            2.52,
            epsilon = 1e-12
        );
    }

    #[test]
    fn partial_sections_override_defaults() {
        let text = r#"
            [simulation]
            n_steps = 10

            [hydro]
            bottom_boundary = "impermeable"
            negative_moisture_policy = "limit_percolation"

            [[applications.dose]]
            code = 7
            dose = 1.0

            [[applications.event]]
            day = 1
            codes = [7]
            delta = -30.0
        "#;
        let config = ModelConfig::from_toml_str(text).unwrap();
        assert_eq!(config.simulation.n_steps, 10);
        assert_eq!(config.simulation.start_year, 2015);
        assert_eq!(config.hydro.bottom_boundary, BottomBoundary::Impermeable);
        assert_eq!(
            config.hydro.negative_moisture_policy,
            NegativeMoisturePolicy::LimitPercolation
        );
        assert_eq!(config.applications.doses.len(), 1);
        assert_eq!(config.applications.events[0].codes, vec![7]);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(
            ModelConfig::from_toml_str("[soil]\ndepth = 3.0"),
            Err(ModelError::Toml(_))
        ));
    }

    #[test]
    fn lag_outside_unit_interval_is_rejected() {
        let mut config = ModelConfig::default();
        config.soil.lag = 1.0;
        assert!(matches!(
            config.validate(),
            Err(ModelError::InvalidParameter { .. })
        ));
    }
}
