//! Synthetic catchments shared by the integration tests.

#![allow(dead_code)]

use pesticide_balance::config::{ApplicationConfig, ApplicationEvent, Dose};
use pesticide_balance::{
    CellForcing, CodeField, CropParams, CropTable, DailyInputs, Field, LandUse, ModelConfig, Series,
    Simulation, Terrain,
};

pub const CROP: u32 = 7;

/// Loamy arable soil under maize.
pub fn maize() -> CropParams {
    CropParams {
        code: CROP,
        crop_type: 1.0,
        sow_year: 2016.0,
        sow_month: 4.0,
        sow_day: 1.0,
        len_ini: 30.0,
        len_dev: 40.0,
        len_mid: 50.0,
        len_end: 30.0,
        kcb_ini: 0.15,
        kcb_mid: 1.15,
        kcb_end: 0.5,
        max_lai: 5.0,
        mu: 0.45,
        max_height: 2.0,
        max_root_depth: 1.0,
        p_tab: 0.55,
        theta_sat_z0z1: 0.55,
        theta_fc_z0z1: 0.35,
        theta_sat_z2: 0.5,
        theta_fc_z2: 0.3,
        theta_wp: 0.1,
        k_sat_z0z1: 500.0,
        k_sat_z2: 200.0,
        cn2: 80.0,
    }
}

pub fn dry_day() -> CellForcing {
    CellForcing {
        precipitation: 0.0,
        et0: 3.0,
        wind: 2.0,
        humidity: 45.0,
        air_temperature: 15.0,
        bare_soil_temperature: 16.0,
    }
}

/// Configuration for `n_steps` days with no scheduled applications.
pub fn config(n_steps: usize) -> ModelConfig {
    let mut config = ModelConfig::default();
    config.simulation.n_steps = n_steps;
    config.simulation.milestone_days = Vec::new();
    config.applications = ApplicationConfig {
        doses: Vec::new(),
        events: Vec::new(),
    };
    config
}

/// One application of `dose` mg/m² on `day` to cells coded `code`.
pub fn single_application(day: usize, code: u32, dose: f64) -> ApplicationConfig {
    ApplicationConfig {
        doses: vec![Dose { code, dose }],
        events: vec![ApplicationEvent {
            day,
            codes: vec![code],
            delta: -32.3,
        }],
    }
}

/// Plane tilted towards the last row, steep enough that every cell drains
/// downslope.
pub fn tilted_plane(rows: usize, cols: usize) -> Field {
    Field::from_fn(rows, cols, |r, c| {
        100.0 + 0.05 * (rows - 1 - r) as f64 + 0.01 * (c as f64 - (cols - 1) as f64 / 2.0).abs()
    })
}

/// Storms every fifth day on a scalar forcing.
pub fn stormy(n_days: usize, storm: f64) -> DailyInputs {
    let base = dry_day();
    let mut inputs = DailyInputs::constant(n_days, base);
    inputs.precipitation = Series::Scalar(
        (0..n_days)
            .map(|d| if d % 5 == 1 { storm } else { 0.0 })
            .collect(),
    );
    inputs
}

/// Build a simulation on `elevation`, one crop everywhere.
pub fn simulation(
    config: ModelConfig,
    elevation: Field,
    farmer_crop: CodeField,
    inputs: DailyInputs,
) -> Simulation {
    let (rows, cols) = elevation.shape();
    let terrain = Terrain::from_elevation(elevation, &config.grid, &config.soil).unwrap();
    let crops = CropTable::from_rows(vec![maize()]).unwrap();
    let land_use = LandUse::new(CodeField::from_element(rows, cols, CROP));
    Simulation::new(config, terrain, crops, &land_use, &farmer_crop, inputs).unwrap()
}

/// Total water held by the profile [mm] summed over the grid.
pub fn profile_water(sim: &Simulation) -> f64 {
    use pesticide_balance::Layer;
    Layer::ALL
        .iter()
        .map(|&l| {
            sim.state().layers[l]
                .theta
                .component_mul(sim.terrain().depth(l))
                .sum()
        })
        .sum()
}
