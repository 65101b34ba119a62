use std::env;

use log::info;

use pesticide_balance::snapshot::StateVariable;
use pesticide_balance::{
    CodeField, CropTable, DailyInputs, Field, LandUse, Layer, ModelConfig, ModelResult, Series, Simulation,
    Terrain,
};

const CROP_TABLE: &str = include_str!("../crop_table.toml");

// Hillslope draining to its bottom row: maize upslope, sugar beet below,
// a grass strip along the outlet edge
fn hillslope(rows: usize, cols: usize) -> (Field, CodeField) {
    let elevation = Field::from_fn(rows, cols, |r, c| {
        100.0 + 0.04 * (rows - 1 - r) as f64 + 0.01 * (c as f64 - (cols - 1) as f64 / 2.0).abs()
    });
    let codes = CodeField::from_fn(rows, cols, |r, _| {
        if r + 1 == rows {
            2
        } else if r < rows / 2 {
            1212
        } else {
            1511
        }
    });
    (elevation, codes)
}

// Weekly storms over a seasonal reference-ET cycle
fn forcing(n_days: usize) -> DailyInputs {
    let season = |day: usize| (2.0 * std::f64::consts::PI * (day as f64 - 100.0) / 365.0).cos();
    let daily = |f: &dyn Fn(usize) -> f64| Series::Scalar((0..n_days).map(f).collect());
    DailyInputs {
        precipitation: daily(&|d: usize| if d % 7 == 3 { 14.0 } else if d % 7 == 5 { 3.0 } else { 0.0 }),
        et0: daily(&|d: usize| 2.0 - 1.5 * season(d)),
        wind: daily(&|_: usize| 2.0),
        humidity: daily(&|d: usize| 60.0 + 15.0 * season(d)),
        air_temperature: daily(&|d: usize| 10.0 - 8.0 * season(d)),
        bare_soil_temperature: daily(&|d: usize| 11.0 - 9.0 * season(d)),
    }
}

fn main() -> ModelResult<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let config = match args.get(1) {
        Some(path) => ModelConfig::from_file(path)?,
        None => ModelConfig::default(),
    };
    let crops = match args.get(2) {
        Some(path) => CropTable::from_file(path)?,
        None => CropTable::from_toml_str(CROP_TABLE)?,
    };

    let (elevation, codes) = hillslope(12, 6);
    let terrain = Terrain::from_elevation(elevation, &config.grid, &config.soil)?;
    let land_use = LandUse::new(codes.clone());
    let inputs = forcing(config.simulation.n_steps);
    let mut model = Simulation::new(config, terrain, crops, &land_use, &codes, inputs)?;
    let series = model.run();

    println!(
        "Day, Rain [m3], Runoff [m3], Percolation [m3], ET [m3], Lateral outflow [m3], Storage change [m3], Water residual [m3], Applied [mg], Runoff loss [mg], Leached [mg], Degraded [mg], Catchment mass [mg], Delta [permil], Pesticide residual [mg]"
    );
    for i in 0..series.len() {
        println!(
            "{}, {:.4}, {:.4}, {:.4}, {:.4}, {:.4}, {:.4}, {:.3e}, {:.4}, {:.4}, {:.4}, {:.4}, {:.4}, {:.3}, {:.3e}",
            series.day[i],
            series.rain[i],
            series.runoff[i],
            series.percolation[i],
            series.evapotranspiration[i],
            series.lateral_outflow[i],
            series.storage_change[i],
            series.water_residual[i],
            series.applied[i],
            series.runoff_loss[i],
            series.leached[i],
            series.degraded[i],
            series.catchment_mass[i],
            series.catchment_delta[i],
            series.pesticide_residual[i]
        );
    }

    for snapshot in model.snapshots() {
        if let Some(mass) = snapshot.get(StateVariable::PesticideMass(Layer::Z0)) {
            info!(
                "{:?} snapshot on day {}: mixing-layer mass {:.4} mg, peak cell {:.4} mg",
                snapshot.reason,
                snapshot.day,
                mass.sum(),
                mass.max()
            );
        }
    }
    Ok(())
}
