pub mod aggregate;
pub mod boundary_cond;
pub mod config;
pub mod crop_table;
pub mod daily_inputs;
pub mod diagnostics;
pub mod drainage;
pub mod error;
pub mod isotope;
pub mod land_use;
pub mod moisture;
pub mod pesticide;
pub mod phenology;
pub mod potential_et;
pub mod raster;
pub mod root_uptake;
pub mod runoff;
pub mod schedule;
pub mod simulation;
pub mod snapshot;
pub mod state;
pub mod temperature;
pub mod terrain;

pub use aggregate::{OutletSeries, StepBalance};
pub use config::ModelConfig;
pub use crop_table::{CropParams, CropTable};
pub use daily_inputs::{CellForcing, DailyInputs, Series};
pub use drainage::DrainageGraph;
pub use error::{ModelError, ModelResult};
pub use land_use::LandUse;
pub use raster::{CodeField, Field, GridShape};
pub use simulation::Simulation;
pub use state::Layer;
pub use terrain::Terrain;
