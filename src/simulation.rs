use log::{debug, info, warn};

use crate::aggregate::{OutletSeries, StepBalance, StepFluxes};
use crate::config::ModelConfig;
use crate::crop_table::CropTable;
use crate::daily_inputs::{CellForcing, DailyInputs};
use crate::diagnostics::{BalanceKind, ClampEvent, ClampKind, Diagnostics, ResidualFault};
use crate::error::{ModelError, ModelResult};
use crate::land_use::{CropAssignment, LandUse};
use crate::moisture::WaterStep;
use crate::pesticide::PesticideStep;
use crate::phenology::{julian_day, CropDay};
use crate::raster::CodeField;
use crate::schedule::ApplicationSchedule;
use crate::snapshot::{Snapshot, SnapshotReason};
use crate::state::{ByLayer, Layer, SimulationState};
use crate::temperature::{layer_temperature, surface_temperature, ThermalSoil};
use crate::terrain::Terrain;

// Daily water, temperature and pesticide balance of a gridded three-layer soil
pub struct Simulation {
    config: ModelConfig,
    terrain: Terrain,
    crops: CropTable,
    assignment: CropAssignment,
    inputs: DailyInputs,
    schedule: ApplicationSchedule,
    state: SimulationState,
    jd_start: f64, // Julian day of the first step
    kd_rho: f64,   // Sorption term K_d × bulk density [-]
    series: OutletSeries,
    snapshots: Vec<Snapshot>,
    diagnostics: Diagnostics,
}

impl Simulation {
    /// Check every input against the grid and build the initial state.
    pub fn new(
        config: ModelConfig,
        terrain: Terrain,
        crops: CropTable,
        land_use: &LandUse,
        farmer_crop: &CodeField,
        inputs: DailyInputs,
    ) -> ModelResult<Self> {
        config.validate()?;
        let shape = terrain.shape();
        if land_use.shape() != shape {
            return Err(ModelError::ShapeMismatch {
                name: "land_use".to_string(),
                expected: (shape.rows, shape.cols),
                found: (land_use.shape().rows, land_use.shape().cols),
            });
        }
        shape.check("farmer_crop", farmer_crop)?;
        inputs.validate(config.simulation.n_steps, shape)?;

        let assignment = land_use.resolve(&crops)?;
        let schedule = ApplicationSchedule::build(&config.applications, farmer_crop, terrain.cell_area())?;
        let state = SimulationState::initialize(&config, &terrain);

        let sim = &config.simulation;
        let jd_start = julian_day(
            f64::from(sim.start_year),
            f64::from(sim.start_month),
            f64::from(sim.start_day),
        );
        let kd_rho = config.pesticide.k_d(config.soil.organic_carbon) * config.soil.bulk_density;

        info!(
            "{}x{} grid, {} outlet(s), {} steps from {}-{:02}-{:02}, {} application day(s)",
            shape.rows,
            shape.cols,
            terrain.drainage().outlets().len(),
            sim.n_steps,
            sim.start_year,
            sim.start_month,
            sim.start_day,
            schedule.days().count()
        );

        Ok(Simulation {
            series: OutletSeries::with_capacity(config.simulation.n_steps),
            config,
            terrain,
            crops,
            assignment,
            inputs,
            schedule,
            state,
            jd_start,
            kd_rho,
            snapshots: Vec::new(),
            diagnostics: Diagnostics::default(),
        })
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn terrain(&self) -> &Terrain {
        &self.terrain
    }

    pub fn series(&self) -> &OutletSeries {
        &self.series
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn is_finished(&self) -> bool {
        self.state.day >= self.config.simulation.n_steps
    }

    /// Advance the whole grid by one day. `None` once every configured step
    /// has run.
    pub fn step(&mut self) -> Option<StepBalance> {
        if self.is_finished() {
            return None;
        }
        let day = self.state.day;
        let jd = self.jd_start + day as f64;
        let shape = self.terrain.shape();

        let forcing: Vec<CellForcing> = (0..shape.len()).map(|cell| self.inputs.at(day, cell)).collect();
        let crops: Vec<CropDay> = (0..shape.len())
            .map(|cell| {
                let crop = self.assignment.crop_at(&self.crops, cell, day);
                let depths = Layer::ALL.map(|l| self.terrain.depth(l)[cell]);
                CropDay::new(crop, jd, &forcing[cell], depths, self.config.hydro.lai_decline)
            })
            .collect();
        let rain = shape.field_from_fn(|cell| forcing[cell].precipitation);
        let air_temperature = shape.field_from_fn(|cell| forcing[cell].air_temperature);

        for layer in Layer::ALL {
            let l = &mut self.state.layers[layer];
            l.theta_initial = l.theta.clone();
            l.mass_initial = l.mass.clone();
        }
        self.update_temperature(&crops, &forcing);

        let water_step = WaterStep {
            day,
            terrain: &self.terrain,
            crops: &crops,
            hydro: &self.config.hydro,
        };
        let pesticide_step = PesticideStep {
            day,
            terrain: &self.terrain,
            crops: &crops,
            config: &self.config.pesticide,
            kd_rho: self.kd_rho,
            air_temperature: &air_temperature,
            volatilize: !self.config.pesticide.volatilize_on_application_only
                || self.schedule.is_application_day(day),
        };
        let mut clamps: Vec<ClampEvent> = Vec::new();
        let layers = &mut self.state.layers;

        let (w0, events) = water_step.surface_layer(&layers[Layer::Z0].theta, &layers[Layer::Z1].theta, &rain);
        clamps.extend(events);
        let (m0, events) = pesticide_step.surface_layer(&mut layers[Layer::Z0], &w0, self.schedule.on_day(day));
        clamps.extend(events);

        let (w1, events) = water_step.subsurface_layer(Layer::Z1, &layers[Layer::Z1].theta, &w0.to_below());
        clamps.extend(events);
        let (m1, events) = pesticide_step.subsurface_layer(Layer::Z1, &mut layers[Layer::Z1], &w1, &m0);
        clamps.extend(events);

        let (w2, events) = water_step.subsurface_layer(Layer::Z2, &layers[Layer::Z2].theta, &w1.to_below());
        clamps.extend(events);
        let (m2, events) = pesticide_step.subsurface_layer(Layer::Z2, &mut layers[Layer::Z2], &w2, &m1);
        clamps.extend(events);

        let water = ByLayer([w0, w1, w2]);
        let mass = ByLayer([m0, m1, m2]);
        for layer in Layer::ALL {
            layers[layer].theta = water[layer].theta_final.clone();
        }

        let counters = &mut self.state.cumulative;
        for (layer, m) in mass.iter() {
            counters.applied += &m.applied;
            counters.runoff += &m.runoff;
            counters.volatilized += &m.volatilized;
            counters.lateral += m.lateral_net();
            counters.degraded += &m.degraded;
            if layer == Layer::Z2 {
                counters.leached += &m.leached;
            }
        }

        let fluxes = StepFluxes {
            rain: &rain,
            water: &water,
            mass: &mass,
        };
        let balance = StepBalance::compute(day, &self.terrain, &fluxes, &self.state);
        self.state.day += 1;
        self.series.push(&balance);
        self.check_balance(&balance, &clamps);
        Some(balance)
    }

    /// Run every remaining step.
    pub fn run(&mut self) -> &OutletSeries {
        while self.step().is_some() {}
        let last = self.series.len().saturating_sub(1);
        info!(
            "run finished after {} steps: {} snapshot(s), catchment mass {:.4} mg",
            self.series.len(),
            self.snapshots.len(),
            self.series.catchment_mass.get(last).copied().unwrap_or(0.0)
        );
        if !self.diagnostics.is_clean() {
            warn!(
                "{} negative-moisture, {} moisture-bound and {} negative-mass clamp(s), {} balance fault(s)",
                self.diagnostics.count(ClampKind::NegativeMoisture),
                self.diagnostics.count(ClampKind::MoistureBounds),
                self.diagnostics.count(ClampKind::NegativeMass),
                self.diagnostics.faults().len()
            );
        }
        &self.series
    }

    // Surface temperature, then every layer from its start-of-step moisture
    fn update_temperature(&mut self, crops: &[CropDay], forcing: &[CellForcing]) {
        let soil = &self.config.soil;
        let total_depth = self.terrain.total_depth();
        let water_depth = Layer::ALL.map(|l| self.state.layers[l].water_depth(self.terrain.depth(l)));
        for (cell, crop) in crops.iter().enumerate() {
            let surface = surface_temperature(
                crop.biomass_cover,
                self.state.temp_surface[cell],
                forcing[cell].bare_soil_temperature,
            );
            self.state.temp_surface[cell] = surface;

            let thermal = ThermalSoil {
                bulk_density: soil.bulk_density,
                total_depth: total_depth[cell],
                lag: soil.lag,
                mean_air_temperature: soil.mean_air_temperature,
            };
            for layer in Layer::ALL {
                let l = &mut self.state.layers[layer];
                l.temperature[cell] = layer_temperature(
                    &thermal,
                    l.temperature[cell],
                    self.terrain.centre_depth(layer)[cell],
                    water_depth[layer.index()][cell],
                    surface,
                );
            }
        }
    }

    fn check_balance(&mut self, balance: &StepBalance, clamps: &[ClampEvent]) {
        let day = balance.day;
        debug!(
            "day {}: rain {:.3} runoff {:.3} ET {:.3} water residual {:.3e}; mass {:.4} δ {:.2} pesticide residual {:.3e}",
            day,
            balance.rain,
            balance.runoff,
            balance.evapotranspiration,
            balance.water_residual,
            balance.catchment_mass,
            balance.catchment_delta,
            balance.pesticide_residual
        );

        for &event in clamps {
            self.diagnostics.record(event);
        }
        let tolerance = self.config.simulation.balance_tolerance;
        let mut faulted = false;
        for (kind, residual, relative) in [
            (BalanceKind::Water, balance.water_residual, balance.water_relative()),
            (BalanceKind::Pesticide, balance.pesticide_residual, balance.pesticide_relative()),
        ] {
            if relative.is_nan() || relative > tolerance {
                self.diagnostics.record_fault(ResidualFault {
                    day,
                    kind,
                    residual,
                    relative,
                });
                faulted = true;
            }
        }

        if self.config.simulation.milestone_days.contains(&day) {
            info!("day {day}: milestone snapshot");
            self.snapshots
                .push(Snapshot::capture(day, &self.state, SnapshotReason::Milestone));
        }
        if self.config.simulation.diagnostic_snapshots {
            if !clamps.is_empty() {
                self.snapshots
                    .push(Snapshot::capture(day, &self.state, SnapshotReason::Clamp));
            }
            if faulted {
                self.snapshots
                    .push(Snapshot::capture(day, &self.state, SnapshotReason::BalanceResidual));
            }
        }
    }
}
