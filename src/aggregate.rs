//! Catchment aggregation: per-cell fluxes of one step accumulated along the
//! drainage graph to the outlets, and the two balance residuals checked
//! every step.
//!
//! Two levels, as for model outputs elsewhere: `StepBalance` holds a single
//! step, `OutletSeries` holds the whole run (one Vec per field).

use crate::isotope::MASS_EPS;
use crate::moisture::LayerWater;
use crate::pesticide::LayerMass;
use crate::raster::{Field, GridShape};
use crate::state::{ByLayer, Layer, SimulationState};
use crate::terrain::Terrain;

/// Per-cell fluxes produced by one step of the layer models.
pub struct StepFluxes<'a> {
    /// Precipitation reaching the surface [mm].
    pub rain: &'a Field,
    pub water: &'a ByLayer<LayerWater>,
    pub mass: &'a ByLayer<LayerMass>,
}

/// Outlet totals of one step. Water in m³, pesticide in mg.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepBalance {
    pub day: usize,
    pub rain: f64,                    // precipitation volume
    pub runoff: f64,                  // surface runoff incl. overflow returned to the surface
    pub percolation: f64,             // deep percolation out of the bottom layer
    pub evapotranspiration: f64,      // actual ET, all layers
    pub net_lateral: f64,             // lateral inflow − outflow, all layers
    pub drainage: f64,                // artificial drainage
    pub storage_change: f64,          // Δ soil water
    pub water_residual: f64,          // should stay ≈ 0
    pub lateral_outflow: f64,         // lateral outflow, all layers
    pub discharge: f64,               // runoff + lateral outflow
    pub applied: f64,                 // pesticide applied
    pub runoff_loss: f64,             // mass exported with runoff
    pub leached: f64,                 // mass leached out of the profile
    pub volatilized: f64,             // mass volatilised
    pub lateral_flux: f64,            // net lateral mass exchange
    pub degraded: f64,                // mass degraded
    pub mass_change: f64,             // Δ pesticide storage
    pub pesticide_residual: f64,      // should stay ≈ 0
    pub catchment_mass: f64,          // pesticide held by the profile after the step
    pub catchment_delta: f64,         // mass-weighted signature of that mass [‰]
    pub cumulative_applied: f64,      // run-to-date totals
    pub cumulative_runoff_loss: f64,
    pub cumulative_leached: f64,
    pub cumulative_volatilized: f64,
    pub cumulative_lateral_flux: f64,
    pub cumulative_degraded: f64,
    pub cumulative_residual: f64,     // initial + inputs − losses − current storage
}

impl StepBalance {
    /// Aggregate the fluxes of step `day`. `state` must already hold the
    /// post-step moisture and mass, with the start-of-step values kept in
    /// the `*_initial` fields, and cumulative counters including this step.
    pub fn compute(day: usize, terrain: &Terrain, fluxes: &StepFluxes, state: &SimulationState) -> Self {
        let shape = terrain.shape();
        let drainage = terrain.drainage();
        let area = terrain.cell_area();
        // mm over one cell → m³
        let volume = |field: &Field| drainage.outlet_total(field) * area / 1000.0;
        let total = |field: &Field| drainage.outlet_total(field);
        let water = fluxes.water;
        let mass = fluxes.mass;

        let storage = Layer::ALL.iter().fold(shape.zeros(), |acc, &l| {
            let d = terrain.depth(l);
            acc + (&water[l].theta_final - &water[l].theta_initial).component_mul(d)
        });

        let rain = volume(fluxes.rain);
        let overflow = over_layers(shape, water, &|w: &LayerWater| w.overflow.clone());
        let runoff = volume(&(&water[Layer::Z0].runoff + overflow));
        let percolation = volume(&water[Layer::Z2].percolation);
        let evapotranspiration = volume(&over_layers(shape, water, &|w: &LayerWater| w.evapotranspiration()));
        let net_lateral = volume(&over_layers(shape, water, &|w: &LayerWater| w.lateral_net()));
        let lateral_outflow = volume(&over_layers(shape, water, &|w: &LayerWater| w.lateral_outflow.clone()));
        let drained = volume(&over_layers(shape, water, &|w: &LayerWater| w.drainage.clone()));
        let storage_change = volume(&storage);
        let water_residual =
            rain - runoff - percolation - evapotranspiration + net_lateral - drained - storage_change;

        let mass_now = state.total_mass();
        let mass_before = Layer::ALL
            .iter()
            .fold(shape.zeros(), |acc, &l| acc + &state.layers[l].mass_initial);

        let applied = total(&over_layers(shape, mass, &|m: &LayerMass| m.applied.clone()));
        let runoff_loss = total(&over_layers(shape, mass, &|m: &LayerMass| m.runoff.clone()));
        let leached = total(&mass[Layer::Z2].leached);
        let volatilized = total(&over_layers(shape, mass, &|m: &LayerMass| m.volatilized.clone()));
        let lateral_flux = total(&over_layers(shape, mass, &|m: &LayerMass| m.lateral_net()));
        let degraded = total(&over_layers(shape, mass, &|m: &LayerMass| m.degraded.clone()));
        let catchment_mass = total(&mass_now);
        let mass_change = catchment_mass - total(&mass_before);
        let pesticide_residual =
            applied - runoff_loss - leached - volatilized + lateral_flux - degraded - mass_change;

        let c = &state.cumulative;
        let cumulative_applied = total(&c.applied);
        let cumulative_runoff_loss = total(&c.runoff);
        let cumulative_leached = total(&c.leached);
        let cumulative_volatilized = total(&c.volatilized);
        let cumulative_lateral_flux = total(&c.lateral);
        let cumulative_degraded = total(&c.degraded);
        let cumulative_residual = total(&state.initial_storage) + cumulative_applied
            - cumulative_runoff_loss
            - cumulative_leached
            - cumulative_volatilized
            + cumulative_lateral_flux
            - cumulative_degraded
            - catchment_mass;

        StepBalance {
            day,
            rain,
            runoff,
            percolation,
            evapotranspiration,
            net_lateral,
            drainage: drained,
            storage_change,
            water_residual,
            lateral_outflow,
            discharge: runoff + lateral_outflow,
            applied,
            runoff_loss,
            leached,
            volatilized,
            lateral_flux,
            degraded,
            mass_change,
            pesticide_residual,
            catchment_mass,
            catchment_delta: catchment_delta(state, shape),
            cumulative_applied,
            cumulative_runoff_loss,
            cumulative_leached,
            cumulative_volatilized,
            cumulative_lateral_flux,
            cumulative_degraded,
            cumulative_residual,
        }
    }

    /// Water residual relative to the sum of the magnitudes of its terms.
    pub fn water_relative(&self) -> f64 {
        relative(
            self.water_residual,
            &[
                self.rain,
                self.runoff,
                self.percolation,
                self.evapotranspiration,
                self.net_lateral,
                self.drainage,
                self.storage_change,
            ],
        )
    }

    pub fn pesticide_relative(&self) -> f64 {
        relative(
            self.pesticide_residual,
            &[
                self.applied,
                self.runoff_loss,
                self.leached,
                self.volatilized,
                self.lateral_flux,
                self.degraded,
                self.mass_change,
            ],
        )
    }
}

fn over_layers<T>(shape: GridShape, layers: &ByLayer<T>, f: &dyn Fn(&T) -> Field) -> Field {
    layers.iter().fold(shape.zeros(), |acc, (_, value)| acc + f(value))
}

fn relative(residual: f64, terms: &[f64]) -> f64 {
    let scale: f64 = terms.iter().map(|t| t.abs()).sum();
    if scale > 0.0 {
        residual.abs() / scale
    } else {
        residual.abs()
    }
}

// Signature of all mass in the profile; with no mass left, the plain mean
// of the surface signatures.
fn catchment_delta(state: &SimulationState, shape: GridShape) -> f64 {
    let mut mass = 0.0;
    let mut signed = 0.0;
    for &layer in &Layer::ALL {
        let l = &state.layers[layer];
        mass += l.mass.sum();
        signed += l.mass.dot(&l.delta);
    }
    if mass > MASS_EPS {
        signed / mass
    } else if shape.is_empty() {
        0.0
    } else {
        state.layers[Layer::Z0].delta.mean()
    }
}

/// Outlet time series of a run.
#[derive(Debug, Clone, Default)]
pub struct OutletSeries {
    pub day: Vec<usize>,
    pub rain: Vec<f64>,
    pub runoff: Vec<f64>,
    pub percolation: Vec<f64>,
    pub evapotranspiration: Vec<f64>,
    pub net_lateral: Vec<f64>,
    pub drainage: Vec<f64>,
    pub storage_change: Vec<f64>,
    pub water_residual: Vec<f64>,
    pub lateral_outflow: Vec<f64>,
    pub discharge: Vec<f64>,
    pub applied: Vec<f64>,
    pub runoff_loss: Vec<f64>,
    pub leached: Vec<f64>,
    pub volatilized: Vec<f64>,
    pub lateral_flux: Vec<f64>,
    pub degraded: Vec<f64>,
    pub mass_change: Vec<f64>,
    pub pesticide_residual: Vec<f64>,
    pub catchment_mass: Vec<f64>,
    pub catchment_delta: Vec<f64>,
    pub cumulative_applied: Vec<f64>,
    pub cumulative_runoff_loss: Vec<f64>,
    pub cumulative_leached: Vec<f64>,
    pub cumulative_volatilized: Vec<f64>,
    pub cumulative_lateral_flux: Vec<f64>,
    pub cumulative_degraded: Vec<f64>,
    pub cumulative_residual: Vec<f64>,
}

impl OutletSeries {
    /// Pre-allocate all vectors for `n` steps.
    pub fn with_capacity(n: usize) -> Self {
        Self {
            day: Vec::with_capacity(n),
            rain: Vec::with_capacity(n),
            runoff: Vec::with_capacity(n),
            percolation: Vec::with_capacity(n),
            evapotranspiration: Vec::with_capacity(n),
            net_lateral: Vec::with_capacity(n),
            drainage: Vec::with_capacity(n),
            storage_change: Vec::with_capacity(n),
            water_residual: Vec::with_capacity(n),
            lateral_outflow: Vec::with_capacity(n),
            discharge: Vec::with_capacity(n),
            applied: Vec::with_capacity(n),
            runoff_loss: Vec::with_capacity(n),
            leached: Vec::with_capacity(n),
            volatilized: Vec::with_capacity(n),
            lateral_flux: Vec::with_capacity(n),
            degraded: Vec::with_capacity(n),
            mass_change: Vec::with_capacity(n),
            pesticide_residual: Vec::with_capacity(n),
            catchment_mass: Vec::with_capacity(n),
            catchment_delta: Vec::with_capacity(n),
            cumulative_applied: Vec::with_capacity(n),
            cumulative_runoff_loss: Vec::with_capacity(n),
            cumulative_leached: Vec::with_capacity(n),
            cumulative_volatilized: Vec::with_capacity(n),
            cumulative_lateral_flux: Vec::with_capacity(n),
            cumulative_degraded: Vec::with_capacity(n),
            cumulative_residual: Vec::with_capacity(n),
        }
    }

    pub fn push(&mut self, b: &StepBalance) {
        self.day.push(b.day);
        self.rain.push(b.rain);
        self.runoff.push(b.runoff);
        self.percolation.push(b.percolation);
        self.evapotranspiration.push(b.evapotranspiration);
        self.net_lateral.push(b.net_lateral);
        self.drainage.push(b.drainage);
        self.storage_change.push(b.storage_change);
        self.water_residual.push(b.water_residual);
        self.lateral_outflow.push(b.lateral_outflow);
        self.discharge.push(b.discharge);
        self.applied.push(b.applied);
        self.runoff_loss.push(b.runoff_loss);
        self.leached.push(b.leached);
        self.volatilized.push(b.volatilized);
        self.lateral_flux.push(b.lateral_flux);
        self.degraded.push(b.degraded);
        self.mass_change.push(b.mass_change);
        self.pesticide_residual.push(b.pesticide_residual);
        self.catchment_mass.push(b.catchment_mass);
        self.catchment_delta.push(b.catchment_delta);
        self.cumulative_applied.push(b.cumulative_applied);
        self.cumulative_runoff_loss.push(b.cumulative_runoff_loss);
        self.cumulative_leached.push(b.cumulative_leached);
        self.cumulative_volatilized.push(b.cumulative_volatilized);
        self.cumulative_lateral_flux.push(b.cumulative_lateral_flux);
        self.cumulative_degraded.push(b.cumulative_degraded);
        self.cumulative_residual.push(b.cumulative_residual);
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.day.len()
    }

    pub fn is_empty(&self) -> bool {
        self.day.is_empty()
    }
}
