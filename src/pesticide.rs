/**
Pesticide mass and isotope balance of one layer.

Losses take at most the mass present and do not fractionate. Additions are
mixed in by two-source mixing. Degradation runs separately on the light and
heavy pools, which enriches the remaining mass in the heavy isotope.
*/
use std::f64::consts::LN_2;

use crate::config::PesticideConfig;
use crate::diagnostics::{ClampEvent, ClampKind};
use crate::isotope::{mix, pools_delta, split_pools, MASS_EPS};
use crate::moisture::LayerWater;
use crate::phenology::CropDay;
use crate::raster::{Field, GridShape};
use crate::schedule::Application;
use crate::state::{Layer, LayerState};
use crate::terrain::Terrain;

const KELVIN: f64 = 273.15;

// Henry constant corrected to air temperature `temp` [°C] (van 't Hoff)
pub fn henry_at(config: &PesticideConfig, temp: f64) -> f64 {
    let exponent = -config.henry_enthalpy / config.gas_constant
        * (1.0 / (temp + KELVIN) - 1.0 / (config.temp_ref + KELVIN));
    config.henry * exponent.exp()
}

// Mass [mg] volatilised from the surface layer in one day. Gas-phase
// concentration from Henry partitioning, diffusion through half the layer
// (Millington-Quirk tortuosity) and an air boundary layer
#[allow(clippy::too_many_arguments)]
pub fn volatilization_loss(
    config: &PesticideConfig,
    mass: f64,
    theta: f64,
    theta_sat: f64,
    depth: f64,
    area: f64,
    temp_air: f64,
    kd_rho: f64,
) -> f64 {
    let theta_air = (theta_sat - theta).max(0.0);
    let d_eff = config.air_diffusion * theta_air.powf(10.0 / 3.0) / (theta_sat * theta_sat);
    if mass <= 0.0 || d_eff <= 0.0 {
        return 0.0;
    }
    let kh = henry_at(config, temp_air);
    // mg/L of pore water; depth [mm] × area [m²] = L
    let conc_water = mass / ((theta + kd_rho + kh * theta_air) * depth * area);
    let conc_gas = kh * conc_water * 1000.0; // mg/m³
    let resistance = (0.5 * depth / 1000.0) / d_eff + config.boundary_layer / config.air_diffusion;
    (conc_gas / resistance * area).min(mass)
}

// Mass [mg] carried off by `runoff` mm of surface runoff, with the layer
// mixing at saturation
pub fn runoff_loss(mass: f64, theta_sat: f64, depth: f64, area: f64, runoff: f64, kd_rho: f64) -> f64 {
    if mass <= 0.0 || runoff <= 0.0 {
        return 0.0;
    }
    let conc_water = mass / ((theta_sat + kd_rho) * depth * area);
    (conc_water * runoff * area).min(mass)
}

// Mass [mg] leached by `percolation` mm (mixing-cell model, McGrath 2008)
pub fn leaching_loss(mass: f64, theta: f64, depth: f64, percolation: f64, kd_rho: f64) -> f64 {
    if mass <= 0.0 || percolation <= 0.0 {
        return 0.0;
    }
    let pore_volumes = percolation / ((theta + kd_rho) * depth);
    mass * (1.0 - (-pore_volumes).exp())
}

// First-order degradation rate [1/day] corrected for temperature
// (Arrhenius) and moisture relative to field capacity
pub fn degradation_rate(config: &PesticideConfig, temp: f64, theta: f64, theta_fc: f64) -> f64 {
    let f_temp = (config.activation_energy / config.gas_constant
        * (1.0 / (config.temp_ref + KELVIN) - 1.0 / (temp + KELVIN)))
        .exp();
    let f_theta = (theta.max(0.0) / theta_fc).powf(config.beta_moisture).min(1.0);
    LN_2 / config.dt50_ref * f_temp * f_theta
}

// Degrade the light pool at `k` and the heavy pool at `alpha * k` over one
// day. Returns the remaining mass and its signature
pub fn degrade(config: &PesticideConfig, mass: f64, delta: f64, k: f64) -> (f64, f64) {
    if mass <= MASS_EPS {
        return (mass, delta);
    }
    let (light, heavy) = split_pools(mass, delta, config.r_standard);
    let light = light * (-k).exp();
    let heavy = heavy * (-config.alpha_iso * k).exp();
    (light + heavy, pools_delta(light, heavy, config.r_standard, delta))
}

// Pesticide fluxes of one layer for one step [mg]
#[derive(Debug, Clone)]
pub struct LayerMass {
    pub applied: Field,
    pub volatilized: Field,
    pub runoff: Field,
    // Mass leached to the layer below (or out of the profile from the
    // deepest layer)
    pub leached: Field,
    pub leached_delta: Field, // Signature of the leached mass
    pub lateral_outflow: Field,
    pub lateral_inflow: Field,
    pub degraded: Field,
}

impl LayerMass {
    fn zeros(shape: GridShape) -> Self {
        LayerMass {
            applied: shape.zeros(),
            volatilized: shape.zeros(),
            runoff: shape.zeros(),
            leached: shape.zeros(),
            leached_delta: shape.zeros(),
            lateral_outflow: shape.zeros(),
            lateral_inflow: shape.zeros(),
            degraded: shape.zeros(),
        }
    }

    pub fn lateral_net(&self) -> Field {
        &self.lateral_inflow - &self.lateral_outflow
    }
}

// Shared inputs of every layer update within one step
pub struct PesticideStep<'a> {
    pub day: usize,
    pub terrain: &'a Terrain,
    pub crops: &'a [CropDay],
    pub config: &'a PesticideConfig,
    pub kd_rho: f64, // Sorption term K_d × bulk density [-]
    pub air_temperature: &'a Field,
    pub volatilize: bool, // Whether volatilisation runs this step
}

impl PesticideStep<'_> {
    // Mixing layer: application, volatilisation, runoff, leaching, lateral
    // exchange and degradation, in that order
    pub fn surface_layer(
        &self,
        state: &mut LayerState,
        water: &LayerWater,
        application: Option<&Application>,
    ) -> (LayerMass, Vec<ClampEvent>) {
        let layer = Layer::Z0;
        let depth = self.terrain.depth(layer);
        let area = self.terrain.cell_area();
        let mut flux = LayerMass::zeros(GridShape::of(depth));

        for cell in 0..depth.len() {
            let soil = self.crops[cell].soil(layer);
            let mut mass = state.mass[cell];
            let mut delta = state.delta[cell];

            if let Some(app) = application {
                let added = app.mass[cell];
                if added > 0.0 {
                    delta = mix(mass, delta, added, app.delta[cell]);
                    mass += added;
                    flux.applied[cell] = added;
                }
            }

            if self.volatilize {
                let loss = volatilization_loss(
                    self.config,
                    mass,
                    water.theta_initial[cell],
                    soil.theta_sat,
                    depth[cell],
                    area,
                    self.air_temperature[cell],
                    self.kd_rho,
                );
                mass -= loss;
                flux.volatilized[cell] = loss;
            }

            let loss = runoff_loss(mass, soil.theta_sat, depth[cell], area, water.runoff[cell], self.kd_rho);
            mass -= loss;
            flux.runoff[cell] = loss;

            // Saturation excess leaves with the percolating water
            let drained = water.percolation[cell] + water.saturation_excess[cell];
            let loss = leaching_loss(mass, water.theta_after_percolation[cell], depth[cell], drained, self.kd_rho);
            mass -= loss;
            flux.leached[cell] = loss;
            flux.leached_delta[cell] = delta;

            state.mass[cell] = mass;
            state.delta[cell] = delta;
        }

        let events = self.lateral_and_degrade(layer, state, water, &mut flux);
        (flux, events)
    }

    // Layers below the surface: leachate from above, leaching, lateral
    // exchange and degradation
    pub fn subsurface_layer(
        &self,
        layer: Layer,
        state: &mut LayerState,
        water: &LayerWater,
        above: &LayerMass,
    ) -> (LayerMass, Vec<ClampEvent>) {
        let depth = self.terrain.depth(layer);
        let mut flux = LayerMass::zeros(GridShape::of(depth));

        for cell in 0..depth.len() {
            let mut mass = state.mass[cell];
            let mut delta = state.delta[cell];

            let added = above.leached[cell];
            if added > 0.0 {
                delta = mix(mass, delta, added, above.leached_delta[cell]);
                mass += added;
            }

            let loss = leaching_loss(
                mass,
                water.theta_after_percolation[cell],
                depth[cell],
                water.percolation[cell],
                self.kd_rho,
            );
            mass -= loss;
            flux.leached[cell] = loss;
            flux.leached_delta[cell] = delta;

            state.mass[cell] = mass;
            state.delta[cell] = delta;
        }

        let events = self.lateral_and_degrade(layer, state, water, &mut flux);
        (flux, events)
    }

    // Lateral mass exchange follows the water: each cell exports the share of
    // its mass carried by its lateral outflow, and receives the wetness-weighted
    // share of accumulated upstream exports with their mass-weighted signature.
    fn lateral_and_degrade(
        &self,
        layer: Layer,
        state: &mut LayerState,
        water: &LayerWater,
        flux: &mut LayerMass,
    ) -> Vec<ClampEvent> {
        let depth = self.terrain.depth(layer);
        let shape = GridShape::of(depth);
        let drainage = self.terrain.drainage();
        let wetness = self.terrain.wetness();
        let acc_wetness = self.terrain.accumulated_wetness();
        let mut events = Vec::new();

        let outflow = shape.field_from_fn(|cell| {
            let water_out = water.lateral_outflow[cell];
            let mass = state.mass[cell];
            if water_out <= 0.0 || mass <= 0.0 {
                return 0.0;
            }
            let held = (water.theta_after_percolation[cell] + self.kd_rho) * depth[cell];
            (mass * water_out / held).min(mass)
        });
        let signed = outflow.component_mul(&state.delta);
        let upstream = drainage.accumulate(&outflow);
        let upstream_signed = drainage.accumulate(&signed);

        for cell in 0..shape.len() {
            let inflow = if self.terrain.redistributes(cell) {
                wetness[cell] * upstream[cell] / acc_wetness[cell]
            } else {
                0.0
            };
            let inflow_delta = if upstream[cell] > MASS_EPS {
                upstream_signed[cell] / upstream[cell]
            } else {
                state.delta[cell]
            };

            let mut mass = state.mass[cell] - outflow[cell];
            let mut delta = mix(mass, state.delta[cell], inflow, inflow_delta);
            mass += inflow;
            if mass < 0.0 {
                events.push(ClampEvent {
                    day: self.day,
                    cell,
                    layer,
                    kind: ClampKind::NegativeMass,
                    value: mass,
                });
                mass = 0.0;
                delta = state.delta[cell];
            }

            let soil = self.crops[cell].soil(layer);
            let k = degradation_rate(
                self.config,
                state.temperature[cell],
                water.theta_final[cell],
                soil.theta_fc,
            );
            let (remaining, delta) = degrade(self.config, mass, delta, k);

            flux.lateral_outflow[cell] = outflow[cell];
            flux.lateral_inflow[cell] = inflow;
            flux.degraded[cell] = mass - remaining;
            state.mass[cell] = remaining;
            state.delta[cell] = delta;
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn config() -> PesticideConfig {
        PesticideConfig::default()
    }

    #[test]
    fn henry_constant_rises_with_temperature() {
        let c = config();
        assert_relative_eq!(henry_at(&c, c.temp_ref), c.henry);
        assert!(henry_at(&c, 30.0) > c.henry);
    }

    #[test]
    fn volatilization_needs_air_filled_pores() {
        let c = config();
        assert_eq!(volatilization_loss(&c, 100.0, 0.55, 0.55, 10.0, 4.0, 20.0, 2.94), 0.0);
        let loss = volatilization_loss(&c, 100.0, 0.2, 0.55, 10.0, 4.0, 20.0, 2.94);
        assert!(loss > 0.0 && loss < 100.0);
    }

    #[test]
    fn runoff_and_leaching_never_exceed_mass() {
        assert_eq!(runoff_loss(5.0, 0.5, 10.0, 4.0, 0.0, 2.94), 0.0);
        assert!(runoff_loss(5.0, 0.5, 10.0, 4.0, 1.0e6, 2.94) <= 5.0);
        let leached = leaching_loss(5.0, 0.4, 10.0, 1.0e6, 2.94);
        assert!(leached <= 5.0 && leached > 4.99);
        assert_relative_eq!(
            leaching_loss(5.0, 0.4, 10.0, 3.34, 2.94),
            5.0 * (1.0 - (-0.1f64).exp()),
            epsilon = 1e-12
        );
    }

    #[test]
    fn reference_conditions_give_the_reference_half_life() {
        let c = config();
        let k = degradation_rate(&c, c.temp_ref, 0.35, 0.35);
        assert_relative_eq!(k, LN_2 / c.dt50_ref, epsilon = 1e-12);
        assert!(degradation_rate(&c, 5.0, 0.35, 0.35) < k);
        assert!(degradation_rate(&c, c.temp_ref, 0.1, 0.35) < k);
    }

    #[test]
    fn degradation_enriches_the_remaining_mass() {
        let c = config();
        let k = LN_2 / c.dt50_ref;
        let (mass, delta) = degrade(&c, 100.0, -32.3, k);
        assert!(mass < 100.0 && mass > 90.0);
        assert!(delta > -32.3);
        let (empty, kept) = degrade(&c, 0.0, -32.3, k);
        assert_eq!((empty, kept), (0.0, -32.3));
    }
}
