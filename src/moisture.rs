/**
Layer water balance over the whole grid: curve-number runoff and saturation
excess at the surface, percolation, artificial drainage, lateral flow along
the drainage graph and evapotranspiration.
*/
use crate::config::HydroConfig;
use crate::crop_table::LayerSoil;
use crate::diagnostics::{ClampEvent, ClampKind};
use crate::phenology::CropDay;
use crate::raster::{Field, GridShape};
use crate::root_uptake::{transpiration_share, StressParams};
use crate::runoff::{adjust_curve_number, calculate_runoff, retention_parameter, UpperSoil};
use crate::state::Layer;
use crate::terrain::Terrain;

// Slack on the final [0, θ_sat] bounds check
const THETA_EPS: f64 = 1e-12;

// Dimensionless drainage coefficient, capped at 1
pub fn drainage_tau(gamma: f64, scale: f64, k_sat: f64) -> f64 {
    let k = scale * k_sat;
    if k <= 0.0 {
        return 0.0;
    }
    (0.0866 * (gamma * k.log10()).exp()).min(1.0)
}

// Percolation [mm] out of a layer `depth` mm thick at moisture `theta`
// (exponential drainage law, Raes 2002). Zero at or below field capacity
pub fn percolation(tau: f64, depth: f64, soil: &LayerSoil, theta: f64) -> f64 {
    if theta <= soil.theta_fc {
        return 0.0;
    }
    tau * depth * (soil.theta_sat - soil.theta_fc) * ((theta - soil.theta_fc).exp() - 1.0)
        / ((soil.theta_sat - soil.theta_fc).exp() - 1.0)
}

// Water fluxes of one layer for one step. Depths in mm, moisture as a
// volumetric fraction
#[derive(Debug, Clone)]
pub struct LayerWater {
    pub theta_initial: Field,
    pub theta_after_percolation: Field, // Moisture after the vertical fluxes, before lateral flow
    pub theta_final: Field,
    pub infiltration: Field, // Rain (surface) or water from the layer above that entered the layer
    pub percolation: Field,
    // Water above saturation passed straight to the layer below (surface only)
    pub saturation_excess: Field,
    // Curve-number runoff plus whatever the second layer could not accept
    // (surface only)
    pub runoff: Field,
    pub overflow: Field, // Water above saturation returned to the surface
    pub drainage: Field, // Artificial drainage outflow
    pub lateral_outflow: Field,
    pub lateral_inflow: Field,
    pub transpiration: Field,
    pub evaporation: Field,
}

impl LayerWater {
    fn new(theta_initial: &Field) -> Self {
        let shape = GridShape::of(theta_initial);
        LayerWater {
            theta_initial: theta_initial.clone(),
            theta_after_percolation: theta_initial.clone(),
            theta_final: theta_initial.clone(),
            infiltration: shape.zeros(),
            percolation: shape.zeros(),
            saturation_excess: shape.zeros(),
            runoff: shape.zeros(),
            overflow: shape.zeros(),
            drainage: shape.zeros(),
            lateral_outflow: shape.zeros(),
            lateral_inflow: shape.zeros(),
            transpiration: shape.zeros(),
            evaporation: shape.zeros(),
        }
    }

    pub fn lateral_net(&self) -> Field {
        &self.lateral_inflow - &self.lateral_outflow
    }

    pub fn evapotranspiration(&self) -> Field {
        &self.transpiration + &self.evaporation
    }

    // Water handed to the layer below
    pub fn to_below(&self) -> Field {
        &self.percolation + &self.saturation_excess
    }

    // Water leaving through the surface: runoff and overflow
    pub fn surface_loss(&self) -> Field {
        &self.runoff + &self.overflow
    }
}

// Shared inputs of every layer update within one step
pub struct WaterStep<'a> {
    pub day: usize,
    pub terrain: &'a Terrain,
    pub crops: &'a [CropDay],
    pub hydro: &'a HydroConfig,
}

impl WaterStep<'_> {
    fn tau(&self, layer: Layer, soil: &LayerSoil) -> f64 {
        let i = layer.index();
        drainage_tau(
            self.hydro.drainage_exponent[i],
            self.hydro.conductivity_scale[i],
            soil.k_sat,
        )
    }

    // Percolation from a layer at `theta`, held back by the negative-moisture policy
    fn percolate(
        &self,
        cell: usize,
        layer: Layer,
        depth: f64,
        theta: f64,
        events: &mut Vec<ClampEvent>,
    ) -> f64 {
        let soil = self.crops[cell].soil(layer);
        let potential = percolation(self.tau(layer, soil), depth, soil, theta);
        let (perc, fired) = self.hydro.negative_moisture_policy.apply(
            potential,
            theta * depth,
            self.hydro.negative_moisture_tolerance,
        );
        if fired {
            events.push(ClampEvent {
                day: self.day,
                cell,
                layer,
                kind: ClampKind::NegativeMoisture,
                value: theta - potential / depth,
            });
        }
        perc
    }

    // Mixing layer: runoff, infiltration, saturation excess and percolation,
    // then lateral flow and evapotranspiration
    pub fn surface_layer(
        &self,
        theta0: &Field,
        theta1: &Field,
        precipitation: &Field,
    ) -> (LayerWater, Vec<ClampEvent>) {
        let d0 = self.terrain.depth(Layer::Z0);
        let d1 = self.terrain.depth(Layer::Z1);
        let slope = self.terrain.slope();
        let mut water = LayerWater::new(theta0);
        let mut events = Vec::new();

        for cell in 0..theta0.len() {
            let crop = &self.crops[cell];
            let soil = crop.soil(Layer::Z0);
            let below = crop.soil(Layer::Z1);
            let (z0, z1) = (d0[cell], d1[cell]);
            let (t0, t1) = (theta0[cell], theta1[cell]);
            let rain = precipitation[cell];

            let upper = UpperSoil {
                depth: z0 + z1,
                theta: (z0 * t0 + z1 * t1) / (z0 + z1),
                theta_sat: soil.theta_sat,
                theta_fc: soil.theta_fc,
                theta_wp: soil.theta_wp,
            };
            let s = retention_parameter(adjust_curve_number(crop.cn2, slope[cell]), &upper);
            let mut runoff = calculate_runoff(rain, s);

            // Whatever the second layer cannot take from the first stays on the surface
            let trial = t0 + (rain - runoff) / z0;
            let trial_excess = (trial - soil.theta_sat).max(0.0) * z0;
            let trial_perc = percolation(self.tau(Layer::Z0, soil), z0, soil, trial.min(soil.theta_sat));
            let refused = ((t1 - below.theta_sat) * z1 + trial_excess + trial_perc).max(0.0);
            runoff += refused.min(rain - runoff);

            let infiltration = rain - runoff;
            let mut theta = t0 + infiltration / z0;
            let satex = (theta - soil.theta_sat).max(0.0) * z0;
            theta = theta.min(soil.theta_sat);

            let perc = self.percolate(cell, Layer::Z0, z0, theta, &mut events);
            theta -= perc / z0;

            water.runoff[cell] = runoff;
            water.infiltration[cell] = infiltration;
            water.saturation_excess[cell] = satex;
            water.percolation[cell] = perc;
            water.theta_after_percolation[cell] = theta;
        }

        self.lateral_and_et(Layer::Z0, &mut water, &mut events);
        (water, events)
    }

    // Layers below the surface: inflow from above, artificial drainage,
    // percolation, then lateral flow and evapotranspiration
    pub fn subsurface_layer(
        &self,
        layer: Layer,
        theta: &Field,
        inflow: &Field,
    ) -> (LayerWater, Vec<ClampEvent>) {
        let depth = self.terrain.depth(layer);
        let drained = self.hydro.artificial_drainage[layer.index()];
        let permeable = layer != Layer::Z2 || self.hydro.bottom_boundary.is_permeable();
        let mut water = LayerWater::new(theta);
        let mut events = Vec::new();

        for cell in 0..theta.len() {
            let soil = self.crops[cell].soil(layer);
            let d = depth[cell];

            let mut t = theta[cell] + inflow[cell] / d;
            let overflow = (t - soil.theta_sat).max(0.0) * d;
            t = t.min(soil.theta_sat);

            let drainage = if drained {
                (self.hydro.artificial_drainage_coefficient * d * (t - soil.theta_fc)).max(0.0)
            } else {
                0.0
            };
            t -= drainage / d;

            let perc = if permeable {
                self.percolate(cell, layer, d, t, &mut events)
            } else {
                0.0
            };
            t -= perc / d;

            water.infiltration[cell] = inflow[cell];
            water.overflow[cell] = overflow;
            water.drainage[cell] = drainage;
            water.percolation[cell] = perc;
            water.theta_after_percolation[cell] = t;
        }

        self.lateral_and_et(layer, &mut water, &mut events);
        (water, events)
    }

    // Lateral redistribution along the drainage graph, then ET extraction.
    // Inflow is the wetness-weighted share of the accumulated upstream
    // outflow, normalised by accumulated wetness; this normalisation is kept
    // as published and has not been checked against the DREAM formulation.
    fn lateral_and_et(&self, layer: Layer, water: &mut LayerWater, events: &mut Vec<ClampEvent>) {
        let depth = self.terrain.depth(layer);
        let shape = GridShape::of(depth);
        let li = layer.index();
        let c = self.hydro.lateral_coefficient[li];
        let wetness = self.terrain.wetness();
        let acc_wetness = self.terrain.accumulated_wetness();
        let theta = &water.theta_after_percolation;

        let outflow = shape.field_from_fn(|cell| {
            if !self.terrain.redistributes(cell) {
                return 0.0;
            }
            let soil = self.crops[cell].soil(layer);
            (c * depth[cell] * (theta[cell] - soil.theta_fc)).max(0.0)
        });
        let upstream = self.terrain.drainage().accumulate(&outflow);
        let inflow = shape.field_from_fn(|cell| {
            if self.terrain.redistributes(cell) {
                wetness[cell] * upstream[cell] / acc_wetness[cell]
            } else {
                0.0
            }
        });

        for cell in 0..shape.len() {
            let crop = &self.crops[cell];
            let soil = crop.soil(layer);
            let d = depth[cell];

            let mut t = theta[cell] + (inflow[cell] - outflow[cell]) / d;
            water.overflow[cell] += (t - soil.theta_sat).max(0.0) * d;
            t = t.min(soil.theta_sat);

            if self.hydro.evapotranspiration {
                let stress = StressParams::new(soil, crop.pet.depletion_fraction);
                let demand = transpiration_share(crop.status.root_depth, crop.roots[li], crop.pet.transpiration);
                let transpiration = (stress.ks(t) * demand)
                    .min((t - stress.theta_wp()) * d)
                    .max(0.0);
                t -= transpiration / d;

                let evaporation = if layer == Layer::Z2 {
                    0.0
                } else {
                    let ev = (stress.kr(t) * crop.pet.evaporation)
                        .min((t - stress.air_dry()) * d)
                        .max(0.0);
                    if layer == Layer::Z1 { 0.5 * ev } else { ev }
                };
                t -= evaporation / d;

                water.transpiration[cell] = transpiration;
                water.evaporation[cell] = evaporation;
            }

            if !t.is_finite() || t < -THETA_EPS || t > soil.theta_sat + THETA_EPS {
                events.push(ClampEvent {
                    day: self.day,
                    cell,
                    layer,
                    kind: ClampKind::MoistureBounds,
                    value: t,
                });
            }
            water.theta_final[cell] = t.clamp(0.0, soil.theta_sat);
        }

        water.lateral_outflow = outflow;
        water.lateral_inflow = inflow;
    }
}
