use std::ops::{Index, IndexMut};

use crate::config::ModelConfig;
use crate::raster::{Field, GridShape};
use crate::terrain::Terrain;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Layer {
    Z0,
    Z1,
    Z2,
}

impl Layer {
    pub const ALL: [Layer; 3] = [Layer::Z0, Layer::Z1, Layer::Z2];

    pub fn index(self) -> usize {
        match self {
            Layer::Z0 => 0,
            Layer::Z1 => 1,
            Layer::Z2 => 2,
        }
    }
}

// One value per soil layer
#[derive(Debug, Clone, PartialEq)]
pub struct ByLayer<T>(pub [T; 3]);

impl<T> ByLayer<T> {
    pub fn from_fn(mut f: impl FnMut(Layer) -> T) -> Self {
        ByLayer([f(Layer::Z0), f(Layer::Z1), f(Layer::Z2)])
    }

    pub fn iter(&self) -> impl Iterator<Item = (Layer, &T)> {
        Layer::ALL.into_iter().zip(self.0.iter())
    }
}

impl<T> Index<Layer> for ByLayer<T> {
    type Output = T;

    fn index(&self, layer: Layer) -> &T {
        &self.0[layer.index()]
    }
}

impl<T> IndexMut<Layer> for ByLayer<T> {
    fn index_mut(&mut self, layer: Layer) -> &mut T {
        &mut self.0[layer.index()]
    }
}

// State of one soil layer across the grid
#[derive(Debug, Clone)]
pub struct LayerState {
    pub theta: Field, // Volumetric moisture [-]
    pub temperature: Field, // Temperature [°C]
    pub mass: Field, // Pesticide mass [mg]
    pub delta: Field, // Isotope signature [‰]
    pub theta_initial: Field, // Moisture at the start of the current step
    pub mass_initial: Field, // Mass at the start of the current step
}

impl LayerState {
    pub fn water_depth(&self, depth: &Field) -> Field {
        self.theta.component_mul(depth)
    }
}

// Run-to-date totals per cell, never reset
#[derive(Debug, Clone)]
pub struct CumulativeCounters {
    pub applied: Field,
    pub runoff: Field,
    pub leached: Field,
    pub volatilized: Field,
    pub lateral: Field,
    pub degraded: Field,
}

impl CumulativeCounters {
    pub fn zeros(shape: GridShape) -> Self {
        CumulativeCounters {
            applied: shape.zeros(),
            runoff: shape.zeros(),
            leached: shape.zeros(),
            volatilized: shape.zeros(),
            lateral: shape.zeros(),
            degraded: shape.zeros(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimulationState {
    pub day: usize, // Simulation day (0-based) of the next step
    pub layers: ByLayer<LayerState>,
    pub temp_surface: Field, // Surface temperature [°C] carried between steps
    pub cumulative: CumulativeCounters,
    pub initial_storage: Field, // Pesticide mass [mg] held by the profile before the first step
}

impl SimulationState {
    // Seed moisture, temperature and background residues
    pub fn initialize(config: &ModelConfig, terrain: &Terrain) -> Self {
        let shape = terrain.shape();
        let soil = &config.soil;
        let pesticide = &config.pesticide;
        let area = terrain.cell_area();

        let layers = ByLayer::from_fn(|layer| {
            let depth = terrain.depth(layer);
            // mg/kg soil × kg/L × L
            let conc = pesticide.background_concentration[layer.index()];
            let mass = depth.map(|d| conc * soil.bulk_density * d * area);
            let theta = shape.constant(soil.initial_theta[layer.index()]);
            LayerState {
                theta_initial: theta.clone(),
                theta,
                temperature: shape.constant(soil.initial_temperature),
                mass_initial: mass.clone(),
                mass,
                delta: shape.constant(pesticide.background_delta),
            }
        });

        let initial_storage = Layer::ALL
            .iter()
            .fold(shape.zeros(), |acc, &l| acc + &layers[l].mass);

        SimulationState {
            day: 0,
            layers,
            temp_surface: shape.constant(soil.initial_temperature),
            cumulative: CumulativeCounters::zeros(shape),
            initial_storage,
        }
    }

    // Total pesticide mass per cell [mg]
    pub fn total_mass(&self) -> Field {
        let shape = GridShape::of(&self.temp_surface);
        Layer::ALL
            .iter()
            .fold(shape.zeros(), |acc, &l| acc + &self.layers[l].mass)
    }
}
