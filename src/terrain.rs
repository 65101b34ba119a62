use log::warn;

use crate::config::{GridConfig, SoilConfig};
use crate::drainage::DrainageGraph;
use crate::error::{ModelError, ModelResult};
use crate::raster::{Field, GridShape};
use crate::state::{ByLayer, Layer};

// Smallest gradient used for slope, so flat cells keep a finite wetness index
pub const MIN_GRADIENT: f64 = 0.001;

// Accumulated wetness below which lateral redistribution is skipped
pub const WETNESS_EPS: f64 = 1e-12;

const SHARE_EPS: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct Terrain {
    elevation: Field,
    drainage: DrainageGraph,
    cell_area: f64,
    slope: Field,
    upstream_area: Field,
    wetness: Field,
    accumulated_wetness: Field,
    depths: ByLayer<Field>,
    centre_depths: ByLayer<Field>,
    total_depth: Field,
}

impl Terrain {
    pub fn new(
        elevation: Field,
        drainage: DrainageGraph,
        grid: &GridConfig,
        soil: &SoilConfig,
    ) -> ModelResult<Self> {
        let shape = GridShape::of(&elevation);
        if drainage.shape() != shape {
            return Err(ModelError::ShapeMismatch {
                name: "drainage".to_string(),
                expected: (shape.rows, shape.cols),
                found: (drainage.shape().rows, drainage.shape().cols),
            });
        }
        if elevation.iter().any(|e| !e.is_finite()) {
            return Err(ModelError::invalid(
                "elevation",
                f64::NAN,
                "must be finite everywhere",
            ));
        }

        let cell_area = grid.cell_area();
        let slope = gradient(&elevation, grid.cell_size).map(|g| g.max(MIN_GRADIENT).atan().sin());
        let upstream_area = drainage.accumulate(&shape.constant(cell_area));
        let wetness = upstream_area.zip_map(&slope, |a, s| (a / s.tan()).ln());
        let accumulated_wetness = drainage.accumulate(&wetness);

        // Profile thickens upslope by the height above the lowest cell
        let datum = elevation.min();
        let z0 = shape.constant(soil.z0_depth);
        let z1 = shape.constant(soil.z1_depth);
        let z2 = elevation.map(|e| (e - datum) * 1000.0 + soil.profile_depth - soil.z0_depth - soil.z1_depth);
        let total_depth = &z0 + &z1 + &z2;

        let c0 = z0.map(|d| 0.5 * d);
        let c1 = z1.map(|d| soil.z0_depth + 0.5 * d);
        let c2 = z2.map(|d| soil.z0_depth + soil.z1_depth + 0.5 * d);

        let terrain = Terrain {
            elevation,
            drainage,
            cell_area,
            slope,
            upstream_area,
            wetness,
            accumulated_wetness,
            depths: ByLayer([z0, z1, z2]),
            centre_depths: ByLayer([c0, c1, c2]),
            total_depth,
        };
        let amplifying = terrain.amplifying_cells();
        if let Some(&first) = amplifying.first() {
            warn!(
                "{} cell(s) take a wetness share outside [0, 1] of upstream lateral flow (first: cell {}); \
                 the wetness index is negative on small, steep cells",
                amplifying.len(),
                first
            );
        }
        Ok(terrain)
    }

    pub fn from_elevation(elevation: Field, grid: &GridConfig, soil: &SoilConfig) -> ModelResult<Self> {
        let drainage = DrainageGraph::from_elevation(&elevation, grid.cell_size)?;
        Self::new(elevation, drainage, grid, soil)
    }

    pub fn shape(&self) -> GridShape {
        GridShape::of(&self.elevation)
    }

    pub fn drainage(&self) -> &DrainageGraph {
        &self.drainage
    }

    pub fn cell_area(&self) -> f64 {
        self.cell_area
    }

    // Sine of the slope angle
    pub fn slope(&self) -> &Field {
        &self.slope
    }

    // Upstream contributing area [m²], the cell included
    pub fn upstream_area(&self) -> &Field {
        &self.upstream_area
    }

    // Topographic wetness index ln(a / tan β)
    pub fn wetness(&self) -> &Field {
        &self.wetness
    }

    pub fn accumulated_wetness(&self) -> &Field {
        &self.accumulated_wetness
    }

    pub fn redistributes(&self, cell: usize) -> bool {
        self.accumulated_wetness[cell].abs() > WETNESS_EPS
    }

    // Cells whose wetness share of accumulated upstream outflow lies outside
    // [0, 1], so lateral inflow is amplified or reversed
    pub(crate) fn amplifying_cells(&self) -> Vec<usize> {
        (0..self.wetness.len())
            .filter(|&cell| self.redistributes(cell))
            .filter(|&cell| {
                let share = self.wetness[cell] / self.accumulated_wetness[cell];
                !(-SHARE_EPS..=1.0 + SHARE_EPS).contains(&share)
            })
            .collect()
    }

    // Layer thickness [mm]
    pub fn depth(&self, layer: Layer) -> &Field {
        &self.depths[layer]
    }

    // Depth of the layer's centre below the surface [mm]
    pub fn centre_depth(&self, layer: Layer) -> &Field {
        &self.centre_depths[layer]
    }

    // Whole-profile thickness [mm]
    pub fn total_depth(&self) -> &Field {
        &self.total_depth
    }
}

// Gradient magnitude by central differences, one-sided at the edges
fn gradient(elevation: &Field, cell_size: f64) -> Field {
    let (rows, cols) = elevation.shape();
    let mut out = Field::zeros(rows, cols);
    let diff = |lo: f64, hi: f64, steps: usize| {
        if steps == 0 {
            0.0
        } else {
            (hi - lo) / (steps as f64 * cell_size)
        }
    };
    for r in 0..rows {
        for c in 0..cols {
            let (c_lo, c_hi) = (c.saturating_sub(1), (c + 1).min(cols - 1));
            let (r_lo, r_hi) = (r.saturating_sub(1), (r + 1).min(rows - 1));
            let dx = diff(elevation[(r, c_lo)], elevation[(r, c_hi)], c_hi - c_lo);
            let dy = diff(elevation[(r_lo, c)], elevation[(r_hi, c)], r_hi - r_lo);
            out[(r, c)] = (dx * dx + dy * dy).sqrt();
        }
    }
    out
}
