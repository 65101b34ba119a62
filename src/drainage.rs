use std::collections::VecDeque;

use nalgebra::DMatrix;

use crate::error::{ModelError, ModelResult};
use crate::raster::{CodeField, Field, GridShape};

// PCRaster local drain direction code for a pit
pub const LDD_PIT: u32 = 5;

// Keypad layout with row 0 at the top of the grid:
// 7 8 9
// 4 5 6
// 1 2 3
fn ldd_offset(code: u32) -> Option<(isize, isize)> {
    match code {
        1 => Some((1, -1)),
        2 => Some((1, 0)),
        3 => Some((1, 1)),
        4 => Some((0, -1)),
        6 => Some((0, 1)),
        7 => Some((-1, -1)),
        8 => Some((-1, 0)),
        9 => Some((-1, 1)),
        _ => None,
    }
}

const D8: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

#[derive(Debug, Clone)]
pub struct DrainageGraph {
    shape: GridShape,
    downstream: Vec<Option<usize>>,
    order: Vec<usize>,
    outlets: Vec<usize>,
}

impl DrainageGraph {
    // Build a graph from explicit downstream links. Every sink becomes an
    // outlet; use `with_outlet_mask` to check against a
    // mapped outlet instead
    pub fn from_downstream(shape: GridShape, downstream: Vec<Option<usize>>) -> ModelResult<Self> {
        if downstream.len() != shape.len() {
            return Err(ModelError::ShapeMismatch {
                name: "drainage".to_string(),
                expected: (shape.rows, shape.cols),
                found: (downstream.len(), 1),
            });
        }
        for (cell, target) in downstream.iter().enumerate() {
            if let Some(d) = *target {
                if d >= shape.len() || d == cell {
                    return Err(ModelError::InvalidDrainageDirection {
                        cell,
                        code: d as u32,
                    });
                }
            }
        }

        let order = topological_order(&downstream)?;
        let outlets = (0..shape.len())
            .filter(|&cell| downstream[cell].is_none())
            .collect();

        Ok(DrainageGraph {
            shape,
            downstream,
            order,
            outlets,
        })
    }

    // Build a graph from a local drain direction raster (keypad codes, 5 = pit)
    pub fn from_ldd(ldd: &CodeField) -> ModelResult<Self> {
        let shape = GridShape::of(ldd);
        let mut downstream = Vec::with_capacity(shape.len());
        for (cell, &code) in ldd.iter().enumerate() {
            if code == LDD_PIT {
                downstream.push(None);
                continue;
            }
            let (dr, dc) =
                ldd_offset(code).ok_or(ModelError::InvalidDrainageDirection { cell, code })?;
            let target = shape
                .offset(cell, dr, dc)
                .ok_or(ModelError::InvalidDrainageDirection { cell, code })?;
            downstream.push(Some(target));
        }
        Self::from_downstream(shape, downstream)
    }

    // Steepest-descent (D8) drainage from elevation. Cells with no strictly
    // lower neighbour become pits, so the result is always acyclic
    pub fn from_elevation(elevation: &Field, cell_size: f64) -> ModelResult<Self> {
        let shape = GridShape::of(elevation);
        let downstream = (0..shape.len())
            .map(|cell| {
                let mut best: Option<(usize, f64)> = None;
                for &(dr, dc) in &D8 {
                    let Some(n) = shape.offset(cell, dr, dc) else {
                        continue;
                    };
                    let distance = if dr != 0 && dc != 0 {
                        cell_size * std::f64::consts::SQRT_2
                    } else {
                        cell_size
                    };
                    let drop = (elevation[cell] - elevation[n]) / distance;
                    if drop > 0.0 && best.is_none_or(|(_, b)| drop > b) {
                        best = Some((n, drop));
                    }
                }
                best.map(|(n, _)| n)
            })
            .collect();
        Self::from_downstream(shape, downstream)
    }

    // Restrict outlets to a mapped mask. Each sink must be flagged, and
    // each flagged cell must be a sink
    pub fn with_outlet_mask(mut self, mask: &DMatrix<bool>) -> ModelResult<Self> {
        self.shape.check("outlet", mask)?;
        for (cell, &flagged) in mask.iter().enumerate() {
            let is_sink = self.downstream[cell].is_none();
            if flagged != is_sink {
                return Err(ModelError::DisconnectedOutlet { cell });
            }
        }
        self.outlets = (0..self.shape.len()).filter(|&c| mask[c]).collect();
        Ok(self)
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    pub fn len(&self) -> usize {
        self.downstream.len()
    }

    pub fn is_empty(&self) -> bool {
        self.downstream.is_empty()
    }

    pub fn downstream(&self, cell: usize) -> Option<usize> {
        self.downstream[cell]
    }

    pub fn outlets(&self) -> &[usize] {
        &self.outlets
    }

    // Accumulate a local quantity downstream: each cell's result is its own
    // value plus the accumulated values of its immediate upstream cells
    pub fn accumulate(&self, local: &Field) -> Field {
        let mut acc = local.clone();
        for &cell in &self.order {
            if let Some(d) = self.downstream[cell] {
                acc[d] += acc[cell];
            }
        }
        acc
    }

    // Accumulate and sum the result over the outlet cells
    pub fn outlet_total(&self, local: &Field) -> f64 {
        let acc = self.accumulate(local);
        self.outlets.iter().map(|&c| acc[c]).sum()
    }
}

// Kahn's algorithm; cells left unordered sit on a cycle
fn topological_order(downstream: &[Option<usize>]) -> ModelResult<Vec<usize>> {
    let n = downstream.len();
    let mut upstream_count = vec![0usize; n];
    for d in downstream.iter().flatten() {
        upstream_count[*d] += 1;
    }

    let mut ready: VecDeque<usize> = (0..n).filter(|&c| upstream_count[c] == 0).collect();
    let mut order = Vec::with_capacity(n);
    while let Some(cell) = ready.pop_front() {
        order.push(cell);
        if let Some(d) = downstream[cell] {
            upstream_count[d] -= 1;
            if upstream_count[d] == 0 {
                ready.push_back(d);
            }
        }
    }

    if order.len() < n {
        return Err(ModelError::DrainageCycle {
            cells: n - order.len(),
        });
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn chain(n: usize) -> DrainageGraph {
        let shape = GridShape::new(1, n);
        let downstream = (0..n)
            .map(|c| if c + 1 < n { Some(c + 1) } else { None })
            .collect();
        DrainageGraph::from_downstream(shape, downstream).unwrap()
    }

    #[test]
    fn single_cell_accumulation_is_identity() {
        let graph = DrainageGraph::from_downstream(GridShape::new(1, 1), vec![None]).unwrap();
        let local = Field::from_element(1, 1, 3.5);
        assert_eq!(graph.accumulate(&local), local);
        assert_eq!(graph.outlets(), &[0]);
    }

    #[test]
    fn chain_accumulates_downstream() {
        let graph = chain(4);
        let local = Field::from_row_slice(1, 4, &[1.0, 2.0, 3.0, 4.0]);
        let acc = graph.accumulate(&local);
        assert_relative_eq!(acc[0], 1.0);
        assert_relative_eq!(acc[1], 3.0);
        assert_relative_eq!(acc[3], 10.0);
        assert_relative_eq!(graph.outlet_total(&local), 10.0);
    }

    #[test]
    fn confluence_sums_both_branches() {
        // 0 -> 2 <- 1, 2 -> 3
        let shape = GridShape::new(1, 4);
        let graph =
            DrainageGraph::from_downstream(shape, vec![Some(2), Some(2), Some(3), None]).unwrap();
        let acc = graph.accumulate(&shape.constant(1.0));
        assert_relative_eq!(acc[2], 3.0);
        assert_relative_eq!(acc[3], 4.0);
    }

    #[test]
    fn cycle_is_rejected() {
        let shape = GridShape::new(1, 3);
        let err = DrainageGraph::from_downstream(shape, vec![Some(1), Some(0), None]).unwrap_err();
        assert!(matches!(err, ModelError::DrainageCycle { cells: 2 }));
    }

    #[test]
    fn ldd_codes_map_to_neighbours() {
        // Two rows, flow south then east to the pit at bottom right.
        let ldd = CodeField::from_row_slice(2, 2, &[2, 2, 6, LDD_PIT]);
        let graph = DrainageGraph::from_ldd(&ldd).unwrap();
        let shape = graph.shape();
        assert_eq!(graph.downstream(shape.index(0, 0)), Some(shape.index(1, 0)));
        assert_eq!(graph.downstream(shape.index(1, 0)), Some(shape.index(1, 1)));
        assert_eq!(graph.outlets(), &[shape.index(1, 1)]);
    }

    #[test]
    fn ldd_pointing_off_grid_is_rejected() {
        let ldd = CodeField::from_row_slice(1, 2, &[4, LDD_PIT]);
        assert!(matches!(
            DrainageGraph::from_ldd(&ldd),
            Err(ModelError::InvalidDrainageDirection { cell: 0, code: 4 })
        ));
    }

    #[test]
    fn elevation_drains_to_lowest_corner() {
        let elevation = Field::from_row_slice(2, 2, &[3.0, 2.0, 2.0, 1.0]);
        let graph = DrainageGraph::from_elevation(&elevation, 1.0).unwrap();
        let shape = graph.shape();
        assert_eq!(graph.outlets(), &[shape.index(1, 1)]);
        assert_eq!(graph.downstream(shape.index(0, 0)), Some(shape.index(1, 1)));
    }

    #[test]
    fn outlet_mask_must_cover_every_sink() {
        let graph = chain(3);
        let bad = DMatrix::from_row_slice(1, 3, &[false, false, false]);
        assert!(matches!(
            graph.clone().with_outlet_mask(&bad),
            Err(ModelError::DisconnectedOutlet { cell: 2 })
        ));
        let good = DMatrix::from_row_slice(1, 3, &[false, false, true]);
        assert!(graph.with_outlet_mask(&good).is_ok());
    }
}
