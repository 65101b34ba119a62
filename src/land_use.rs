//! Land-use map and its daily schedule.
//!
//! Cells carry a field identifier. A field either keeps its identifier as
//! its crop-table code for the whole run, or follows a daily code series
//! (crop rotation, ploughing, fallow). Codes are resolved against the crop
//! table once, at initialization.

use std::collections::BTreeMap;

use crate::crop_table::{CropParams, CropTable};
use crate::error::ModelResult;
use crate::raster::{CodeField, GridShape};

#[derive(Debug, Clone)]
pub struct LandUse {
    fields: CodeField,
    schedule: BTreeMap<u32, Vec<u32>>,
}

impl LandUse {
    pub fn new(fields: CodeField) -> Self {
        LandUse {
            fields,
            schedule: BTreeMap::new(),
        }
    }

    /// Give field `field` a daily sequence of crop codes. Days past the end
    /// of the sequence keep its last code.
    pub fn with_schedule(mut self, field: u32, codes: Vec<u32>) -> Self {
        self.schedule.insert(field, codes);
        self
    }

    pub fn shape(&self) -> GridShape {
        GridShape::of(&self.fields)
    }

    pub fn code_at(&self, cell: usize, day: usize) -> u32 {
        let field = self.fields[cell];
        match self.schedule.get(&field) {
            Some(codes) if !codes.is_empty() => codes[day.min(codes.len() - 1)],
            _ => field,
        }
    }

    /// Resolve every code this map can produce to a crop-table row.
    pub fn resolve(&self, table: &CropTable) -> ModelResult<CropAssignment> {
        let mut static_rows = Vec::with_capacity(self.fields.len());
        for &field in self.fields.iter() {
            static_rows.push(match self.schedule.get(&field) {
                Some(codes) if !codes.is_empty() => None,
                _ => Some(table.row_index(field)?),
            });
        }
        let mut scheduled = BTreeMap::new();
        for (&field, codes) in &self.schedule {
            let rows = codes
                .iter()
                .map(|&code| table.row_index(code))
                .collect::<ModelResult<Vec<_>>>()?;
            scheduled.insert(field, rows);
        }
        Ok(CropAssignment {
            fields: self.fields.clone(),
            static_rows,
            scheduled,
        })
    }
}

/// Land use resolved to crop-table rows.
#[derive(Debug, Clone)]
pub struct CropAssignment {
    fields: CodeField,
    static_rows: Vec<Option<usize>>,
    scheduled: BTreeMap<u32, Vec<usize>>,
}

impl CropAssignment {
    pub fn row_at(&self, cell: usize, day: usize) -> usize {
        if let Some(row) = self.static_rows[cell] {
            return row;
        }
        // Scheduled fields are non-empty by construction
        let rows = &self.scheduled[&self.fields[cell]];
        rows[day.min(rows.len() - 1)]
    }

    pub fn crop_at<'t>(&self, table: &'t CropTable, cell: usize, day: usize) -> &'t CropParams {
        table.row(self.row_at(cell, day))
    }
}
