//! Application schedule: the configured events resolved once against the
//! farmer × crop map into per-day mass and signature fields.

use std::collections::{BTreeMap, HashMap};

use log::debug;

use crate::config::ApplicationConfig;
use crate::error::{ModelError, ModelResult};
use crate::isotope::mix;
use crate::raster::{CodeField, Field, GridShape};

/// Product applied on one day.
#[derive(Debug, Clone)]
pub struct Application {
    /// Active ingredient per cell [mg].
    pub mass: Field,
    /// Signature of the applied product per cell [‰].
    pub delta: Field,
}

#[derive(Debug, Clone, Default)]
pub struct ApplicationSchedule {
    by_day: BTreeMap<usize, Application>,
}

impl ApplicationSchedule {
    pub fn build(config: &ApplicationConfig, farmer_crop: &CodeField, cell_area: f64) -> ModelResult<Self> {
        let doses: HashMap<u32, f64> = config.doses.iter().map(|d| (d.code, d.dose)).collect();
        let shape = GridShape::of(farmer_crop);
        let mut by_day: BTreeMap<usize, Application> = BTreeMap::new();

        for event in &config.events {
            let mut event_doses = HashMap::new();
            for &code in &event.codes {
                let dose = doses.get(&code).ok_or(ModelError::MissingDose { code })?;
                event_doses.insert(code, *dose);
            }
            let mass = shape.field_from_fn(|cell| {
                event_doses
                    .get(&farmer_crop[cell])
                    .map_or(0.0, |dose| dose * cell_area)
            });
            debug!(
                "application on day {}: {:.3} mg over {} codes",
                event.day,
                mass.sum(),
                event.codes.len()
            );

            let app = by_day.entry(event.day).or_insert_with(|| Application {
                mass: shape.zeros(),
                delta: shape.constant(event.delta),
            });
            // Events sharing a day combine by mass
            for cell in 0..shape.len() {
                app.delta[cell] = mix(app.mass[cell], app.delta[cell], mass[cell], event.delta);
                app.mass[cell] += mass[cell];
            }
        }
        Ok(ApplicationSchedule { by_day })
    }

    pub fn on_day(&self, day: usize) -> Option<&Application> {
        self.by_day.get(&day)
    }

    pub fn is_application_day(&self, day: usize) -> bool {
        self.by_day.contains_key(&day)
    }

    pub fn days(&self) -> impl Iterator<Item = usize> + '_ {
        self.by_day.keys().copied()
    }
}
