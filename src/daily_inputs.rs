use crate::error::{ModelError, ModelResult};
use crate::raster::{Field, GridShape};

// One forcing variable: a catchment-wide value per day, or a field per day
#[derive(Debug, Clone)]
pub enum Series {
    Scalar(Vec<f64>),
    Gridded(Vec<Field>),
}

impl Series {
    pub fn len(&self) -> usize {
        match self {
            Series::Scalar(values) => values.len(),
            Series::Gridded(fields) => fields.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Value for `day` at `cell`, broadcasting scalar series across the grid
    pub(crate) fn value(&self, day: usize, cell: usize) -> f64 {
        match self {
            Series::Scalar(values) => values[day],
            Series::Gridded(fields) => fields[day][cell],
        }
    }

    fn check(&self, name: &str, n_steps: usize, shape: GridShape, range: (f64, f64)) -> ModelResult<()> {
        if self.len() < n_steps {
            return Err(ModelError::ForcingTooShort {
                name: name.to_string(),
                len: self.len(),
                needed: n_steps,
            });
        }
        if let Series::Gridded(fields) = self {
            for field in fields {
                shape.check(name, field)?;
            }
        }
        let (lo, hi) = range;
        let admissible = |v: f64| v.is_finite() && v >= lo && v <= hi;
        let first_bad = match self {
            Series::Scalar(values) => values.iter().copied().enumerate().find(|&(_, v)| !admissible(v)),
            Series::Gridded(fields) => fields.iter().enumerate().find_map(|(day, field)| {
                field.iter().copied().find(|&v| !admissible(v)).map(|v| (day, v))
            }),
        };
        match first_bad {
            Some((day, value)) => Err(ModelError::invalid(
                &format!("{name}[day {day}]"),
                value,
                &format!("forcing must be finite and lie in [{lo}, {hi}]"),
            )),
            None => Ok(()),
        }
    }
}

// Daily meteorological forcing, indexed by simulation day
#[derive(Debug, Clone)]
pub struct DailyInputs {
    pub precipitation: Series,         // Precipitation [mm/day]
    pub et0: Series,                   // Reference evapotranspiration [mm/day]
    pub wind: Series,                  // Wind speed at 2 m [m/s]
    pub humidity: Series,              // Minimum relative humidity [%]
    pub air_temperature: Series,       // Mean air temperature [°C]
    pub bare_soil_temperature: Series, // Bare-soil surface temperature [°C]
}

// Forcing values for one cell on one day
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellForcing {
    pub precipitation: f64,
    pub et0: f64,
    pub wind: f64,
    pub humidity: f64,
    pub air_temperature: f64,
    pub bare_soil_temperature: f64,
}

impl DailyInputs {
    // Same value every day, useful for synthetic runs
    pub fn constant(n_days: usize, forcing: CellForcing) -> Self {
        let series = |v: f64| Series::Scalar(vec![v; n_days]);
        DailyInputs {
            precipitation: series(forcing.precipitation),
            et0: series(forcing.et0),
            wind: series(forcing.wind),
            humidity: series(forcing.humidity),
            air_temperature: series(forcing.air_temperature),
            bare_soil_temperature: series(forcing.bare_soil_temperature),
        }
    }

    // Each series with its admissible range
    fn named(&self) -> [(&'static str, &Series, (f64, f64)); 6] {
        let any = (f64::MIN, f64::MAX);
        [
            ("precipitation", &self.precipitation, (0.0, f64::MAX)),
            ("et0", &self.et0, (0.0, f64::MAX)),
            ("wind", &self.wind, (0.0, f64::MAX)),
            ("humidity", &self.humidity, (0.0, 100.0)),
            ("air_temperature", &self.air_temperature, any),
            ("bare_soil_temperature", &self.bare_soil_temperature, any),
        ]
    }

    /// Every series must cover the run, gridded series must match the grid,
    /// and every value must be finite and physically admissible.
    pub fn validate(&self, n_steps: usize, shape: GridShape) -> ModelResult<()> {
        for (name, series, range) in self.named() {
            series.check(name, n_steps, shape, range)?;
        }
        Ok(())
    }

    pub(crate) fn at(&self, day: usize, cell: usize) -> CellForcing {
        CellForcing {
            precipitation: self.precipitation.value(day, cell),
            et0: self.et0.value(day, cell),
            wind: self.wind.value(day, cell),
            humidity: self.humidity.value(day, cell),
            air_temperature: self.air_temperature.value(day, cell),
            bare_soil_temperature: self.bare_soil_temperature.value(day, cell),
        }
    }
}
