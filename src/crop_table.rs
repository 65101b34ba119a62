use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{ModelError, ModelResult};
use crate::state::Layer;

// Crop and soil parameters for one land-use code (one row of the crop table)
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CropParams {
    pub code: u32,
    pub crop_type: f64,       // > 1 means permanent cover (grass, hedge, orchard)
    pub sow_year: f64,        // Sowing or green-up date
    pub sow_month: f64,
    pub sow_day: f64,
    pub len_ini: f64,         // Initial stage length [days]
    pub len_dev: f64,         // Development stage length [days]
    pub len_mid: f64,         // Mid-season stage length [days]
    pub len_end: f64,         // Late-season stage length [days]
    pub kcb_ini: f64,         // Basal crop coefficients
    pub kcb_mid: f64,
    pub kcb_end: f64,
    pub max_lai: f64,         // Maximum leaf area index [-]
    pub mu: f64,              // Light-use coefficient for soil cover [-]
    pub max_height: f64,      // Maximum crop height [m]
    pub max_root_depth: f64,  // Maximum root depth [m]
    pub p_tab: f64,           // Depletable fraction before stress [-]
    pub theta_sat_z0z1: f64,  // Saturation, layers 0-1 [cm³/cm³]
    pub theta_fc_z0z1: f64,   // Field capacity, layers 0-1 [cm³/cm³]
    pub theta_sat_z2: f64,    // Saturation, layer 2 [cm³/cm³]
    pub theta_fc_z2: f64,     // Field capacity, layer 2 [cm³/cm³]
    pub theta_wp: f64,        // Wilting point, all layers [cm³/cm³]
    pub k_sat_z0z1: f64,      // Saturated conductivity, layers 0-1 [mm/day]
    pub k_sat_z2: f64,        // Saturated conductivity, layer 2 [mm/day]
    pub cn2: f64,             // Curve number, moisture condition II
}

// Hydraulic properties of one layer under one crop row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerSoil {
    pub theta_sat: f64,
    pub theta_fc: f64,
    pub theta_wp: f64,
    pub k_sat: f64,
}

impl CropParams {
    pub fn soil(&self, layer: Layer) -> LayerSoil {
        match layer {
            Layer::Z0 | Layer::Z1 => LayerSoil {
                theta_sat: self.theta_sat_z0z1,
                theta_fc: self.theta_fc_z0z1,
                theta_wp: self.theta_wp,
                k_sat: self.k_sat_z0z1,
            },
            Layer::Z2 => LayerSoil {
                theta_sat: self.theta_sat_z2,
                theta_fc: self.theta_fc_z2,
                theta_wp: self.theta_wp,
                k_sat: self.k_sat_z2,
            },
        }
    }

    /// Total season length [days].
    pub fn season_length(&self) -> f64 {
        self.len_ini + self.len_dev + self.len_mid + self.len_end
    }

    fn malformed(&self, reason: impl Into<String>) -> ModelError {
        ModelError::MalformedTable {
            row: self.code,
            reason: reason.into(),
        }
    }

    fn numeric_fields(&self) -> [(&'static str, f64); 24] {
        [
            ("crop_type", self.crop_type),
            ("sow_year", self.sow_year),
            ("sow_month", self.sow_month),
            ("sow_day", self.sow_day),
            ("len_ini", self.len_ini),
            ("len_dev", self.len_dev),
            ("len_mid", self.len_mid),
            ("len_end", self.len_end),
            ("kcb_ini", self.kcb_ini),
            ("kcb_mid", self.kcb_mid),
            ("kcb_end", self.kcb_end),
            ("max_lai", self.max_lai),
            ("mu", self.mu),
            ("max_height", self.max_height),
            ("max_root_depth", self.max_root_depth),
            ("p_tab", self.p_tab),
            ("theta_sat_z0z1", self.theta_sat_z0z1),
            ("theta_fc_z0z1", self.theta_fc_z0z1),
            ("theta_sat_z2", self.theta_sat_z2),
            ("theta_fc_z2", self.theta_fc_z2),
            ("theta_wp", self.theta_wp),
            ("k_sat_z0z1", self.k_sat_z0z1),
            ("k_sat_z2", self.k_sat_z2),
            ("cn2", self.cn2),
        ]
    }

    pub fn validate(&self) -> ModelResult<()> {
        for (name, value) in self.numeric_fields() {
            if !(value.is_finite() && value >= 0.0) {
                return Err(self.malformed(format!("{name} = {value} must be finite and not negative")));
            }
        }
        if self.max_root_depth <= 0.0 {
            return Err(self.malformed("max_root_depth must be positive"));
        }
        for layer in Layer::ALL {
            let soil = self.soil(layer);
            if !(0.0 <= soil.theta_wp
                && soil.theta_wp < soil.theta_fc
                && soil.theta_fc < soil.theta_sat
                && soil.theta_sat <= 1.0)
            {
                return Err(self.malformed(format!(
                    "layer {layer:?} needs 0 <= theta_wp < theta_fc < theta_sat <= 1"
                )));
            }
            if soil.k_sat < 0.0 {
                return Err(self.malformed("saturated conductivity must not be negative"));
            }
        }
        let stages = [self.len_ini, self.len_dev, self.len_mid, self.len_end];
        if stages.iter().any(|&len| !(len > 0.0)) {
            return Err(self.malformed("stage lengths must be positive"));
        }
        if !(self.cn2 > 0.0 && self.cn2 < 100.0) {
            return Err(self.malformed("curve number must lie in (0, 100)"));
        }
        if !(0.0..=1.0).contains(&self.p_tab) {
            return Err(self.malformed("depletion fraction must lie in [0, 1]"));
        }
        if !(1.0..=12.0).contains(&self.sow_month) || !(1.0..=31.0).contains(&self.sow_day) {
            return Err(self.malformed("sowing date is not a calendar date"));
        }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CropFile {
    crop: Vec<CropParams>,
}

// Crop table keyed by land-use code
#[derive(Debug, Clone, Default)]
pub struct CropTable {
    rows: Vec<CropParams>,
    index: BTreeMap<u32, usize>,
}

impl CropTable {
    pub fn from_rows(rows: Vec<CropParams>) -> ModelResult<Self> {
        let mut index = BTreeMap::new();
        for (i, row) in rows.iter().enumerate() {
            row.validate()?;
            if index.insert(row.code, i).is_some() {
                return Err(row.malformed("duplicate land-use code"));
            }
        }
        Ok(CropTable { rows, index })
    }

    /// Parse a table written as `[[crop]]` entries.
    pub fn from_toml_str(text: &str) -> ModelResult<Self> {
        let file: CropFile = toml::from_str(text)?;
        Self::from_rows(file.crop)
    }

    pub fn from_file(path: impl AsRef<Path>) -> ModelResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn get(&self, code: u32) -> ModelResult<&CropParams> {
        self.row_index(code).map(|i| &self.rows[i])
    }

    pub fn row_index(&self, code: u32) -> ModelResult<usize> {
        self.index
            .get(&code)
            .copied()
            .ok_or(ModelError::MissingCropCode { code })
    }

    pub fn row(&self, index: usize) -> &CropParams {
        &self.rows[index]
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = r#"
        [[crop]]
        code = 13
        crop_type = 1.0
        sow_year = 2016.0
        sow_month = 4.0
        sow_day = 1.0
        len_ini = 30.0
        len_dev = 40.0
        len_mid = 50.0
        len_end = 30.0
        kcb_ini = 0.15
        kcb_mid = 1.15
        kcb_end = 0.5
        max_lai = 5.0
        mu = 0.45
        max_height = 2.0
        max_root_depth = 1.0
        p_tab = 0.55
        theta_sat_z0z1 = 0.55
        theta_fc_z0z1 = 0.35
        theta_sat_z2 = 0.5
        theta_fc_z2 = 0.3
        theta_wp = 0.1
        k_sat_z0z1 = 500.0
        k_sat_z2 = 200.0
        cn2 = 80.0
    "#;

    #[test]
    fn parses_and_looks_up_rows() {
        let table = CropTable::from_toml_str(TABLE).unwrap();
        assert_eq!(table.len(), 1);
        let row = table.get(13).unwrap();
        assert_eq!(row.soil(Layer::Z1).theta_fc, 0.35);
        assert_eq!(row.soil(Layer::Z2).k_sat, 200.0);
        assert_eq!(row.season_length(), 150.0);
    }

    #[test]
    fn missing_code_is_an_error() {
        let table = CropTable::from_toml_str(TABLE).unwrap();
        assert!(matches!(
            table.get(99),
            Err(ModelError::MissingCropCode { code: 99 })
        ));
    }

    #[test]
    fn inverted_moisture_constants_are_malformed() {
        let text = TABLE.replace("theta_fc_z2 = 0.3", "theta_fc_z2 = 0.6");
        assert!(matches!(
            CropTable::from_toml_str(&text),
            Err(ModelError::MalformedTable { row: 13, .. })
        ));
    }

    #[test]
    fn missing_column_fails_to_parse() {
        let text = TABLE.replace("cn2 = 80.0", "");
        assert!(matches!(
            CropTable::from_toml_str(&text),
            Err(ModelError::Toml(_))
        ));
    }

    fn reason(result: ModelResult<CropTable>) -> String {
        match result {
            Err(ModelError::MalformedTable { row: 13, reason }) => reason,
            other => panic!("expected a malformed row, got {other:?}"),
        }
    }

    // TABLE with one column rewritten to a TOML float literal
    fn with_value(name: &str, literal: &str) -> String {
        TABLE
            .lines()
            .map(|line| {
                if line.trim().starts_with(&format!("{name} =")) {
                    format!("{name} = {literal}")
                } else {
                    line.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn every_field_must_be_finite_and_not_negative() {
        let row = CropTable::from_toml_str(TABLE).unwrap().get(13).unwrap().clone();
        for (name, _) in row.numeric_fields() {
            for literal in ["-1.0", "nan", "inf"] {
                let reason = reason(CropTable::from_toml_str(&with_value(name, literal)));
                assert!(reason.contains(name), "{name} = {literal}: {reason}");
            }
        }
    }

    #[test]
    fn negative_crop_height_is_rejected() {
        let mut row = CropTable::from_toml_str(TABLE).unwrap().get(13).unwrap().clone();
        row.max_height = -1.0;
        let reason = reason(CropTable::from_rows(vec![row]));
        assert!(reason.contains("max_height"));
    }

    #[test]
    fn roots_must_reach_below_the_surface() {
        let reason = reason(CropTable::from_toml_str(&with_value("max_root_depth", "0.0")));
        assert!(reason.contains("max_root_depth"));
    }

    #[test]
    fn duplicate_codes_are_rejected() {
        let doubled = format!("{TABLE}\n{TABLE}");
        assert!(matches!(
            CropTable::from_toml_str(&doubled),
            Err(ModelError::MalformedTable { row: 13, .. })
        ));
    }
}
