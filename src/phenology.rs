use crate::crop_table::{CropParams, LayerSoil};
use crate::daily_inputs::CellForcing;
use crate::potential_et::{biomass_cover, potential_et, PotentialEt};
use crate::state::Layer;

// Seasons searched ahead of the tabulated sowing year
const MAX_SEASONS_AHEAD: u32 = 4;

// Julian day number of a calendar date, as counted by the crop calendar
pub fn julian_day(year: f64, month: f64, day: f64) -> f64 {
    let era = if 100.0 * year + month - 190_002.5 < 0.0 {
        -1.0
    } else {
        1.0
    };
    367.0 * year - (7.0 * (year + ((month + 9.0) / 12.0).floor()) / 4.0).floor()
        + (275.0 * month / 9.0).floor()
        + day
        + 1_721_013.5
        - 0.5 * era
}

// Growth-stage boundaries of one season, in Julian days
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropCalendar {
    pub jd_plant: f64,
    pub jd_dev: f64,
    pub jd_mid: f64,
    pub jd_late: f64,
    pub jd_end: f64,
}

impl CropCalendar {
    pub fn from_sowing(crop: &CropParams, year: f64) -> Self {
        let jd_plant = julian_day(year, crop.sow_month, crop.sow_day);
        let jd_dev = jd_plant + crop.len_ini;
        let jd_mid = jd_dev + crop.len_dev;
        let jd_late = jd_mid + crop.len_mid;
        CropCalendar {
            jd_plant,
            jd_dev,
            jd_mid,
            jd_late,
            jd_end: jd_late + crop.len_end,
        }
    }

    // Season in force on `jd_sim`. Once a season has ended the sowing year
    // rolls forward, up to four years; past that the field carries no crop
    pub fn for_season(crop: &CropParams, jd_sim: f64) -> Option<Self> {
        let jd_sow = julian_day(crop.sow_year, crop.sow_month, crop.sow_day);
        let season_end = jd_sow + crop.season_length();
        (0..=MAX_SEASONS_AHEAD)
            .find(|&ahead| jd_sim < season_end + 365.0 * ahead as f64)
            .map(|ahead| Self::from_sowing(crop, crop.sow_year + ahead as f64))
    }
}

// Crop development on one day for one cell
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CropStatus {
    pub height: f64, // Crop height [m]
    pub root_depth: f64, // Root depth below the surface [mm]
    pub lai: f64,
}

impl CropStatus {
    pub fn on_day(crop: &CropParams, calendar: Option<&CropCalendar>, jd_sim: f64, lai_decline: f64) -> Self {
        let permanent = crop.crop_type > 1.0;
        let max_root = crop.max_root_depth * 1000.0;

        let Some(cal) = calendar else {
            return if permanent {
                CropStatus {
                    height: crop.max_height,
                    root_depth: max_root,
                    ..CropStatus::default()
                }
            } else {
                CropStatus::default()
            };
        };

        // Height and roots reach their maximum halfway through mid-season
        let full_growth = cal.jd_mid + 0.5 * crop.len_mid;
        let ramp = |max: f64| {
            if jd_sim < cal.jd_plant {
                0.0
            } else if jd_sim < full_growth {
                max * (jd_sim - cal.jd_plant) / (full_growth - cal.jd_plant)
            } else if jd_sim < cal.jd_end {
                max
            } else {
                0.0
            }
        };
        let (height, root_depth) = if permanent {
            (crop.max_height, max_root)
        } else {
            (ramp(crop.max_height), ramp(max_root))
        };

        let lai_full = crop.max_lai + 0.5;
        let lai = if jd_sim < cal.jd_plant {
            0.0
        } else if jd_sim < cal.jd_mid {
            crop.max_lai * (jd_sim - cal.jd_plant) / (cal.jd_mid - cal.jd_plant)
        } else if jd_sim < full_growth {
            crop.max_lai + (lai_full - crop.max_lai) * (jd_sim - cal.jd_mid) / (0.5 * crop.len_mid)
        } else if jd_sim < cal.jd_late {
            lai_full
        } else if jd_sim <= cal.jd_end {
            lai_full * (-lai_decline * (jd_sim - cal.jd_late)).exp()
        } else {
            0.0
        };

        CropStatus {
            height,
            root_depth,
            lai,
        }
    }

    // Root depth inside each layer [mm], without overlap between layers
    pub fn roots_by_layer(&self, depths: [f64; 3]) -> [f64; 3] {
        let [z0, z1, z2] = depths;
        let rd = self.root_depth;
        [
            rd.min(z0),
            (rd - z0).clamp(0.0, z1),
            (rd - z0 - z1).clamp(0.0, z2),
        ]
    }
}

// Everything the layer models need to know about the crop on one cell for
// one day
#[derive(Debug, Clone, Copy)]
pub struct CropDay {
    pub soil: [LayerSoil; 3],
    pub cn2: f64,
    pub status: CropStatus,
    pub roots: [f64; 3], // Root depth inside each layer [mm]
    pub pet: PotentialEt,
    pub biomass_cover: f64,
}

impl CropDay {
    pub fn new(
        crop: &CropParams,
        jd_sim: f64,
        forcing: &CellForcing,
        depths: [f64; 3],
        lai_decline: f64,
    ) -> Self {
        let calendar = CropCalendar::for_season(crop, jd_sim);
        let status = CropStatus::on_day(crop, calendar.as_ref(), jd_sim, lai_decline);
        let pet = potential_et(
            crop,
            calendar.as_ref(),
            jd_sim,
            forcing.et0,
            forcing.wind,
            forcing.humidity,
            status.height,
        );
        CropDay {
            soil: Layer::ALL.map(|layer| crop.soil(layer)),
            cn2: crop.cn2,
            roots: status.roots_by_layer(depths),
            status,
            biomass_cover: biomass_cover(pet.soil_cover),
            pet,
        }
    }

    pub fn soil(&self, layer: Layer) -> &LayerSoil {
        &self.soil[layer.index()]
    }
}
