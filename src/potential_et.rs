use crate::crop_table::CropParams;
use crate::phenology::CropCalendar;

// Lower bound on the initial basal crop coefficient
pub const KCB_MIN: f64 = 0.15;

// Largest soil-cover fraction derived from crop coefficients
pub const MAX_SOIL_COVER: f64 = 0.99;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PotentialEt {
    pub transpiration: f64, // Potential transpiration [mm/day]
    pub evaporation: f64, // Potential evaporation [mm/day]
    pub depletion_fraction: f64, // Fraction of available water depletable before stress [-]
    pub soil_cover: f64, // Fraction of soil covered by vegetation [-]
}

// Basal crop coefficient before climate correction, by growth stage.
// Outside a season the coefficient rests at its initial value
pub fn basal_coefficient(crop: &CropParams, calendar: Option<&CropCalendar>, jd_sim: f64) -> f64 {
    let kcb_ini = crop.kcb_ini.max(KCB_MIN);
    let Some(cal) = calendar else {
        return kcb_ini;
    };
    if jd_sim < cal.jd_dev {
        kcb_ini
    } else if jd_sim < cal.jd_mid {
        kcb_ini + (jd_sim - cal.jd_dev) / crop.len_dev * (crop.kcb_mid - kcb_ini)
    } else if jd_sim < cal.jd_late {
        crop.kcb_mid
    } else if jd_sim < cal.jd_end {
        crop.kcb_mid + (jd_sim - cal.jd_late) / crop.len_end * (crop.kcb_end - crop.kcb_mid)
    } else {
        kcb_ini
    }
}

pub fn potential_et(
    crop: &CropParams,
    calendar: Option<&CropCalendar>,
    jd_sim: f64,
    et0: f64,
    wind: f64,
    humidity: f64,
    height: f64,
) -> PotentialEt {
    let kcb_ini = crop.kcb_ini.max(KCB_MIN);
    let kcb1 = basal_coefficient(crop, calendar, jd_sim);

    // Wind, humidity and height correction (FAO-56 eq. 70 and 72)
    let climate = (0.04 * (wind - 2.0) - 0.004 * (humidity - 45.0)) * (height / 3.0).powf(0.3);
    let kcb = if kcb1 > 0.4 { kcb1 + climate } else { kcb1 };
    let kc_max = (1.2 + climate).max(kcb + 0.05);

    let soil_cover = if kc_max > kcb_ini {
        let ratio = ((kcb - kcb_ini) / (kc_max - kcb_ini)).max(0.0);
        ratio.powf(0.5 * height + 1.0).min(MAX_SOIL_COVER)
    } else {
        0.0
    };

    let transpiration = kcb * et0;
    let evaporation = (kc_max - kcb) * et0;
    PotentialEt {
        transpiration,
        evaporation,
        depletion_fraction: crop.p_tab + 0.04 * (5.0 - (transpiration + evaporation)),
        soil_cover,
    }
}

// Biomass cover weight (0 bare, towards 1 fully covered) from the
// vegetated soil fraction, via the SWAT soil-cover index
pub fn biomass_cover(soil_cover: f64) -> f64 {
    let bare = 1.0 - soil_cover;
    if !(bare > 0.0 && bare < 1.0) {
        return if bare <= 0.0 { 1.0 } else { 0.0 };
    }
    // Aboveground biomass [kg/ha] implied by the cover index
    let cv = bare.ln() / -5.0e-5;
    cv / (cv + (7.563 - 1.297e-4 * cv).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phenology::tests::maize;
    use approx::assert_relative_eq;

    #[test]
    fn coefficient_follows_the_four_stages() {
        let crop = maize(1);
        let cal = CropCalendar::from_sowing(&crop, 2016.0);
        let at = |offset: f64| basal_coefficient(&crop, Some(&cal), cal.jd_plant + offset);
        assert_relative_eq!(at(-5.0), 0.15);
        assert_relative_eq!(at(10.0), 0.15);
        assert_relative_eq!(at(50.0), 0.65, epsilon = 1e-12);
        assert_relative_eq!(at(100.0), 1.15);
        assert_relative_eq!(at(135.0), 0.825, epsilon = 1e-12);
        assert_relative_eq!(at(200.0), 0.15);
        assert_relative_eq!(basal_coefficient(&crop, None, 0.0), 0.15);
    }

    #[test]
    fn reference_climate_has_no_correction() {
        let crop = maize(1);
        let cal = CropCalendar::from_sowing(&crop, 2016.0);
        let pet = potential_et(&crop, Some(&cal), cal.jd_plant + 100.0, 4.0, 2.0, 45.0, 2.0);
        assert_relative_eq!(pet.transpiration, 4.6, epsilon = 1e-12);
        assert_relative_eq!(pet.evaporation, 0.2, epsilon = 1e-12);
        assert_relative_eq!(pet.depletion_fraction, 0.55 + 0.04 * 0.2, epsilon = 1e-12);
        assert!(pet.soil_cover > 0.0 && pet.soil_cover <= MAX_SOIL_COVER);
    }

    #[test]
    fn bare_soil_before_planting() {
        let crop = maize(1);
        let cal = CropCalendar::from_sowing(&crop, 2016.0);
        let pet = potential_et(&crop, Some(&cal), cal.jd_plant - 1.0, 2.0, 3.0, 60.0, 0.0);
        assert_eq!(pet.soil_cover, 0.0);
        assert_relative_eq!(pet.transpiration, 0.3, epsilon = 1e-12);
        assert_relative_eq!(pet.evaporation, (1.2 - 0.15) * 2.0, epsilon = 1e-12);
    }

    #[test]
    fn biomass_cover_spans_bare_to_covered() {
        assert_eq!(biomass_cover(0.0), 0.0);
        assert_eq!(biomass_cover(1.0), 1.0);
        let half = biomass_cover(0.5);
        let most = biomass_cover(0.99);
        assert!(half > 0.0 && half < most && most < 1.0);
    }
}
