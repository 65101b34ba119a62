//! Small hand-checkable catchments.

mod common;

use common::*;
use pesticide_balance::{CellForcing, CodeField, DailyInputs, Field, Layer};

/// One flat cell, no rain, no application, every layer below field
/// capacity: only evapotranspiration and degradation act.
#[test]
fn test_dry_single_cell_dries_and_decays() {
    let mut config = config(120);
    config.soil.initial_theta = [0.3, 0.3, 0.25];
    let mut sim = simulation(
        config,
        Field::from_element(1, 1, 100.0),
        CodeField::from_element(1, 1, 0),
        DailyInputs::constant(120, dry_day()),
    );
    let crop = maize();

    let mut previous_water = profile_water(&sim);
    while let Some(b) = sim.step() {
        let before = b.day;
        let state = sim.state();
        for layer in Layer::ALL {
            let l = &state.layers[layer];
            assert!(l.theta[0] <= l.theta_initial[0], "day {before}: {layer:?} gained water");
            assert!(l.mass[0] < l.mass_initial[0], "day {before}: {layer:?} mass did not decay");
        }
        let air_dry = 0.33 * crop.theta_wp;
        assert!(state.layers[Layer::Z0].theta[0] >= air_dry - 1e-12);

        assert_eq!(b.runoff, 0.0);
        assert_eq!(b.percolation, 0.0);
        assert_eq!(b.leached, 0.0);
        assert_eq!(b.applied, 0.0);
        assert_eq!(b.volatilized, 0.0);
        assert!(b.degraded > 0.0);
        assert!((b.mass_change + b.degraded).abs() < 1e-9 * b.catchment_mass.max(1.0));

        let water = profile_water(&sim);
        assert!(water <= previous_water + 1e-12);
        previous_water = water;
    }

    let state = sim.state();
    assert!(state.layers[Layer::Z0].theta[0] < 0.3);
    assert!(state.layers[Layer::Z1].theta[0] < 0.3);
}

#[test]
fn test_degradation_enriches_the_remaining_mass() {
    let mut config = config(40);
    config.soil.initial_theta = [0.3, 0.3, 0.25];
    let background = config.pesticide.background_delta;
    let mut sim = simulation(
        config,
        Field::from_element(1, 1, 100.0),
        CodeField::from_element(1, 1, 0),
        DailyInputs::constant(40, dry_day()),
    );
    let mut previous = background;
    while sim.step().is_some() {
        let delta = sim.state().layers[Layer::Z0].delta[0];
        assert!(delta > previous);
        previous = delta;
    }
}

fn wet_day() -> CellForcing {
    CellForcing {
        precipitation: 10.0,
        et0: 0.5,
        ..dry_day()
    }
}

// Upstream cell 0 drains into outlet cell 1; only cell 0 is treated, on day 1
fn pulse(lateral: f64) -> pesticide_balance::Simulation {
    let mut config = config(5);
    config.pesticide.background_concentration = [0.0; 3];
    config.hydro.lateral_coefficient = [lateral; 3];
    config.applications = single_application(1, 1212, 50.0);
    simulation(
        config,
        Field::from_row_slice(1, 2, &[101.0, 100.0]),
        CodeField::from_row_slice(1, 2, &[1212, 0]),
        DailyInputs::constant(5, wet_day()),
    )
}

fn cell_mass(sim: &pesticide_balance::Simulation, cell: usize) -> f64 {
    sim.state().total_mass()[cell]
}

#[test]
fn test_pulse_reaches_downstream_only_through_transfer() {
    let mut sim = pulse(0.25);
    assert_eq!(sim.terrain().drainage().downstream(0), Some(1));

    sim.step();
    assert_eq!(cell_mass(&sim, 0), 0.0);
    assert_eq!(cell_mass(&sim, 1), 0.0);

    let day1 = sim.step().unwrap();
    assert!((day1.applied - 200.0).abs() < 1e-9);
    assert!(cell_mass(&sim, 0) > 0.0);
    let downstream = cell_mass(&sim, 1);
    assert!(downstream > 0.0);
    assert!(downstream < cell_mass(&sim, 0));
    assert!(sim.state().layers[Layer::Z0].mass[1] > 0.0);
}

#[test]
fn test_without_lateral_flow_downstream_stays_clean() {
    let mut sim = pulse(0.0);
    while sim.step().is_some() {
        assert_eq!(cell_mass(&sim, 1), 0.0);
    }
    assert!(cell_mass(&sim, 0) > 0.0);
    // Vertical transfer still carries the product below the mixing layer
    assert!(sim.state().layers[Layer::Z1].mass[0] > 0.0);
}
