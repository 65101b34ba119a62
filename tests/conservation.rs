//! Conservation tests on a synthetic hillslope.
//!
//! These check the balances the model carries as its runtime oracle:
//! - water in = water out + storage change, every step
//! - pesticide in = pesticide lost + degraded + storage change, every step
//! - run-to-date totals reconcile with the initial background storage

mod common;

use common::*;
use pesticide_balance::{CodeField, Layer, StepBalance};

const DOSE: f64 = 20.0;

fn hillslope_run(n_steps: usize) -> (pesticide_balance::Simulation, Vec<StepBalance>) {
    let mut config = config(n_steps);
    config.applications = single_application(2, 1212, DOSE);
    let elevation = tilted_plane(5, 3);
    let farmer_crop = CodeField::from_element(5, 3, 1212);
    let mut sim = simulation(config, elevation, farmer_crop, stormy(n_steps, 40.0));
    let mut balances = Vec::new();
    while let Some(balance) = sim.step() {
        balances.push(balance);
    }
    (sim, balances)
}

#[test]
fn test_water_balance_closes_every_step() {
    let (sim, balances) = hillslope_run(30);
    assert_eq!(balances.len(), 30);
    for b in &balances {
        assert!(
            b.water_relative() < 1e-9,
            "day {}: water residual {:e}",
            b.day,
            b.water_residual
        );
    }
    // Storms must actually have produced runoff and deep percolation
    assert!(sim.series().runoff.iter().any(|&r| r > 0.0));
    assert!(sim.series().percolation.iter().any(|&p| p > 0.0));
}

#[test]
fn test_pesticide_balance_closes_every_step() {
    let (sim, balances) = hillslope_run(30);
    for b in &balances {
        assert!(
            b.pesticide_relative() < 1e-9,
            "day {}: pesticide residual {:e}",
            b.day,
            b.pesticide_residual
        );
    }
    assert!(sim.diagnostics().faults().is_empty());
}

#[test]
fn test_mass_round_trip() {
    let (sim, balances) = hillslope_run(30);
    let last = balances.last().unwrap();
    let area = sim.terrain().cell_area();

    assert!((last.cumulative_applied - DOSE * area * 15.0).abs() < 1e-9);
    assert!(last.cumulative_degraded > 0.0);

    let initial = sim.state().initial_storage.sum();
    let reconciled = initial + last.cumulative_applied
        - last.cumulative_runoff_loss
        - last.cumulative_leached
        - last.cumulative_volatilized
        + last.cumulative_lateral_flux
        - last.cumulative_degraded;
    assert!(
        (reconciled - last.catchment_mass).abs() < 1e-9 * (initial + last.cumulative_applied),
        "round trip off by {:e}",
        reconciled - last.catchment_mass
    );
    assert!(last.cumulative_residual.abs() < 1e-9 * (initial + last.cumulative_applied));
}

#[test]
fn test_moisture_stays_within_bounds() {
    let mut config = config(25);
    config.applications = single_application(2, 1212, DOSE);
    let mut sim = simulation(
        config,
        tilted_plane(4, 4),
        CodeField::from_element(4, 4, 1212),
        stormy(25, 80.0),
    );
    let crop = maize();
    while sim.step().is_some() {
        for layer in Layer::ALL {
            let theta_sat = crop.soil(layer).theta_sat;
            for &theta in sim.state().layers[layer].theta.iter() {
                assert!((0.0..=theta_sat).contains(&theta), "{layer:?}: θ = {theta}");
            }
            for &mass in sim.state().layers[layer].mass.iter() {
                assert!(mass >= 0.0);
            }
        }
    }
}
