//! Properties of the building blocks that hold for any input.

use pesticide_balance::drainage::DrainageGraph;
use pesticide_balance::isotope::mix;
use pesticide_balance::runoff::{adjust_curve_number, calculate_runoff, retention_parameter, UpperSoil};
use pesticide_balance::{Field, GridShape};

#[test]
fn test_accumulation_on_a_single_cell_is_identity() {
    let graph = DrainageGraph::from_elevation(&Field::from_element(1, 1, 250.0), 2.0).unwrap();
    assert_eq!(graph.outlets(), &[0]);
    for value in [0.0, 1.5, -3.0, 1e6] {
        let local = Field::from_element(1, 1, value);
        assert_eq!(graph.accumulate(&local), local);
        assert_eq!(graph.outlet_total(&local), value);
    }
}

#[test]
fn test_accumulation_along_a_chain() {
    let graph = DrainageGraph::from_downstream(GridShape::new(1, 4), vec![Some(1), Some(2), Some(3), None]).unwrap();
    let acc = graph.accumulate(&Field::from_element(1, 4, 1.0));
    assert_eq!(acc.as_slice(), &[1.0, 2.0, 3.0, 4.0]);
    assert_eq!(graph.outlet_total(&Field::from_row_slice(1, 4, &[1.0, 2.0, 3.0, 4.0])), 10.0);
}

#[test]
fn test_curve_number_runoff_threshold_and_monotonicity() {
    let soil = UpperSoil {
        depth: 150.0,
        theta: 0.4,
        theta_sat: 0.55,
        theta_fc: 0.35,
        theta_wp: 0.1,
    };
    for cn2 in [55.0, 70.0, 80.0, 92.0] {
        for slope in [0.001, 0.05, 0.3] {
            let s = retention_parameter(adjust_curve_number(cn2, slope), &soil);
            assert!(s.is_finite() && s > 0.0, "cn2 {cn2}: S = {s}");

            for p in [0.0, 0.05 * s, 0.1 * s, 0.2 * s] {
                assert_eq!(calculate_runoff(p, s), 0.0);
            }
            let mut previous = 0.0;
            for i in 1..=50 {
                let p = 0.2 * s + i as f64;
                let q = calculate_runoff(p, s);
                assert!(q > previous, "cn2 {cn2}: runoff not increasing at P = {p}");
                assert!(q < p);
                previous = q;
            }
        }
    }
}

#[test]
fn test_wetter_soil_retains_less() {
    let soil = |theta| UpperSoil {
        depth: 150.0,
        theta,
        theta_sat: 0.55,
        theta_fc: 0.35,
        theta_wp: 0.1,
    };
    let cn = adjust_curve_number(80.0, 0.05);
    let dry = retention_parameter(cn, &soil(0.15));
    let wet = retention_parameter(cn, &soil(0.5));
    assert!(wet < dry);
}

#[test]
fn test_mixing_stays_between_its_sources() {
    let masses = [0.0, 1e-6, 0.3, 2.0, 150.0];
    let deltas = [-35.0, -23.7, -10.0, 0.0, 4.2];
    for &m0 in &masses {
        for &m1 in &masses {
            for &d0 in &deltas {
                for &d1 in &deltas {
                    let mixed = mix(m0, d0, m1, d1);
                    let (lo, hi) = (d0.min(d1), d0.max(d1));
                    assert!(
                        mixed >= lo - 1e-12 && mixed <= hi + 1e-12,
                        "mix({m0}, {d0}, {m1}, {d1}) = {mixed}"
                    );
                }
            }
        }
    }
}
