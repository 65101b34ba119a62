// Mass below which a pool is treated as empty [mg]
pub const MASS_EPS: f64 = 1e-12;

// Isotope ratio (heavy / light) of a signature `delta` [‰]
pub fn ratio(delta: f64, r_standard: f64) -> f64 {
    (delta / 1000.0 + 1.0) * r_standard
}

pub fn delta(ratio: f64, r_standard: f64) -> f64 {
    (ratio / r_standard - 1.0) * 1000.0
}

// Two-source mixing. An (almost) empty mixture keeps the previous signature
pub fn mix(mass: f64, delta: f64, added_mass: f64, added_delta: f64) -> f64 {
    let total = mass + added_mass;
    if total.abs() <= MASS_EPS {
        return delta;
    }
    (delta * mass + added_delta * added_mass) / total
}

// Light and heavy isotopologue pools of a mass with signature `delta`
pub fn split_pools(mass: f64, delta: f64, r_standard: f64) -> (f64, f64) {
    let r = ratio(delta, r_standard);
    let light = mass / (1.0 + r);
    (light, mass - light)
}

// Signature of recombined pools, or `fallback` when the light pool is empty
pub fn pools_delta(light: f64, heavy: f64, r_standard: f64, fallback: f64) -> f64 {
    if light <= MASS_EPS {
        return fallback;
    }
    delta(heavy / light, r_standard)
}
