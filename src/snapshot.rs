//! Full-grid copies of the state, taken on milestone days and whenever a
//! step needed a clamp or left a balance residual above tolerance.

use std::collections::BTreeMap;

use crate::raster::Field;
use crate::state::{Layer, SimulationState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StateVariable {
    Moisture(Layer),
    Temperature(Layer),
    PesticideMass(Layer),
    Delta(Layer),
    SurfaceTemperature,
}

impl StateVariable {
    /// Every variable a snapshot holds.
    pub fn all() -> Vec<StateVariable> {
        let mut vars = Vec::with_capacity(13);
        for layer in Layer::ALL {
            vars.extend([
                StateVariable::Moisture(layer),
                StateVariable::Temperature(layer),
                StateVariable::PesticideMass(layer),
                StateVariable::Delta(layer),
            ]);
        }
        vars.push(StateVariable::SurfaceTemperature);
        vars
    }

    pub fn read<'s>(&self, state: &'s SimulationState) -> &'s Field {
        match *self {
            StateVariable::Moisture(l) => &state.layers[l].theta,
            StateVariable::Temperature(l) => &state.layers[l].temperature,
            StateVariable::PesticideMass(l) => &state.layers[l].mass,
            StateVariable::Delta(l) => &state.layers[l].delta,
            StateVariable::SurfaceTemperature => &state.temp_surface,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotReason {
    Milestone,
    Clamp,
    BalanceResidual,
}

#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Step whose end-of-day state is held.
    pub day: usize,
    pub reason: SnapshotReason,
    pub fields: BTreeMap<StateVariable, Field>,
}

impl Snapshot {
    pub fn capture(day: usize, state: &SimulationState, reason: SnapshotReason) -> Self {
        let fields = StateVariable::all()
            .into_iter()
            .map(|var| (var, var.read(state).clone()))
            .collect();
        Snapshot { day, reason, fields }
    }

    pub fn get(&self, var: StateVariable) -> Option<&Field> {
        self.fields.get(&var)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_layer_variable_is_listed_once() {
        let vars = StateVariable::all();
        assert_eq!(vars.len(), 13);
        let unique: std::collections::BTreeSet<_> = vars.iter().collect();
        assert_eq!(unique.len(), vars.len());
        assert_eq!(vars.last(), Some(&StateVariable::SurfaceTemperature));
    }
}
