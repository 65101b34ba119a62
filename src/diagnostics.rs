use log::warn;

use crate::state::Layer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClampKind {
    // Percolation would have driven moisture below zero
    NegativeMoisture,
    // Final moisture fell outside [0, θ_sat]
    MoistureBounds,
    // A pesticide pool went negative
    NegativeMass,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClampEvent {
    pub day: usize,
    pub cell: usize,
    pub layer: Layer,
    pub kind: ClampKind,
    pub value: f64, // Offending value before the clamp
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BalanceKind {
    Water,
    Pesticide,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResidualFault {
    pub day: usize,
    pub kind: BalanceKind,
    pub residual: f64,
    pub relative: f64, // Residual relative to the largest term of the balance
}

#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    clamps: Vec<ClampEvent>,
    faults: Vec<ResidualFault>,
}

impl Diagnostics {
    pub fn record(&mut self, event: ClampEvent) {
        warn!(
            "day {}: {:?} clamp at cell {} layer {:?} (value {:.6e})",
            event.day, event.kind, event.cell, event.layer, event.value
        );
        self.clamps.push(event);
    }

    pub fn record_fault(&mut self, fault: ResidualFault) {
        warn!(
            "day {}: {:?} balance residual {:.6e} ({:.3e} relative) exceeds tolerance",
            fault.day, fault.kind, fault.residual, fault.relative
        );
        self.faults.push(fault);
    }

    pub fn clamps(&self) -> &[ClampEvent] {
        &self.clamps
    }

    pub fn faults(&self) -> &[ResidualFault] {
        &self.faults
    }

    pub fn count(&self, kind: ClampKind) -> usize {
        self.clamps.iter().filter(|e| e.kind == kind).count()
    }

    pub fn is_clean(&self) -> bool {
        self.clamps.is_empty() && self.faults.is_empty()
    }
}
