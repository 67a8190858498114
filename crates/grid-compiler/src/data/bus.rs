use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use super::pick;

/// Electrical bus category seen by the power-flow solvers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BusType {
    /// Voltage magnitude and angle fixed (reference)
    Slack,
    /// Voltage magnitude controlled by a local device
    Pv,
    #[default]
    Pq,
    /// Reactive power shared with a remote voltage controller
    P,
    /// Voltage controlled from a remote device
    Pqv,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BusData {
    pub names: Vec<String>,
    pub idtags: Vec<String>,
    /// Nominal voltage (kV)
    pub vnom: Vec<f64>,
    pub vmin: Vec<f64>,
    pub vmax: Vec<f64>,
    pub vm_cost: Vec<f64>,
    pub angle_min: Vec<f64>,
    pub angle_max: Vec<f64>,
    /// Initial voltage guess (p.u.)
    pub v0: Vec<Complex64>,
    pub active: Vec<bool>,
    pub bus_types: Vec<BusType>,
    pub is_dc: Vec<bool>,
    pub substations: Vec<Option<usize>>,
    pub areas: Vec<Option<usize>>,
    pub zones: Vec<Option<usize>>,
    /// Installed generation and storage power (MW)
    pub installed_power: Vec<f64>,
    /// Reactive power of the uncontrolled injections (Mvar)
    pub q_fixed: Vec<f64>,
    /// Sum of the Qmax of the voltage-controlling devices (Mvar)
    pub q_shared_total: Vec<f64>,
    pub srap_available_power: Vec<f64>,
    pub original_idx: Vec<usize>,
}

impl BusData {
    pub fn new(n: usize) -> Self {
        Self {
            names: vec![String::new(); n],
            idtags: vec![String::new(); n],
            vnom: vec![1.0; n],
            vmin: vec![0.9; n],
            vmax: vec![1.1; n],
            vm_cost: vec![0.0; n],
            angle_min: vec![-6.28; n],
            angle_max: vec![6.28; n],
            v0: vec![Complex64::new(1.0, 0.0); n],
            active: vec![true; n],
            bus_types: vec![BusType::Pq; n],
            is_dc: vec![false; n],
            substations: vec![None; n],
            areas: vec![None; n],
            zones: vec![None; n],
            installed_power: vec![0.0; n],
            q_fixed: vec![0.0; n],
            q_shared_total: vec![0.0; n],
            srap_available_power: vec![0.0; n],
            original_idx: (0..n).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Indices of the buses of a given type.
    pub fn indices_of(&self, bus_type: BusType) -> Vec<usize> {
        self.bus_types
            .iter()
            .enumerate()
            .filter(|(_, &t)| t == bus_type)
            .map(|(i, _)| i)
            .collect()
    }

    /// Clear the accumulators filled during extraction.
    pub(crate) fn reset_accumulators(&mut self) {
        self.installed_power.iter_mut().for_each(|v| *v = 0.0);
        self.q_fixed.iter_mut().for_each(|v| *v = 0.0);
        self.q_shared_total.iter_mut().for_each(|v| *v = 0.0);
        self.srap_available_power.iter_mut().for_each(|v| *v = 0.0);
    }

    pub fn slice(&self, idx: &[usize]) -> Self {
        Self {
            names: pick(&self.names, idx),
            idtags: pick(&self.idtags, idx),
            vnom: pick(&self.vnom, idx),
            vmin: pick(&self.vmin, idx),
            vmax: pick(&self.vmax, idx),
            vm_cost: pick(&self.vm_cost, idx),
            angle_min: pick(&self.angle_min, idx),
            angle_max: pick(&self.angle_max, idx),
            v0: pick(&self.v0, idx),
            active: pick(&self.active, idx),
            bus_types: pick(&self.bus_types, idx),
            is_dc: pick(&self.is_dc, idx),
            substations: pick(&self.substations, idx),
            areas: pick(&self.areas, idx),
            zones: pick(&self.zones, idx),
            installed_power: pick(&self.installed_power, idx),
            q_fixed: pick(&self.q_fixed, idx),
            q_shared_total: pick(&self.q_shared_total, idx),
            srap_available_power: pick(&self.srap_available_power, idx),
            original_idx: pick(&self.original_idx, idx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_keeps_original_index() {
        let mut data = BusData::new(4);
        data.bus_types[2] = BusType::Slack;
        let island = data.slice(&[2, 3]);
        assert_eq!(island.len(), 2);
        assert_eq!(island.original_idx, vec![2, 3]);
        assert_eq!(island.indices_of(BusType::Slack), vec![0]);
    }
}
