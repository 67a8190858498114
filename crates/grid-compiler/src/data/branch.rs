use grid_core::{TapModuleControl, TapPhaseControl, WindingsConnection};
use serde::Serialize;

use super::{pick, remap_all, remap_opt};

/// Device family a branch row was compiled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum BranchKind {
    #[default]
    Line,
    DcLine,
    Transformer,
    Upfc,
    SeriesReactance,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BranchData {
    pub names: Vec<String>,
    pub idtags: Vec<String>,
    pub kinds: Vec<BranchKind>,
    pub active: Vec<bool>,
    pub f: Vec<usize>,
    pub t: Vec<usize>,

    // positive sequence
    pub r: Vec<f64>,
    pub x: Vec<f64>,
    pub g: Vec<f64>,
    pub b: Vec<f64>,
    // zero sequence
    pub r0: Vec<f64>,
    pub x0: Vec<f64>,
    pub g0: Vec<f64>,
    pub b0: Vec<f64>,
    // negative sequence
    pub r2: Vec<f64>,
    pub x2: Vec<f64>,
    pub g2: Vec<f64>,
    pub b2: Vec<f64>,

    /// Normal rating (MVA)
    pub rates: Vec<f64>,
    pub contingency_rates: Vec<f64>,
    pub protection_rates: Vec<f64>,
    pub overload_cost: Vec<f64>,
    pub mttf: Vec<f64>,
    pub mttr: Vec<f64>,

    pub tap_module: Vec<f64>,
    pub tap_module_min: Vec<f64>,
    pub tap_module_max: Vec<f64>,
    /// Phase shift (rad)
    pub tap_angle: Vec<f64>,
    pub tap_angle_min: Vec<f64>,
    pub tap_angle_max: Vec<f64>,
    pub tap_module_control: Vec<TapModuleControl>,
    pub tap_phase_control: Vec<TapPhaseControl>,
    /// Bus whose voltage the tap module regulates
    pub ctrl_bus: Vec<Option<usize>>,
    /// Voltage setpoint (p.u.)
    pub vset: Vec<f64>,
    /// Active and reactive flow setpoints (p.u.)
    pub pset: Vec<f64>,
    pub qset: Vec<f64>,
    /// Equivalent shunt susceptance added at the from side (p.u.)
    pub beq: Vec<f64>,
    pub virtual_tap_f: Vec<f64>,
    pub virtual_tap_t: Vec<f64>,
    pub conn: Vec<WindingsConnection>,

    pub is_dc: Vec<bool>,
    pub reducible: Vec<bool>,
    pub monitor_loading: Vec<bool>,
    pub contingency_enabled: Vec<bool>,
    pub original_idx: Vec<usize>,
}

impl BranchData {
    pub fn new(n: usize) -> Self {
        Self {
            names: vec![String::new(); n],
            idtags: vec![String::new(); n],
            kinds: vec![BranchKind::Line; n],
            active: vec![false; n],
            f: vec![0; n],
            t: vec![0; n],
            r: vec![0.0; n],
            x: vec![0.0; n],
            g: vec![0.0; n],
            b: vec![0.0; n],
            r0: vec![0.0; n],
            x0: vec![0.0; n],
            g0: vec![0.0; n],
            b0: vec![0.0; n],
            r2: vec![0.0; n],
            x2: vec![0.0; n],
            g2: vec![0.0; n],
            b2: vec![0.0; n],
            rates: vec![0.0; n],
            contingency_rates: vec![0.0; n],
            protection_rates: vec![0.0; n],
            overload_cost: vec![0.0; n],
            mttf: vec![0.0; n],
            mttr: vec![0.0; n],
            tap_module: vec![1.0; n],
            tap_module_min: vec![0.5; n],
            tap_module_max: vec![1.5; n],
            tap_angle: vec![0.0; n],
            tap_angle_min: vec![-6.28; n],
            tap_angle_max: vec![6.28; n],
            tap_module_control: vec![TapModuleControl::Fixed; n],
            tap_phase_control: vec![TapPhaseControl::Fixed; n],
            ctrl_bus: vec![None; n],
            vset: vec![1.0; n],
            pset: vec![0.0; n],
            qset: vec![0.0; n],
            beq: vec![0.0; n],
            virtual_tap_f: vec![1.0; n],
            virtual_tap_t: vec![1.0; n],
            conn: vec![WindingsConnection::GG; n],
            is_dc: vec![false; n],
            reducible: vec![false; n],
            monitor_loading: vec![false; n],
            contingency_enabled: vec![true; n],
            original_idx: (0..n).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Whether any branch regulates something with its taps.
    pub fn any_control(&self) -> bool {
        self.tap_module_control
            .iter()
            .any(|&m| m != TapModuleControl::Fixed)
            || self
                .tap_phase_control
                .iter()
                .any(|&p| p != TapPhaseControl::Fixed)
    }

    pub fn slice(&self, idx: &[usize], bus_map: &[Option<usize>]) -> Self {
        Self {
            names: pick(&self.names, idx),
            idtags: pick(&self.idtags, idx),
            kinds: pick(&self.kinds, idx),
            active: pick(&self.active, idx),
            f: remap_all(bus_map, &self.f, idx),
            t: remap_all(bus_map, &self.t, idx),
            r: pick(&self.r, idx),
            x: pick(&self.x, idx),
            g: pick(&self.g, idx),
            b: pick(&self.b, idx),
            r0: pick(&self.r0, idx),
            x0: pick(&self.x0, idx),
            g0: pick(&self.g0, idx),
            b0: pick(&self.b0, idx),
            r2: pick(&self.r2, idx),
            x2: pick(&self.x2, idx),
            g2: pick(&self.g2, idx),
            b2: pick(&self.b2, idx),
            rates: pick(&self.rates, idx),
            contingency_rates: pick(&self.contingency_rates, idx),
            protection_rates: pick(&self.protection_rates, idx),
            overload_cost: pick(&self.overload_cost, idx),
            mttf: pick(&self.mttf, idx),
            mttr: pick(&self.mttr, idx),
            tap_module: pick(&self.tap_module, idx),
            tap_module_min: pick(&self.tap_module_min, idx),
            tap_module_max: pick(&self.tap_module_max, idx),
            tap_angle: pick(&self.tap_angle, idx),
            tap_angle_min: pick(&self.tap_angle_min, idx),
            tap_angle_max: pick(&self.tap_angle_max, idx),
            tap_module_control: pick(&self.tap_module_control, idx),
            tap_phase_control: pick(&self.tap_phase_control, idx),
            ctrl_bus: remap_opt(bus_map, &self.ctrl_bus, idx),
            vset: pick(&self.vset, idx),
            pset: pick(&self.pset, idx),
            qset: pick(&self.qset, idx),
            beq: pick(&self.beq, idx),
            virtual_tap_f: pick(&self.virtual_tap_f, idx),
            virtual_tap_t: pick(&self.virtual_tap_t, idx),
            conn: pick(&self.conn, idx),
            is_dc: pick(&self.is_dc, idx),
            reducible: pick(&self.reducible, idx),
            monitor_loading: pick(&self.monitor_loading, idx),
            contingency_enabled: pick(&self.contingency_enabled, idx),
            original_idx: pick(&self.original_idx, idx),
        }
    }

    /// Point every bus reference through `bus_map` in place.
    pub(crate) fn remap_buses(&mut self, bus_map: &[usize]) {
        for f in self.f.iter_mut() {
            *f = bus_map[*f];
        }
        for t in self.t.iter_mut() {
            *t = bus_map[*t];
        }
        for c in self.ctrl_bus.iter_mut().flatten() {
            *c = bus_map[*c];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_translates_terminals() {
        let mut data = BranchData::new(3);
        data.f = vec![0, 2, 3];
        data.t = vec![1, 3, 1];
        data.ctrl_bus[1] = Some(3);

        let bus_map = [None, None, Some(0), Some(1)];
        let island = data.slice(&[1], &bus_map);
        assert_eq!(island.f, vec![0]);
        assert_eq!(island.t, vec![1]);
        assert_eq!(island.ctrl_bus, vec![Some(1)]);
        assert_eq!(island.original_idx, vec![1]);
    }

    #[test]
    fn test_any_control() {
        let mut data = BranchData::new(2);
        assert!(!data.any_control());
        data.tap_phase_control[1] = TapPhaseControl::Pf;
        assert!(data.any_control());
    }
}
