use grid_core::{ConverterControlType, HvdcControlMode};
use serde::Serialize;

use super::{pick, remap_all, remap_opt};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HvdcData {
    pub names: Vec<String>,
    pub idtags: Vec<String>,
    pub active: Vec<bool>,
    pub dispatchable: Vec<bool>,
    pub f: Vec<usize>,
    pub t: Vec<usize>,
    pub rates: Vec<f64>,
    pub contingency_rates: Vec<f64>,
    pub protection_rates: Vec<f64>,
    pub control_mode: Vec<HvdcControlMode>,
    /// Transfer setpoint (MW), from -> to
    pub pset: Vec<f64>,
    pub vset_f: Vec<f64>,
    pub vset_t: Vec<f64>,
    /// Nominal voltage of the terminals (kV)
    pub vnf: Vec<f64>,
    pub vnt: Vec<f64>,
    pub angle_droop: Vec<f64>,
    pub r: Vec<f64>,
    pub qmin_f: Vec<f64>,
    pub qmax_f: Vec<f64>,
    pub qmin_t: Vec<f64>,
    pub qmax_t: Vec<f64>,
    pub original_idx: Vec<usize>,
}

impl HvdcData {
    pub fn new(n: usize) -> Self {
        Self {
            names: vec![String::new(); n],
            idtags: vec![String::new(); n],
            active: vec![false; n],
            dispatchable: vec![false; n],
            f: vec![0; n],
            t: vec![0; n],
            rates: vec![0.0; n],
            contingency_rates: vec![0.0; n],
            protection_rates: vec![0.0; n],
            control_mode: vec![HvdcControlMode::Pset; n],
            pset: vec![0.0; n],
            vset_f: vec![1.0; n],
            vset_t: vec![1.0; n],
            vnf: vec![0.0; n],
            vnt: vec![0.0; n],
            angle_droop: vec![0.0; n],
            r: vec![0.0; n],
            qmin_f: vec![0.0; n],
            qmax_f: vec![0.0; n],
            qmin_t: vec![0.0; n],
            qmax_t: vec![0.0; n],
            original_idx: (0..n).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Power injected at each terminal bus (MW): -Pset at from, +Pset at to.
    pub fn terminal_injections(&self, nbus: usize) -> Vec<f64> {
        let mut p = vec![0.0; nbus];
        for k in 0..self.len() {
            if self.active[k] {
                p[self.f[k]] -= self.pset[k];
                p[self.t[k]] += self.pset[k];
            }
        }
        p
    }

    pub fn slice(&self, idx: &[usize], bus_map: &[Option<usize>]) -> Self {
        Self {
            names: pick(&self.names, idx),
            idtags: pick(&self.idtags, idx),
            active: pick(&self.active, idx),
            dispatchable: pick(&self.dispatchable, idx),
            f: remap_all(bus_map, &self.f, idx),
            t: remap_all(bus_map, &self.t, idx),
            rates: pick(&self.rates, idx),
            contingency_rates: pick(&self.contingency_rates, idx),
            protection_rates: pick(&self.protection_rates, idx),
            control_mode: pick(&self.control_mode, idx),
            pset: pick(&self.pset, idx),
            vset_f: pick(&self.vset_f, idx),
            vset_t: pick(&self.vset_t, idx),
            vnf: pick(&self.vnf, idx),
            vnt: pick(&self.vnt, idx),
            angle_droop: pick(&self.angle_droop, idx),
            r: pick(&self.r, idx),
            qmin_f: pick(&self.qmin_f, idx),
            qmax_f: pick(&self.qmax_f, idx),
            qmin_t: pick(&self.qmin_t, idx),
            qmax_t: pick(&self.qmax_t, idx),
            original_idx: pick(&self.original_idx, idx),
        }
    }

    pub(crate) fn remap_buses(&mut self, bus_map: &[usize]) {
        for f in self.f.iter_mut() {
            *f = bus_map[*f];
        }
        for t in self.t.iter_mut() {
            *t = bus_map[*t];
        }
    }
}

/// Voltage source converters: `f` is the DC side, `t` the AC side.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VscData {
    pub names: Vec<String>,
    pub idtags: Vec<String>,
    pub active: Vec<bool>,
    pub f: Vec<usize>,
    pub t: Vec<usize>,
    pub rates: Vec<f64>,
    pub contingency_rates: Vec<f64>,
    pub protection_rates: Vec<f64>,
    pub control1: Vec<ConverterControlType>,
    pub control2: Vec<ConverterControlType>,
    pub control1_val: Vec<f64>,
    pub control2_val: Vec<f64>,
    /// Regulated bus or branch of each control loop
    pub control1_bus: Vec<Option<usize>>,
    pub control1_branch: Vec<Option<usize>>,
    pub control2_bus: Vec<Option<usize>>,
    pub control2_branch: Vec<Option<usize>>,
    pub alpha1: Vec<f64>,
    pub alpha2: Vec<f64>,
    pub alpha3: Vec<f64>,
    pub kdp: Vec<f64>,
    pub original_idx: Vec<usize>,
}

impl VscData {
    pub fn new(n: usize) -> Self {
        Self {
            names: vec![String::new(); n],
            idtags: vec![String::new(); n],
            active: vec![false; n],
            f: vec![0; n],
            t: vec![0; n],
            rates: vec![0.0; n],
            contingency_rates: vec![0.0; n],
            protection_rates: vec![0.0; n],
            control1: vec![ConverterControlType::Pac; n],
            control2: vec![ConverterControlType::Qac; n],
            control1_val: vec![0.0; n],
            control2_val: vec![0.0; n],
            control1_bus: vec![None; n],
            control1_branch: vec![None; n],
            control2_bus: vec![None; n],
            control2_branch: vec![None; n],
            alpha1: vec![0.0; n],
            alpha2: vec![0.0; n],
            alpha3: vec![0.0; n],
            kdp: vec![0.0; n],
            original_idx: (0..n).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn slice(
        &self,
        idx: &[usize],
        bus_map: &[Option<usize>],
        branch_map: &[Option<usize>],
    ) -> Self {
        Self {
            names: pick(&self.names, idx),
            idtags: pick(&self.idtags, idx),
            active: pick(&self.active, idx),
            f: remap_all(bus_map, &self.f, idx),
            t: remap_all(bus_map, &self.t, idx),
            rates: pick(&self.rates, idx),
            contingency_rates: pick(&self.contingency_rates, idx),
            protection_rates: pick(&self.protection_rates, idx),
            control1: pick(&self.control1, idx),
            control2: pick(&self.control2, idx),
            control1_val: pick(&self.control1_val, idx),
            control2_val: pick(&self.control2_val, idx),
            control1_bus: remap_opt(bus_map, &self.control1_bus, idx),
            control1_branch: remap_opt(branch_map, &self.control1_branch, idx),
            control2_bus: remap_opt(bus_map, &self.control2_bus, idx),
            control2_branch: remap_opt(branch_map, &self.control2_branch, idx),
            alpha1: pick(&self.alpha1, idx),
            alpha2: pick(&self.alpha2, idx),
            alpha3: pick(&self.alpha3, idx),
            kdp: pick(&self.kdp, idx),
            original_idx: pick(&self.original_idx, idx),
        }
    }

    pub(crate) fn remap_buses(&mut self, bus_map: &[usize]) {
        for f in self.f.iter_mut() {
            *f = bus_map[*f];
        }
        for t in self.t.iter_mut() {
            *t = bus_map[*t];
        }
        for c in self
            .control1_bus
            .iter_mut()
            .chain(self.control2_bus.iter_mut())
            .flatten()
        {
            *c = bus_map[*c];
        }
    }
}
