use grid_core::ExternalGridMode;
use num_complex::Complex64;
use serde::Serialize;

use super::{pick, remap_all, remap_opt};

/// Device family a load row was compiled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum LoadKind {
    #[default]
    Load,
    StaticGenerator,
    ExternalGrid,
    CurrentInjection,
}

/// ZIP injections. Values are in MVA at v = 1 p.u., with load convention
/// (positive S consumes).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadData {
    pub names: Vec<String>,
    pub idtags: Vec<String>,
    pub kinds: Vec<LoadKind>,
    pub bus_idx: Vec<usize>,
    pub active: Vec<bool>,
    pub s: Vec<Complex64>,
    pub i: Vec<Complex64>,
    pub y: Vec<Complex64>,
    /// Voltage setpoint of the rows that regulate their bus (PV external grids)
    pub vset: Vec<Option<f64>>,
    /// Operating mode of external grid rows
    pub ext_grid_mode: Vec<Option<ExternalGridMode>>,
    pub cost: Vec<f64>,
    pub mttf: Vec<f64>,
    pub mttr: Vec<f64>,
    pub original_idx: Vec<usize>,
}

impl LoadData {
    pub fn new(n: usize) -> Self {
        Self {
            names: vec![String::new(); n],
            idtags: vec![String::new(); n],
            kinds: vec![LoadKind::Load; n],
            bus_idx: vec![0; n],
            active: vec![false; n],
            s: vec![Complex64::new(0.0, 0.0); n],
            i: vec![Complex64::new(0.0, 0.0); n],
            y: vec![Complex64::new(0.0, 0.0); n],
            vset: vec![None; n],
            ext_grid_mode: vec![None; n],
            cost: vec![0.0; n],
            mttf: vec![0.0; n],
            mttr: vec![0.0; n],
            original_idx: (0..n).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn slice(&self, idx: &[usize], bus_map: &[Option<usize>]) -> Self {
        Self {
            names: pick(&self.names, idx),
            idtags: pick(&self.idtags, idx),
            kinds: pick(&self.kinds, idx),
            bus_idx: remap_all(bus_map, &self.bus_idx, idx),
            active: pick(&self.active, idx),
            s: pick(&self.s, idx),
            i: pick(&self.i, idx),
            y: pick(&self.y, idx),
            vset: pick(&self.vset, idx),
            ext_grid_mode: pick(&self.ext_grid_mode, idx),
            cost: pick(&self.cost, idx),
            mttf: pick(&self.mttf, idx),
            mttr: pick(&self.mttr, idx),
            original_idx: pick(&self.original_idx, idx),
        }
    }

    pub(crate) fn remap_buses(&mut self, bus_map: &[usize]) {
        for b in self.bus_idx.iter_mut() {
            *b = bus_map[*b];
        }
    }
}

/// Fixed and switched shunts. Admittance in MVA at v = 1 p.u.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ShuntData {
    pub names: Vec<String>,
    pub idtags: Vec<String>,
    pub bus_idx: Vec<usize>,
    pub active: Vec<bool>,
    pub y: Vec<Complex64>,
    pub controllable: Vec<bool>,
    pub ctrl_bus: Vec<Option<usize>>,
    pub qmin: Vec<f64>,
    pub qmax: Vec<f64>,
    pub vset: Vec<f64>,
    pub cost: Vec<f64>,
    pub mttf: Vec<f64>,
    pub mttr: Vec<f64>,
    pub original_idx: Vec<usize>,
}

impl ShuntData {
    pub fn new(n: usize) -> Self {
        Self {
            names: vec![String::new(); n],
            idtags: vec![String::new(); n],
            bus_idx: vec![0; n],
            active: vec![false; n],
            y: vec![Complex64::new(0.0, 0.0); n],
            controllable: vec![false; n],
            ctrl_bus: vec![None; n],
            qmin: vec![0.0; n],
            qmax: vec![0.0; n],
            vset: vec![1.0; n],
            cost: vec![0.0; n],
            mttf: vec![0.0; n],
            mttr: vec![0.0; n],
            original_idx: (0..n).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn slice(&self, idx: &[usize], bus_map: &[Option<usize>]) -> Self {
        Self {
            names: pick(&self.names, idx),
            idtags: pick(&self.idtags, idx),
            bus_idx: remap_all(bus_map, &self.bus_idx, idx),
            active: pick(&self.active, idx),
            y: pick(&self.y, idx),
            controllable: pick(&self.controllable, idx),
            ctrl_bus: remap_opt(bus_map, &self.ctrl_bus, idx),
            qmin: pick(&self.qmin, idx),
            qmax: pick(&self.qmax, idx),
            vset: pick(&self.vset, idx),
            cost: pick(&self.cost, idx),
            mttf: pick(&self.mttf, idx),
            mttr: pick(&self.mttr, idx),
            original_idx: pick(&self.original_idx, idx),
        }
    }

    pub(crate) fn remap_buses(&mut self, bus_map: &[usize]) {
        for b in self.bus_idx.iter_mut() {
            *b = bus_map[*b];
        }
        for c in self.ctrl_bus.iter_mut().flatten() {
            *c = bus_map[*c];
        }
    }
}
