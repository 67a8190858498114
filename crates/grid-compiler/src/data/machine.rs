use serde::Serialize;

use super::{pick, remap_all, remap_opt};

/// Rows shared by generators and batteries.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MachineData {
    pub names: Vec<String>,
    pub idtags: Vec<String>,
    pub bus_idx: Vec<usize>,
    pub active: Vec<bool>,
    pub dispatchable: Vec<bool>,
    pub controllable: Vec<bool>,
    /// Remote controlled bus, if any
    pub ctrl_bus: Vec<Option<usize>>,
    /// Active power setpoint (MW)
    pub p: Vec<f64>,
    pub pf: Vec<f64>,
    /// Voltage setpoint (p.u.)
    pub v: Vec<f64>,
    pub qmin: Vec<f64>,
    pub qmax: Vec<f64>,
    pub pmin: Vec<f64>,
    pub pmax: Vec<f64>,
    pub installed_p: Vec<f64>,
    /// Share of the bus reactive power assigned to this unit
    pub q_share: Vec<f64>,
    pub cost_0: Vec<f64>,
    pub cost_1: Vec<f64>,
    pub cost_2: Vec<f64>,
    pub startup_cost: Vec<f64>,
    pub shutdown_cost: Vec<f64>,
    pub ramp_up: Vec<f64>,
    pub ramp_down: Vec<f64>,
    pub min_time_up: Vec<f64>,
    pub min_time_down: Vec<f64>,
    pub r0: Vec<f64>,
    pub x0: Vec<f64>,
    pub r1: Vec<f64>,
    pub x1: Vec<f64>,
    pub r2: Vec<f64>,
    pub x2: Vec<f64>,
    pub srap_enabled: Vec<bool>,
    pub mttf: Vec<f64>,
    pub mttr: Vec<f64>,
    pub original_idx: Vec<usize>,
}

pub type GeneratorData = MachineData;

impl MachineData {
    pub fn new(n: usize) -> Self {
        Self {
            names: vec![String::new(); n],
            idtags: vec![String::new(); n],
            bus_idx: vec![0; n],
            active: vec![false; n],
            dispatchable: vec![false; n],
            controllable: vec![false; n],
            ctrl_bus: vec![None; n],
            p: vec![0.0; n],
            pf: vec![0.0; n],
            v: vec![1.0; n],
            qmin: vec![0.0; n],
            qmax: vec![0.0; n],
            pmin: vec![0.0; n],
            pmax: vec![0.0; n],
            installed_p: vec![0.0; n],
            q_share: vec![0.0; n],
            cost_0: vec![0.0; n],
            cost_1: vec![0.0; n],
            cost_2: vec![0.0; n],
            startup_cost: vec![0.0; n],
            shutdown_cost: vec![0.0; n],
            ramp_up: vec![0.0; n],
            ramp_down: vec![0.0; n],
            min_time_up: vec![0.0; n],
            min_time_down: vec![0.0; n],
            r0: vec![0.0; n],
            x0: vec![0.0; n],
            r1: vec![0.0; n],
            x1: vec![0.0; n],
            r2: vec![0.0; n],
            x2: vec![0.0; n],
            srap_enabled: vec![false; n],
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

    /// Active rows that regulate a voltage.
    pub fn is_voltage_controlled(&self, k: usize) -> bool {
        self.active[k] && self.controllable[k]
    }

    pub fn slice(&self, idx: &[usize], bus_map: &[Option<usize>]) -> Self {
        Self {
            names: pick(&self.names, idx),
            idtags: pick(&self.idtags, idx),
            bus_idx: remap_all(bus_map, &self.bus_idx, idx),
            active: pick(&self.active, idx),
            dispatchable: pick(&self.dispatchable, idx),
            controllable: pick(&self.controllable, idx),
            ctrl_bus: remap_opt(bus_map, &self.ctrl_bus, idx),
            p: pick(&self.p, idx),
            pf: pick(&self.pf, idx),
            v: pick(&self.v, idx),
            qmin: pick(&self.qmin, idx),
            qmax: pick(&self.qmax, idx),
            pmin: pick(&self.pmin, idx),
            pmax: pick(&self.pmax, idx),
            installed_p: pick(&self.installed_p, idx),
            q_share: pick(&self.q_share, idx),
            cost_0: pick(&self.cost_0, idx),
            cost_1: pick(&self.cost_1, idx),
            cost_2: pick(&self.cost_2, idx),
            startup_cost: pick(&self.startup_cost, idx),
            shutdown_cost: pick(&self.shutdown_cost, idx),
            ramp_up: pick(&self.ramp_up, idx),
            ramp_down: pick(&self.ramp_down, idx),
            min_time_up: pick(&self.min_time_up, idx),
            min_time_down: pick(&self.min_time_down, idx),
            r0: pick(&self.r0, idx),
            x0: pick(&self.x0, idx),
            r1: pick(&self.r1, idx),
            x1: pick(&self.x1, idx),
            r2: pick(&self.r2, idx),
            x2: pick(&self.x2, idx),
            srap_enabled: pick(&self.srap_enabled, idx),
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

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatteryData {
    pub units: MachineData,
    /// Nominal energy (MWh)
    pub enom: Vec<f64>,
    pub min_soc: Vec<f64>,
    pub max_soc: Vec<f64>,
    pub soc_0: Vec<f64>,
    /// Energy bounds (MWh)
    pub e_min: Vec<f64>,
    pub e_max: Vec<f64>,
    pub charge_efficiency: Vec<f64>,
    pub discharge_efficiency: Vec<f64>,
}

impl BatteryData {
    pub fn new(n: usize) -> Self {
        Self {
            units: MachineData::new(n),
            enom: vec![0.0; n],
            min_soc: vec![0.0; n],
            max_soc: vec![1.0; n],
            soc_0: vec![0.0; n],
            e_min: vec![0.0; n],
            e_max: vec![0.0; n],
            charge_efficiency: vec![1.0; n],
            discharge_efficiency: vec![1.0; n],
        }
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn slice(&self, idx: &[usize], bus_map: &[Option<usize>]) -> Self {
        Self {
            units: self.units.slice(idx, bus_map),
            enom: pick(&self.enom, idx),
            min_soc: pick(&self.min_soc, idx),
            max_soc: pick(&self.max_soc, idx),
            soc_0: pick(&self.soc_0, idx),
            e_min: pick(&self.e_min, idx),
            e_max: pick(&self.e_max, idx),
            charge_efficiency: pick(&self.charge_efficiency, idx),
            discharge_efficiency: pick(&self.discharge_efficiency, idx),
        }
    }

    pub(crate) fn remap_buses(&mut self, bus_map: &[usize]) {
        self.units.remap_buses(bus_map);
    }
}
