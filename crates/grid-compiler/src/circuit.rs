//! Solver-ready representation of a network at one time step.
//!
//! A [`NumericalCircuit`] owns the struct-of-arrays data of every device family
//! and computes the derived quantities (connectivity, admittances, simulation
//! indices) on first access. Derived values are cached in `Option` fields; after
//! mutating any array directly, call [`NumericalCircuit::reset_calculations`]
//! before reading a derived value again.

use std::collections::{HashMap, HashSet};

use grid_core::{
    category, ConverterControlType, Diagnostics, ExternalGridMode, TapModuleControl,
};
use num_complex::Complex64;
use serde::Serialize;
use sprs::CsMat;
use tracing::debug;

use crate::admittance::{
    self, compute_admittances, compute_fast_decoupled, compute_linear_admittances,
    compute_split_admittances, AdmittanceMatrices, FastDecoupledAdmittances, LinearAdmittances,
    Sequence, SeriesShuntAdmittances,
};
use crate::bus_control::{
    seed_voltage, set_bus_control_voltage, ControlPriority, ControlRequest, VoltageControls,
};
use crate::connectivity::{aggregate, branch_connectivity, device_incidence, BranchConnectivity};
use crate::data::{
    BatteryData, BranchData, BusData, GeneratorData, HvdcData, LoadData, LoadKind, MachineData,
    ShuntData, VscData,
};
use crate::extract::{q_from_pf, FluidData};
use crate::indices::SimulationIndices;
use crate::options::CompileOptions;

/// Device family of an idtag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DeviceKind {
    Bus,
    Branch,
    Generator,
    Battery,
    Load,
    Shunt,
    Hvdc,
    Vsc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CircuitKind {
    Ac,
    Dc,
    Mixed,
}

/// Reactive limits above this magnitude mean "unbounded".
pub const UNBOUNDED_Q: f64 = 1e20;

#[derive(Debug, Clone, Default, Serialize)]
pub struct NumericalCircuit {
    pub nbus: usize,
    pub nbr: usize,
    pub ngen: usize,
    pub nbatt: usize,
    pub nload: usize,
    pub nshunt: usize,
    pub nhvdc: usize,
    pub nvsc: usize,

    /// System base (MVA)
    pub sbase: f64,
    pub t_idx: Option<usize>,
    pub options: CompileOptions,

    pub bus_data: BusData,
    pub branch_data: BranchData,
    pub generator_data: GeneratorData,
    pub battery_data: BatteryData,
    pub load_data: LoadData,
    pub shunt_data: ShuntData,
    pub hvdc_data: HvdcData,
    pub vsc_data: VscData,
    pub fluid_data: FluidData,

    /// Bus every bus was merged into by the topology reduction (identity
    /// when no reduction was performed)
    pub bus_map_arr: Vec<usize>,
    pub topology_performed: bool,
    pub any_pf_control: bool,
    /// Data-quality issues found while compiling
    pub diagnostics: Diagnostics,

    #[serde(skip)]
    connectivity: Option<BranchConnectivity>,
    #[serde(skip)]
    admittances: Option<AdmittanceMatrices>,
    #[serde(skip)]
    zero_sequence: Option<AdmittanceMatrices>,
    #[serde(skip)]
    negative_sequence: Option<AdmittanceMatrices>,
    #[serde(skip)]
    split_admittances: Option<SeriesShuntAdmittances>,
    #[serde(skip)]
    fast_decoupled: Option<FastDecoupledAdmittances>,
    #[serde(skip)]
    linear: Option<LinearAdmittances>,
    #[serde(skip)]
    simulation_indices: Option<SimulationIndices>,
    #[serde(skip)]
    idtag_index: Option<HashMap<String, (DeviceKind, usize)>>,
}

/// Primary arrays only; caches are ignored.
impl PartialEq for NumericalCircuit {
    fn eq(&self, other: &Self) -> bool {
        self.sbase == other.sbase
            && self.t_idx == other.t_idx
            && self.bus_data == other.bus_data
            && self.branch_data == other.branch_data
            && self.generator_data == other.generator_data
            && self.battery_data == other.battery_data
            && self.load_data == other.load_data
            && self.shunt_data == other.shunt_data
            && self.hvdc_data == other.hvdc_data
            && self.vsc_data == other.vsc_data
            && self.fluid_data == other.fluid_data
            && self.bus_map_arr == other.bus_map_arr
    }
}

/// Per-bus sum of the active rows of a device family.
fn per_bus<T, F>(nbus: usize, bus_idx: &[usize], active: &[bool], value: F) -> Vec<T>
where
    T: Copy + Default + std::ops::AddAssign + std::ops::Mul<f64, Output = T>,
    F: Fn(usize) -> T,
{
    let values: Vec<T> = (0..bus_idx.len()).map(value).collect();
    aggregate(&device_incidence(bus_idx, active, nbus), &values)
}

fn bus_shunt_admittance_pu(shunts: &ShuntData, nbus: usize, sbase: f64) -> Vec<Complex64> {
    per_bus(nbus, &shunts.bus_idx, &shunts.active, |k| shunts.y[k] / sbase)
}

fn bus_power_injections(
    nbus: usize,
    gens: &MachineData,
    batteries: &MachineData,
    loads: &LoadData,
) -> Vec<Complex64> {
    let mut s = per_bus(nbus, &loads.bus_idx, &loads.active, |k| -loads.s[k]);
    for units in [gens, batteries] {
        for (k, &bus) in units.bus_idx.iter().enumerate() {
            if units.active[k] {
                s[bus] += Complex64::new(units.p[k], 0.0);
            }
        }
    }
    s
}

impl NumericalCircuit {
    /// Empty circuit on the given base; the compiler fills the arrays.
    pub fn new(sbase: f64, t_idx: Option<usize>, options: CompileOptions) -> Self {
        Self {
            sbase,
            t_idx,
            options,
            ..Self::default()
        }
    }

    /// Refresh the element counts from the array lengths.
    pub fn recount(&mut self) {
        self.nbus = self.bus_data.len();
        self.nbr = self.branch_data.len();
        self.ngen = self.generator_data.len();
        self.nbatt = self.battery_data.len();
        self.nload = self.load_data.len();
        self.nshunt = self.shunt_data.len();
        self.nhvdc = self.hvdc_data.len();
        self.nvsc = self.vsc_data.len();
        if self.bus_map_arr.len() != self.nbus {
            self.bus_map_arr = (0..self.nbus).collect();
        }
    }

    /// Drop every cached derived quantity. Primary arrays are untouched.
    pub fn reset_calculations(&mut self) {
        self.connectivity = None;
        self.admittances = None;
        self.zero_sequence = None;
        self.negative_sequence = None;
        self.split_admittances = None;
        self.fast_decoupled = None;
        self.linear = None;
        self.simulation_indices = None;
        self.idtag_index = None;
    }

    /// Re-derive counts, bus accumulators, reactive shares and the voltage
    /// guess from the current device arrays.
    ///
    /// Voltage controls are replayed in extraction order. Bus types are only
    /// promoted, never demoted, so a controller switched off after
    /// compilation leaves its bus type in place. Conflicts found while
    /// replaying are returned rather than appended to
    /// [`NumericalCircuit::diagnostics`].
    pub fn consolidate(&mut self) -> Diagnostics {
        self.recount();
        let mut diag = Diagnostics::new();
        let stored_guess = self.options.use_stored_guess;

        let bus = &mut self.bus_data;
        bus.reset_accumulators();
        if !stored_guess {
            bus.v0.iter_mut().for_each(|v| *v = Complex64::new(1.0, 0.0));
        }
        let mut controls = VoltageControls::new(self.nbus);

        let machine_sets = [
            (&self.generator_data, ControlPriority::Generator),
            (&self.battery_data.units, ControlPriority::Battery),
        ];
        for (units, priority) in machine_sets {
            for k in 0..units.len() {
                if !units.active[k] {
                    continue;
                }
                let i = units.bus_idx[k];
                bus.installed_power[i] += units.installed_p[k];
                if units.srap_enabled[k] && units.p[k] > 0.0 {
                    bus.srap_available_power[i] += units.p[k];
                }
                if units.controllable[k] {
                    bus.q_shared_total[i] += units.qmax[k];
                    let request =
                        ControlRequest::local(i, units.v[k], priority).with_remote(units.ctrl_bus[k]);
                    set_bus_control_voltage(bus, &mut controls, &request, stored_guess, &mut diag);
                } else {
                    bus.q_fixed[i] += q_from_pf(units.p[k], units.pf[k]);
                }
            }
        }

        let shunts = &self.shunt_data;
        for k in (0..shunts.len()).filter(|&k| shunts.active[k]) {
            let i = shunts.bus_idx[k];
            if shunts.controllable[k] {
                bus.q_shared_total[i] += shunts.qmax[k];
                let request = ControlRequest::local(i, shunts.vset[k], ControlPriority::Shunt)
                    .with_remote(shunts.ctrl_bus[k]);
                set_bus_control_voltage(bus, &mut controls, &request, stored_guess, &mut diag);
            } else {
                bus.q_fixed[i] += shunts.y[k].im;
            }
        }

        let loads = &self.load_data;
        for k in (0..loads.len()).filter(|&k| loads.active[k]) {
            let i = loads.bus_idx[k];
            match (loads.kinds[k], loads.ext_grid_mode[k], loads.vset[k]) {
                (LoadKind::ExternalGrid, Some(ExternalGridMode::Pv), Some(vm)) => {
                    let request = ControlRequest::local(i, vm, ControlPriority::ExternalGrid);
                    set_bus_control_voltage(bus, &mut controls, &request, stored_guess, &mut diag);
                }
                (LoadKind::ExternalGrid, Some(ExternalGridMode::Vd | ExternalGridMode::Pv), _) => {}
                (LoadKind::CurrentInjection, _, _) => {}
                _ => bus.q_fixed[i] -= loads.s[k].im,
            }
        }

        let branches = &self.branch_data;
        if !stored_guess {
            for k in 0..branches.len() {
                if branches.active[k]
                    && branches.tap_module_control[k] == TapModuleControl::Vm
                    && branches.vset[k] > 0.0
                {
                    if let Some(i) = branches.ctrl_bus[k] {
                        seed_voltage(
                            bus,
                            &mut controls,
                            i,
                            branches.vset[k],
                            ControlPriority::Branch,
                            &mut diag,
                        );
                    }
                }
            }
        }

        let hvdc = &self.hvdc_data;
        for k in (0..hvdc.len()).filter(|&k| hvdc.active[k]) {
            for (i, vset) in [(hvdc.f[k], hvdc.vset_f[k]), (hvdc.t[k], hvdc.vset_t[k])] {
                let request = ControlRequest::local(i, vset, ControlPriority::Hvdc);
                set_bus_control_voltage(bus, &mut controls, &request, stored_guess, &mut diag);
            }
        }

        let vsc = &self.vsc_data;
        for k in (0..vsc.len()).filter(|&k| vsc.active[k]) {
            let loops = [
                (vsc.control1[k], vsc.control1_bus[k], vsc.control1_val[k]),
                (vsc.control2[k], vsc.control2_bus[k], vsc.control2_val[k]),
            ];
            for (control, target, value) in loops {
                if let (ConverterControlType::VmAc, Some(i)) = (control, target) {
                    let request = ControlRequest::local(i, value, ControlPriority::Vsc);
                    set_bus_control_voltage(bus, &mut controls, &request, stored_guess, &mut diag);
                }
            }
        }

        self.update_reactive_shares();
        self.any_pf_control = self.nvsc > 0 || self.branch_data.any_control();
        self.reset_calculations();
        debug!(
            nbus = self.nbus,
            nbr = self.nbr,
            conflicts = diag.error_count(),
            "circuit consolidated"
        );
        diag
    }

    /// `q_share = qmax / q_shared_total` for the voltage-controlling machines.
    pub(crate) fn update_reactive_shares(&mut self) {
        let totals = &self.bus_data.q_shared_total;
        for units in [&mut self.generator_data, &mut self.battery_data.units] {
            for k in 0..units.len() {
                let total = totals[units.bus_idx[k]];
                units.q_share[k] = if units.is_voltage_controlled(k) && total != 0.0 {
                    units.qmax[k] / total
                } else {
                    0.0
                };
            }
        }
    }

    // ------------------------------------------------------------------
    // Injections
    // ------------------------------------------------------------------

    /// Complex power injected at every bus (MW, Mvar), generation positive.
    ///
    /// Generators and batteries inject their active power; load-like rows
    /// inject `-S`. HVDC transfers are not included.
    pub fn power_injections(&self) -> Vec<Complex64> {
        bus_power_injections(
            self.nbus,
            &self.generator_data,
            &self.battery_data.units,
            &self.load_data,
        )
    }

    pub fn power_injections_pu(&self) -> Vec<Complex64> {
        self.power_injections()
            .into_iter()
            .map(|s| s / self.sbase)
            .collect()
    }

    pub fn current_injections_pu(&self) -> Vec<Complex64> {
        let loads = &self.load_data;
        per_bus(self.nbus, &loads.bus_idx, &loads.active, |k| -loads.i[k] / self.sbase)
    }

    /// Constant-impedance part of the loads, as admittance per bus (p.u.).
    pub fn admittance_injections_pu(&self) -> Vec<Complex64> {
        let loads = &self.load_data;
        per_bus(self.nbus, &loads.bus_idx, &loads.active, |k| loads.y[k] / self.sbase)
    }

    pub fn shunt_admittance_pu(&self) -> Vec<Complex64> {
        bus_shunt_admittance_pu(&self.shunt_data, self.nbus, self.sbase)
    }

    /// Per-bus reactive limits `(qmax, qmin)` in p.u.
    ///
    /// Buses without any reactive resource get `+/-1e20`.
    pub fn reactive_power_limits(&self) -> (Vec<f64>, Vec<f64>) {
        let nbus = self.nbus;
        let mut qmax = vec![0.0; nbus];
        let mut qmin = vec![0.0; nbus];

        for units in [&self.generator_data, &self.battery_data.units] {
            for k in (0..units.len()).filter(|&k| units.active[k]) {
                qmax[units.bus_idx[k]] += units.qmax[k];
                qmin[units.bus_idx[k]] += units.qmin[k];
            }
        }
        let hvdc = &self.hvdc_data;
        for k in (0..hvdc.len()).filter(|&k| hvdc.active[k]) {
            qmax[hvdc.f[k]] += hvdc.qmax_f[k];
            qmin[hvdc.f[k]] += hvdc.qmin_f[k];
            qmax[hvdc.t[k]] += hvdc.qmax_t[k];
            qmin[hvdc.t[k]] += hvdc.qmin_t[k];
        }
        let shunts = &self.shunt_data;
        for k in (0..shunts.len()).filter(|&k| shunts.active[k] && shunts.controllable[k]) {
            qmax[shunts.bus_idx[k]] += shunts.qmax[k];
            qmin[shunts.bus_idx[k]] += shunts.qmin[k];
        }

        let qmax = qmax
            .into_iter()
            .map(|q| if q == 0.0 { UNBOUNDED_Q } else { q / self.sbase })
            .collect();
        let qmin = qmin
            .into_iter()
            .map(|q| if q == 0.0 { -UNBOUNDED_Q } else { q / self.sbase })
            .collect();
        (qmax, qmin)
    }

    // ------------------------------------------------------------------
    // Cached derived quantities
    // ------------------------------------------------------------------

    pub fn connectivity(&mut self) -> &BranchConnectivity {
        let (branches, active) = (&self.branch_data, &self.bus_data.active);
        self.connectivity
            .get_or_insert_with(|| branch_connectivity(branches, active))
    }

    /// Positive sequence admittances.
    pub fn admittances(&mut self) -> &AdmittanceMatrices {
        let (branches, shunts, active) = (&self.branch_data, &self.shunt_data, &self.bus_data.active);
        let (nbus, sbase) = (self.nbus, self.sbase);
        self.admittances.get_or_insert_with(|| {
            let yshunt = bus_shunt_admittance_pu(shunts, nbus, sbase);
            compute_admittances(branches, &yshunt, active, Sequence::Positive)
        })
    }

    pub fn sequence_admittances(&mut self, sequence: Sequence) -> &AdmittanceMatrices {
        let (branches, shunts, active) = (&self.branch_data, &self.shunt_data, &self.bus_data.active);
        let (nbus, sbase) = (self.nbus, self.sbase);
        let build = || {
            let yshunt = bus_shunt_admittance_pu(shunts, nbus, sbase);
            compute_admittances(branches, &yshunt, active, sequence)
        };
        match sequence {
            Sequence::Positive => self.admittances.get_or_insert_with(build),
            Sequence::Negative => self.negative_sequence.get_or_insert_with(build),
            Sequence::Zero => self.zero_sequence.get_or_insert_with(build),
        }
    }

    pub fn split_admittances(&mut self) -> &SeriesShuntAdmittances {
        let (branches, shunts, active) = (&self.branch_data, &self.shunt_data, &self.bus_data.active);
        let (nbus, sbase) = (self.nbus, self.sbase);
        self.split_admittances.get_or_insert_with(|| {
            let yshunt = bus_shunt_admittance_pu(shunts, nbus, sbase);
            compute_split_admittances(branches, &yshunt, active)
        })
    }

    pub fn fast_decoupled_admittances(&mut self) -> &FastDecoupledAdmittances {
        let (branches, shunts, active) = (&self.branch_data, &self.shunt_data, &self.bus_data.active);
        let (nbus, sbase) = (self.nbus, self.sbase);
        self.fast_decoupled.get_or_insert_with(|| {
            let yshunt = bus_shunt_admittance_pu(shunts, nbus, sbase);
            compute_fast_decoupled(branches, &yshunt, active)
        })
    }

    pub fn linear_admittances(&mut self) -> &LinearAdmittances {
        let (branches, active) = (&self.branch_data, &self.bus_data.active);
        self.linear
            .get_or_insert_with(|| compute_linear_admittances(branches, active))
    }

    pub fn simulation_indices(&mut self) -> &SimulationIndices {
        let nbus = self.nbus;
        let (gens, batteries, loads) = (
            &self.generator_data,
            &self.battery_data.units,
            &self.load_data,
        );
        let (types, branches) = (&self.bus_data.bus_types, &self.branch_data);
        let force = self.options.force_only_pq_pv_vd_types;
        self.simulation_indices.get_or_insert_with(|| {
            let pbus: Vec<f64> = bus_power_injections(nbus, gens, batteries, loads)
                .iter()
                .map(|s| s.re)
                .collect();
            SimulationIndices::new(types, &pbus, branches, force)
        })
    }

    /// `Bbus[no_slack, no_slack]`.
    pub fn b_red(&mut self) -> CsMat<f64> {
        let no_slack = self.simulation_indices().no_slack.clone();
        admittance::b_red(&self.linear_admittances().bbus, &no_slack)
    }

    /// `Bbus[no_slack, vd]`.
    pub fn b_slack(&mut self) -> CsMat<f64> {
        let indices = self.simulation_indices();
        let (no_slack, vd) = (indices.no_slack.clone(), indices.vd.clone());
        admittance::b_slack(&self.linear_admittances().bbus, &no_slack, &vd)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    fn build_idtag_index(&self) -> HashMap<String, (DeviceKind, usize)> {
        let families: [(&[String], DeviceKind); 8] = [
            (self.bus_data.idtags.as_slice(), DeviceKind::Bus),
            (self.branch_data.idtags.as_slice(), DeviceKind::Branch),
            (self.generator_data.idtags.as_slice(), DeviceKind::Generator),
            (self.battery_data.units.idtags.as_slice(), DeviceKind::Battery),
            (self.load_data.idtags.as_slice(), DeviceKind::Load),
            (self.shunt_data.idtags.as_slice(), DeviceKind::Shunt),
            (self.hvdc_data.idtags.as_slice(), DeviceKind::Hvdc),
            (self.vsc_data.idtags.as_slice(), DeviceKind::Vsc),
        ];
        let mut index = HashMap::new();
        for (idtags, kind) in families {
            for (k, tag) in idtags.iter().enumerate() {
                index.entry(tag.clone()).or_insert((kind, k));
            }
        }
        index
    }

    /// Device family and row of `idtag`. The first occurrence wins.
    pub fn query_idtag(&mut self, idtag: &str) -> Option<(DeviceKind, usize)> {
        if self.idtag_index.is_none() {
            self.idtag_index = Some(self.build_idtag_index());
        }
        self.idtag_index
            .as_ref()
            .and_then(|index| index.get(idtag).copied())
    }

    pub(crate) fn set_device_active(&mut self, kind: DeviceKind, k: usize, active: bool) {
        match kind {
            DeviceKind::Bus => self.bus_data.active[k] = active,
            DeviceKind::Branch => self.branch_data.active[k] = active,
            DeviceKind::Generator => self.generator_data.active[k] = active,
            DeviceKind::Battery => self.battery_data.units.active[k] = active,
            DeviceKind::Load => self.load_data.active[k] = active,
            DeviceKind::Shunt => self.shunt_data.active[k] = active,
            DeviceKind::Hvdc => self.hvdc_data.active[k] = active,
            DeviceKind::Vsc => self.vsc_data.active[k] = active,
        }
    }

    pub fn is_dc(&self) -> CircuitKind {
        let dc = self.bus_data.is_dc.iter().filter(|&&d| d).count();
        if dc == 0 {
            CircuitKind::Ac
        } else if dc == self.nbus {
            CircuitKind::Dc
        } else {
            CircuitKind::Mixed
        }
    }

    /// Sum of the ratings (MW) of the active branches and HVDC links joining
    /// the bus sets `area_from` and `area_to`.
    pub fn structural_ntc(&self, area_from: &[usize], area_to: &[usize]) -> f64 {
        let a: HashSet<usize> = area_from.iter().copied().collect();
        let b: HashSet<usize> = area_to.iter().copied().collect();
        let crosses =
            |f: usize, t: usize| (a.contains(&f) && b.contains(&t)) || (b.contains(&f) && a.contains(&t));

        let br = &self.branch_data;
        let branch_sum: f64 = (0..br.len())
            .filter(|&k| br.active[k] && crosses(br.f[k], br.t[k]))
            .map(|k| br.rates[k])
            .sum();
        let hvdc = &self.hvdc_data;
        let hvdc_sum: f64 = (0..hvdc.len())
            .filter(|&k| hvdc.active[k] && crosses(hvdc.f[k], hvdc.t[k]))
            .map(|k| hvdc.rates[k])
            .sum();
        branch_sum + hvdc_sum
    }

    /// Element-wise differences against `other`, as comparison errors.
    pub fn compare(&self, other: &NumericalCircuit, tol: f64) -> Diagnostics {
        let mut diag = Diagnostics::new();

        let counts = [
            ("nbus", self.nbus, other.nbus),
            ("nbr", self.nbr, other.nbr),
            ("ngen", self.ngen, other.ngen),
            ("nbatt", self.nbatt, other.nbatt),
            ("nload", self.nload, other.nload),
            ("nshunt", self.nshunt, other.nshunt),
            ("nhvdc", self.nhvdc, other.nhvdc),
            ("nvsc", self.nvsc, other.nvsc),
        ];
        let mut shape_mismatch = false;
        for (what, a, b) in counts {
            if a != b {
                shape_mismatch = true;
                diag.add_error_with_values(
                    category::COMPARISON,
                    "Element count mismatch",
                    what,
                    a as f64,
                    b as f64,
                );
            }
        }
        if shape_mismatch {
            return diag;
        }

        for i in 0..self.nbus {
            if self.bus_data.bus_types[i] != other.bus_data.bus_types[i] {
                diag.add_error_with_entity(
                    category::COMPARISON,
                    "Bus type mismatch",
                    &self.bus_data.names[i],
                );
            }
            if self.bus_data.active[i] != other.bus_data.active[i] {
                diag.add_error_with_entity(
                    category::COMPARISON,
                    "Bus active mismatch",
                    &self.bus_data.names[i],
                );
            }
        }

        let mut real = |what: &str, names: &[String], a: &[f64], b: &[f64]| {
            for k in 0..a.len() {
                if (a[k] - b[k]).abs() > tol {
                    diag.add_error_with_values(category::COMPARISON, what, &names[k], a[k], b[k]);
                }
            }
        };
        let vm = |v: &[Complex64]| v.iter().map(|v| v.norm()).collect::<Vec<_>>();
        real(
            "Bus voltage guess mismatch",
            &self.bus_data.names,
            &vm(&self.bus_data.v0),
            &vm(&other.bus_data.v0),
        );
        let (sb, ob) = (&self.branch_data, &other.branch_data);
        real("Branch R mismatch", &sb.names, &sb.r, &ob.r);
        real("Branch X mismatch", &sb.names, &sb.x, &ob.x);
        real("Branch B mismatch", &sb.names, &sb.b, &ob.b);
        real("Branch rate mismatch", &sb.names, &sb.rates, &ob.rates);
        real("Tap module mismatch", &sb.names, &sb.tap_module, &ob.tap_module);
        real("Tap angle mismatch", &sb.names, &sb.tap_angle, &ob.tap_angle);
        let (sg, og) = (&self.generator_data, &other.generator_data);
        real("Generator P mismatch", &sg.names, &sg.p, &og.p);
        real("Generator Vset mismatch", &sg.names, &sg.v, &og.v);
        let (sl, ol) = (&self.load_data, &other.load_data);
        let re = |v: &[Complex64]| v.iter().map(|v| v.re).collect::<Vec<_>>();
        let im = |v: &[Complex64]| v.iter().map(|v| v.im).collect::<Vec<_>>();
        real("Load P mismatch", &sl.names, &re(&sl.s), &re(&ol.s));
        real("Load Q mismatch", &sl.names, &im(&sl.s), &im(&ol.s));
        let (sh, oh) = (&self.hvdc_data, &other.hvdc_data);
        real("HVDC Pset mismatch", &sh.names, &sh.pset, &oh.pset);

        diag
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::BusType;

    /// Two buses, one line, a generator at bus 0 and a load at bus 1.
    fn two_bus() -> NumericalCircuit {
        let mut nc = NumericalCircuit::new(100.0, None, CompileOptions::default());
        nc.bus_data = BusData::new(2);
        nc.bus_data.names = vec!["B0".into(), "B1".into()];
        nc.bus_data.idtags = vec!["b0".into(), "b1".into()];
        nc.bus_data.active = vec![true, true];
        nc.bus_data.bus_types[0] = BusType::Slack;

        nc.branch_data = BranchData::new(1);
        nc.branch_data.idtags[0] = "l1".into();
        nc.branch_data.active[0] = true;
        nc.branch_data.t[0] = 1;
        nc.branch_data.x[0] = 0.1;
        nc.branch_data.rates[0] = 80.0;

        nc.generator_data = MachineData::new(1);
        nc.generator_data.idtags[0] = "g1".into();
        nc.generator_data.active[0] = true;
        nc.generator_data.controllable[0] = true;
        nc.generator_data.p[0] = 50.0;
        nc.generator_data.v[0] = 1.02;
        nc.generator_data.qmax[0] = 30.0;
        nc.generator_data.qmin[0] = -30.0;
        nc.generator_data.installed_p[0] = 100.0;

        nc.load_data = LoadData::new(1);
        nc.load_data.idtags[0] = "ld1".into();
        nc.load_data.active[0] = true;
        nc.load_data.bus_idx[0] = 1;
        nc.load_data.s[0] = Complex64::new(40.0, 10.0);

        nc.recount();
        nc
    }

    #[test]
    fn test_power_injections() {
        let nc = two_bus();
        let s = nc.power_injections();
        assert_eq!(s, vec![Complex64::new(50.0, 0.0), Complex64::new(-40.0, -10.0)]);
        assert_eq!(nc.power_injections_pu()[1], Complex64::new(-0.4, -0.1));
    }

    #[test]
    fn test_consolidate_rederives_accumulators() {
        let mut nc = two_bus();
        let diag = nc.consolidate();
        assert!(diag.is_empty());
        assert_eq!(nc.bus_data.installed_power, vec![100.0, 0.0]);
        assert_eq!(nc.bus_data.q_shared_total, vec![30.0, 0.0]);
        assert_eq!(nc.bus_data.q_fixed, vec![0.0, -10.0]);
        assert_eq!(nc.generator_data.q_share, vec![1.0]);
        // slack keeps its type, its voltage is seeded
        assert_eq!(nc.bus_data.bus_types[0], BusType::Slack);
        assert_eq!(nc.bus_data.v0[0], Complex64::new(1.02, 0.0));
        assert!(!nc.any_pf_control);
    }

    #[test]
    fn test_cache_invalidation() {
        let mut nc = two_bus();
        assert_eq!(nc.admittances().ybus.nnz(), 4);
        nc.branch_data.active[0] = false;
        // stale until reset
        assert_eq!(nc.admittances().ybus.nnz(), 4);
        nc.reset_calculations();
        assert_eq!(nc.admittances().ybus.nnz(), 0);
        assert_eq!(nc.connectivity().cf.nnz(), 0);
    }

    #[test]
    fn test_indices_and_linear_reduction() {
        let mut nc = two_bus();
        let idx = nc.simulation_indices().clone();
        assert_eq!(idx.vd, vec![0]);
        assert_eq!(idx.pq, vec![1]);
        let bred = nc.b_red();
        assert_eq!(bred.shape(), (1, 1));
        approx::assert_relative_eq!(*bred.get(0, 0).unwrap(), 10.0, epsilon = 1e-9);
        assert_eq!(nc.b_slack().shape(), (1, 1));
    }

    #[test]
    fn test_reactive_limits_and_queries() {
        let mut nc = two_bus();
        let (qmax, qmin) = nc.reactive_power_limits();
        assert_eq!(qmax, vec![0.3, UNBOUNDED_Q]);
        assert_eq!(qmin, vec![-0.3, -UNBOUNDED_Q]);

        assert_eq!(nc.query_idtag("g1"), Some((DeviceKind::Generator, 0)));
        assert_eq!(nc.query_idtag("ld1"), Some((DeviceKind::Load, 0)));
        assert_eq!(nc.query_idtag("nope"), None);
        assert_eq!(nc.is_dc(), CircuitKind::Ac);
        assert_eq!(nc.structural_ntc(&[0], &[1]), 80.0);
        assert_eq!(nc.structural_ntc(&[0], &[0]), 0.0);
    }

    #[test]
    fn test_compare() {
        let a = two_bus();
        let mut b = two_bus();
        assert!(a.compare(&b, 1e-9).is_empty());
        assert!(a == b);

        b.generator_data.p[0] = 55.0;
        b.bus_data.bus_types[1] = BusType::Pv;
        let diag = a.compare(&b, 1e-9);
        assert_eq!(diag.error_count(), 2);
        assert_eq!(diag.issues_matching("Generator P").count(), 1);
    }
}
