//! Device descriptions that live on the network graph.
//!
//! Buses and single-terminal devices are graph nodes; two-terminal devices
//! (lines, transformers, DC links, converters) are graph edges. Quantities
//! that may change over time are [`Profile`]s. Powers are in MW / Mvar,
//! impedances in per-unit on the system base, voltages setpoints in per-unit.

use serde::{Deserialize, Serialize};

use crate::profile::Profile;
use crate::units::{Kilovolts, MegavoltAmperes};
use crate::{
    BatteryId, BranchId, BusId, FluidInjectionId, FluidNodeId, FluidPathId, GenId, HvdcId,
    LoadId, ShuntId, VscId,
};

// ============================================================================
// Buses
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bus {
    pub id: BusId,
    pub idtag: String,
    pub name: String,
    /// Nominal voltage
    pub vnom: Kilovolts,
    /// Voltage limits in per-unit
    pub vmin: f64,
    pub vmax: f64,
    /// Voltage deviation cost for OPF
    pub vm_cost: f64,
    /// Angle limits in radians
    pub angle_min: f64,
    pub angle_max: f64,
    /// Stored voltage guess (magnitude p.u., angle rad)
    pub vm0: f64,
    pub va0: f64,
    pub active: Profile<bool>,
    pub is_slack: bool,
    pub is_dc: bool,
    pub substation: Option<String>,
    pub area: Option<String>,
    pub zone: Option<String>,
}

impl Default for Bus {
    fn default() -> Self {
        Self {
            id: BusId::new(0),
            idtag: String::new(),
            name: String::new(),
            vnom: Kilovolts(10.0),
            vmin: 0.9,
            vmax: 1.1,
            vm_cost: 0.0,
            angle_min: -6.28,
            angle_max: 6.28,
            vm0: 1.0,
            va0: 0.0,
            active: Profile::fixed(true),
            is_slack: false,
            is_dc: false,
            substation: None,
            area: None,
            zone: None,
        }
    }
}

impl Bus {
    pub fn new(id: BusId, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id,
            idtag: name.clone(),
            name,
            ..Self::default()
        }
    }

    pub fn with_vnom(mut self, kv: f64) -> Self {
        self.vnom = Kilovolts(kv);
        self
    }

    pub fn as_slack(mut self) -> Self {
        self.is_slack = true;
        self
    }

    pub fn as_dc(mut self) -> Self {
        self.is_dc = true;
        self
    }
}

// ============================================================================
// Generators and batteries
// ============================================================================

/// Reactive capability curve as (p, qmin, qmax) points sorted by p.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReactiveCapabilityCurve {
    pub points: Vec<(f64, f64, f64)>,
}

impl ReactiveCapabilityCurve {
    pub fn new(mut points: Vec<(f64, f64, f64)>) -> Self {
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { points }
    }

    /// Interpolated (qmin, qmax) at `p`; clamps outside the curve.
    pub fn limits_at(&self, p: f64) -> (f64, f64) {
        let pts = &self.points;
        match pts.len() {
            0 => (0.0, 0.0),
            1 => (pts[0].1, pts[0].2),
            n => {
                if p <= pts[0].0 {
                    return (pts[0].1, pts[0].2);
                }
                if p >= pts[n - 1].0 {
                    return (pts[n - 1].1, pts[n - 1].2);
                }
                for w in pts.windows(2) {
                    let (p0, qmin0, qmax0) = w[0];
                    let (p1, qmin1, qmax1) = w[1];
                    if p >= p0 && p <= p1 {
                        let t = if p1 > p0 { (p - p0) / (p1 - p0) } else { 0.0 };
                        return (qmin0 + t * (qmin1 - qmin0), qmax0 + t * (qmax1 - qmax0));
                    }
                }
                (pts[n - 1].1, pts[n - 1].2)
            }
        }
    }
}

/// Electrical and economic parameters shared by generators and batteries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Machine {
    pub idtag: String,
    pub name: String,
    pub bus: BusId,
    pub active: Profile<bool>,
    /// Active power setpoint (MW)
    pub p: Profile<f64>,
    /// Power factor, used when not voltage controlled
    pub pf: Profile<f64>,
    /// Voltage setpoint (p.u.)
    pub vset: Profile<f64>,
    pub is_controlled: bool,
    /// Remote bus whose voltage is regulated, if not the own bus
    pub control_bus: Option<BusId>,
    pub snom: MegavoltAmperes,
    pub pmin: f64,
    pub pmax: f64,
    pub qmin: f64,
    pub qmax: f64,
    pub q_curve: Option<ReactiveCapabilityCurve>,
    /// Sequence impedances of the machine (p.u.)
    pub r0: f64,
    pub x0: f64,
    pub r1: f64,
    pub x1: f64,
    pub r2: f64,
    pub x2: f64,
    pub cost0: Profile<f64>,
    pub cost1: Profile<f64>,
    pub cost2: Profile<f64>,
    pub startup_cost: f64,
    pub shutdown_cost: f64,
    /// MW/min
    pub ramp_up: f64,
    pub ramp_down: f64,
    /// Hours
    pub min_time_up: f64,
    pub min_time_down: f64,
    pub dispatchable: bool,
    pub srap_enabled: Profile<bool>,
    pub mttf: f64,
    pub mttr: f64,
}

impl Default for Machine {
    fn default() -> Self {
        Self {
            idtag: String::new(),
            name: String::new(),
            bus: BusId::new(0),
            active: Profile::fixed(true),
            p: Profile::fixed(0.0),
            pf: Profile::fixed(0.8),
            vset: Profile::fixed(1.0),
            is_controlled: true,
            control_bus: None,
            snom: MegavoltAmperes(9999.0),
            pmin: 0.0,
            pmax: 9999.0,
            qmin: -9999.0,
            qmax: 9999.0,
            q_curve: None,
            r0: 1e-20,
            x0: 1e-20,
            r1: 1e-20,
            x1: 1e-20,
            r2: 1e-20,
            x2: 1e-20,
            cost0: Profile::fixed(0.0),
            cost1: Profile::fixed(1.0),
            cost2: Profile::fixed(0.0),
            startup_cost: 0.0,
            shutdown_cost: 0.0,
            ramp_up: 1e20,
            ramp_down: 1e20,
            min_time_up: 0.0,
            min_time_down: 0.0,
            dispatchable: true,
            srap_enabled: Profile::fixed(true),
            mttf: 0.0,
            mttr: 0.0,
        }
    }
}

impl Machine {
    pub fn new(name: impl Into<String>, bus: BusId) -> Self {
        let name = name.into();
        Self {
            idtag: name.clone(),
            name,
            bus,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Generator {
    pub id: GenId,
    pub unit: Machine,
}

impl Generator {
    pub fn new(id: GenId, name: impl Into<String>, bus: BusId) -> Self {
        Self {
            id,
            unit: Machine::new(name, bus),
        }
    }

    pub fn with_p(mut self, p_mw: f64) -> Self {
        self.unit.p = Profile::fixed(p_mw);
        self
    }

    pub fn with_vset(mut self, vset: f64) -> Self {
        self.unit.vset = Profile::fixed(vset);
        self
    }

    pub fn with_q_limits(mut self, qmin: f64, qmax: f64) -> Self {
        self.unit.qmin = qmin;
        self.unit.qmax = qmax;
        self
    }

    pub fn with_remote_control(mut self, bus: BusId) -> Self {
        self.unit.control_bus = Some(bus);
        self
    }

    /// Fixed power factor operation (no voltage control)
    pub fn uncontrolled(mut self) -> Self {
        self.unit.is_controlled = false;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Battery {
    pub id: BatteryId,
    pub unit: Machine,
    /// Nominal energy (MWh)
    pub enom: f64,
    pub min_soc: f64,
    pub max_soc: f64,
    pub soc0: f64,
    pub charge_efficiency: f64,
    pub discharge_efficiency: f64,
}

impl Battery {
    pub fn new(id: BatteryId, name: impl Into<String>, bus: BusId) -> Self {
        Self {
            id,
            unit: Machine::new(name, bus),
            enom: 1000.0,
            min_soc: 0.1,
            max_soc: 0.99,
            soc0: 0.5,
            charge_efficiency: 0.9,
            discharge_efficiency: 0.9,
        }
    }

    pub fn with_p(mut self, p_mw: f64) -> Self {
        self.unit.p = Profile::fixed(p_mw);
        self
    }

    pub fn with_vset(mut self, vset: f64) -> Self {
        self.unit.vset = Profile::fixed(vset);
        self
    }
}

// ============================================================================
// Load-like injections (all compile into load rows and share the LoadId space)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Load {
    pub id: LoadId,
    pub idtag: String,
    pub name: String,
    pub bus: BusId,
    pub active: Profile<bool>,
    /// Constant power (MW, Mvar)
    pub p: Profile<f64>,
    pub q: Profile<f64>,
    /// Constant current (MW at v = 1 p.u.)
    pub ir: Profile<f64>,
    pub ii: Profile<f64>,
    /// Constant admittance (MW at v = 1 p.u.)
    pub g: Profile<f64>,
    pub b: Profile<f64>,
    /// Load shedding cost
    pub cost: Profile<f64>,
    pub mttf: f64,
    pub mttr: f64,
}

impl Load {
    pub fn new(id: LoadId, name: impl Into<String>, bus: BusId, p: f64, q: f64) -> Self {
        let name = name.into();
        Self {
            id,
            idtag: name.clone(),
            name,
            bus,
            active: Profile::fixed(true),
            p: Profile::fixed(p),
            q: Profile::fixed(q),
            ir: Profile::fixed(0.0),
            ii: Profile::fixed(0.0),
            g: Profile::fixed(0.0),
            b: Profile::fixed(0.0),
            cost: Profile::fixed(1200.0),
            mttf: 0.0,
            mttr: 0.0,
        }
    }
}

/// Negative load: fixed P/Q injection without voltage control.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticGenerator {
    pub id: LoadId,
    pub idtag: String,
    pub name: String,
    pub bus: BusId,
    pub active: Profile<bool>,
    pub p: Profile<f64>,
    pub q: Profile<f64>,
    pub cost: Profile<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExternalGridMode {
    /// Voltage magnitude and angle fixed: the bus becomes slack
    Vd,
    /// Voltage magnitude controlled
    Pv,
    /// Plain power injection
    #[default]
    Pq,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalGrid {
    pub id: LoadId,
    pub idtag: String,
    pub name: String,
    pub bus: BusId,
    pub active: Profile<bool>,
    pub mode: ExternalGridMode,
    pub p: Profile<f64>,
    pub q: Profile<f64>,
    pub vm: Profile<f64>,
    pub cost: Profile<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentInjection {
    pub id: LoadId,
    pub idtag: String,
    pub name: String,
    pub bus: BusId,
    pub active: Profile<bool>,
    pub ir: Profile<f64>,
    pub ii: Profile<f64>,
    pub cost: Profile<f64>,
}

// ============================================================================
// Shunts
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shunt {
    pub id: ShuntId,
    pub idtag: String,
    pub name: String,
    pub bus: BusId,
    pub active: Profile<bool>,
    /// Admittance (MW / Mvar at v = 1 p.u.)
    pub g: Profile<f64>,
    pub b: Profile<f64>,
    pub mttf: f64,
    pub mttr: f64,
}

impl Shunt {
    pub fn new(id: ShuntId, name: impl Into<String>, bus: BusId, g: f64, b: f64) -> Self {
        let name = name.into();
        Self {
            id,
            idtag: name.clone(),
            name,
            bus,
            active: Profile::fixed(true),
            g: Profile::fixed(g),
            b: Profile::fixed(b),
            mttf: 0.0,
            mttr: 0.0,
        }
    }
}

/// Switched shunt able to regulate a bus voltage within [b_min, b_max].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllableShunt {
    pub id: ShuntId,
    pub idtag: String,
    pub name: String,
    pub bus: BusId,
    pub active: Profile<bool>,
    pub g: Profile<f64>,
    pub b: Profile<f64>,
    /// Susceptance limits (Mvar at v = 1 p.u.)
    pub b_min: f64,
    pub b_max: f64,
    pub vset: Profile<f64>,
    pub is_controlled: bool,
    pub control_bus: Option<BusId>,
    pub cost: Profile<f64>,
    pub mttf: f64,
    pub mttr: f64,
}

// ============================================================================
// Branches
// ============================================================================

/// Fields common to every AC/DC branch kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchCommon {
    pub id: BranchId,
    pub idtag: String,
    pub name: String,
    pub from_bus: BusId,
    pub to_bus: BusId,
    pub active: Profile<bool>,
    /// Normal rating (MVA)
    pub rate: Profile<f64>,
    pub contingency_factor: Profile<f64>,
    pub protection_factor: Profile<f64>,
    pub overload_cost: Profile<f64>,
    pub monitor_loading: bool,
    pub contingency_enabled: bool,
    /// Zero-impedance coupler that can be collapsed by topology processing
    pub reducible: bool,
    pub mttf: f64,
    pub mttr: f64,
}

impl BranchCommon {
    pub fn new(id: BranchId, name: impl Into<String>, from_bus: BusId, to_bus: BusId) -> Self {
        let name = name.into();
        Self {
            id,
            idtag: name.clone(),
            name,
            from_bus,
            to_bus,
            active: Profile::fixed(true),
            rate: Profile::fixed(9999.0),
            contingency_factor: Profile::fixed(1.0),
            protection_factor: Profile::fixed(1.4),
            overload_cost: Profile::fixed(1000.0),
            monitor_loading: true,
            contingency_enabled: true,
            reducible: false,
            mttf: 0.0,
            mttr: 0.0,
        }
    }
}

/// Pi-model parameters in per-unit for the three sequences.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesImpedance {
    pub r: f64,
    pub x: f64,
    pub g: f64,
    pub b: f64,
    pub r0: f64,
    pub x0: f64,
    pub g0: f64,
    pub b0: f64,
    pub r2: f64,
    pub x2: f64,
    pub g2: f64,
    pub b2: f64,
}

impl SeriesImpedance {
    /// Positive sequence values, copied to the zero and negative sequences.
    pub fn new(r: f64, x: f64, b: f64) -> Self {
        Self {
            r,
            x,
            g: 0.0,
            b,
            r0: r,
            x0: x,
            g0: 0.0,
            b0: b,
            r2: r,
            x2: x,
            g2: 0.0,
            b2: b,
        }
    }

    pub fn with_g(mut self, g: f64) -> Self {
        self.g = g;
        self.g0 = g;
        self.g2 = g;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Line {
    pub common: BranchCommon,
    pub impedance: SeriesImpedance,
    /// Resistance tolerance in percent
    pub tolerance: f64,
    /// Temperature at which R is given (°C)
    pub temp_base: f64,
    /// Operating temperature (°C)
    pub temp_oper: f64,
    /// Conductor thermal coefficient (1/°C)
    pub alpha: f64,
}

impl Line {
    pub fn new(common: BranchCommon, r: f64, x: f64, b: f64) -> Self {
        Self {
            common,
            impedance: SeriesImpedance::new(r, x, b),
            tolerance: 0.0,
            temp_base: 20.0,
            temp_oper: 20.0,
            alpha: 0.00330,
        }
    }

    /// Resistance corrected to the operating temperature.
    pub fn r_corrected(&self) -> f64 {
        self.impedance.r * (1.0 + self.alpha * (self.temp_oper - self.temp_base))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcLine {
    pub common: BranchCommon,
    pub r: f64,
    pub tolerance: f64,
    pub temp_base: f64,
    pub temp_oper: f64,
    pub alpha: f64,
}

impl DcLine {
    pub fn new(common: BranchCommon, r: f64) -> Self {
        Self {
            common,
            r,
            tolerance: 0.0,
            temp_base: 20.0,
            temp_oper: 20.0,
            alpha: 0.00330,
        }
    }

    pub fn r_corrected(&self) -> f64 {
        self.r * (1.0 + self.alpha * (self.temp_oper - self.temp_base))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TapModuleControl {
    #[default]
    Fixed,
    /// Regulate the voltage of the regulation bus
    Vm,
    /// Regulate the reactive flow at the from side
    Qf,
    /// Regulate the reactive flow at the to side
    Qt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TapPhaseControl {
    #[default]
    Fixed,
    /// Regulate the active flow at the from side
    Pf,
    /// Regulate the active flow at the to side
    Pt,
}

/// Winding connection of a two-winding transformer (from side, to side).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WindingsConnection {
    /// Grounded star / grounded star
    #[default]
    GG,
    /// Grounded star / star
    GS,
    /// Grounded star / delta
    GD,
    /// Star / star
    SS,
    /// Star / delta
    SD,
    /// Delta / delta
    DD,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transformer {
    pub common: BranchCommon,
    pub impedance: SeriesImpedance,
    pub conn: WindingsConnection,
    /// Winding ratings used to compute the virtual taps
    pub hv: Kilovolts,
    pub lv: Kilovolts,
    pub tap_module: Profile<f64>,
    /// Phase shift in radians
    pub tap_phase: Profile<f64>,
    pub tap_module_min: f64,
    pub tap_module_max: f64,
    pub tap_phase_min: f64,
    pub tap_phase_max: f64,
    pub tap_module_control: TapModuleControl,
    pub tap_phase_control: TapPhaseControl,
    /// Bus regulated by the tap module; `None` means the from bus
    pub regulation_bus: Option<BusId>,
    pub vset: Profile<f64>,
    /// Active flow setpoint (MW)
    pub pset: Profile<f64>,
    /// Reactive flow setpoint (Mvar)
    pub qset: Profile<f64>,
    pub tolerance: f64,
}

impl Transformer {
    pub fn new(common: BranchCommon, r: f64, x: f64, hv: f64, lv: f64) -> Self {
        Self {
            common,
            impedance: SeriesImpedance::new(r, x, 0.0),
            conn: WindingsConnection::GG,
            hv: Kilovolts(hv),
            lv: Kilovolts(lv),
            tap_module: Profile::fixed(1.0),
            tap_phase: Profile::fixed(0.0),
            tap_module_min: 0.5,
            tap_module_max: 1.5,
            tap_phase_min: -6.28,
            tap_phase_max: 6.28,
            tap_module_control: TapModuleControl::Fixed,
            tap_phase_control: TapPhaseControl::Fixed,
            regulation_bus: None,
            vset: Profile::fixed(1.0),
            pset: Profile::fixed(0.0),
            qset: Profile::fixed(0.0),
            tolerance: 0.0,
        }
    }

    pub fn with_taps(mut self, module: f64, phase: f64) -> Self {
        self.tap_module = Profile::fixed(module);
        self.tap_phase = Profile::fixed(phase);
        self
    }

    pub fn with_voltage_control(mut self, vset: f64, regulation_bus: Option<BusId>) -> Self {
        self.tap_module_control = TapModuleControl::Vm;
        self.vset = Profile::fixed(vset);
        self.regulation_bus = regulation_bus;
        self
    }

    /// Virtual taps (from, to) given the nominal voltages of the terminal buses.
    ///
    /// The high-voltage winding is placed on the terminal with the higher
    /// nominal voltage.
    pub fn virtual_taps(&self, vnom_f: Kilovolts, vnom_t: Kilovolts) -> (f64, f64) {
        let (hv, lv) = (self.hv.value(), self.lv.value());
        if hv <= 0.0 || lv <= 0.0 || vnom_f.value() <= 0.0 || vnom_t.value() <= 0.0 {
            return (1.0, 1.0);
        }
        if vnom_f.value() >= vnom_t.value() {
            (hv / vnom_f.value(), lv / vnom_t.value())
        } else {
            (lv / vnom_f.value(), hv / vnom_t.value())
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesReactance {
    pub common: BranchCommon,
    pub impedance: SeriesImpedance,
    pub tolerance: f64,
}

/// Unified power flow controller: series branch plus a shunt leg.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Upfc {
    pub common: BranchCommon,
    /// Series impedance (p.u.)
    pub rs: f64,
    pub xs: f64,
    pub rs0: f64,
    pub xs0: f64,
    pub rs2: f64,
    pub xs2: f64,
    /// Shunt leg impedance (p.u.)
    pub rp: f64,
    pub xp: f64,
    /// Active flow setpoint at the from side (MW)
    pub pfset: Profile<f64>,
    pub qfset: Profile<f64>,
    pub vsh: Profile<f64>,
}

impl Upfc {
    /// Susceptance of the shunt leg.
    pub fn shunt_susceptance(&self) -> f64 {
        let den = self.rp * self.rp + self.xp * self.xp;
        if den > 0.0 {
            -self.xp / den
        } else {
            0.0
        }
    }
}

// ============================================================================
// DC links and converters
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HvdcControlMode {
    /// Power follows the angle difference (angle droop)
    FreeAngle,
    /// Fixed power setpoint
    #[default]
    Pset,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hvdc {
    pub id: HvdcId,
    pub idtag: String,
    pub name: String,
    pub from_bus: BusId,
    pub to_bus: BusId,
    pub active: Profile<bool>,
    pub rate: Profile<f64>,
    pub contingency_factor: Profile<f64>,
    pub protection_factor: Profile<f64>,
    pub control_mode: HvdcControlMode,
    /// Transferred power (MW), from -> to
    pub pset: Profile<f64>,
    pub vset_f: Profile<f64>,
    pub vset_t: Profile<f64>,
    /// MW/deg
    pub angle_droop: Profile<f64>,
    pub r: f64,
    pub qmin_f: f64,
    pub qmax_f: f64,
    pub qmin_t: f64,
    pub qmax_t: f64,
    pub dispatchable: bool,
}

impl Hvdc {
    pub fn new(id: HvdcId, name: impl Into<String>, from_bus: BusId, to_bus: BusId) -> Self {
        let name = name.into();
        Self {
            id,
            idtag: name.clone(),
            name,
            from_bus,
            to_bus,
            active: Profile::fixed(true),
            rate: Profile::fixed(9999.0),
            contingency_factor: Profile::fixed(1.0),
            protection_factor: Profile::fixed(1.4),
            control_mode: HvdcControlMode::Pset,
            pset: Profile::fixed(0.0),
            vset_f: Profile::fixed(1.0),
            vset_t: Profile::fixed(1.0),
            angle_droop: Profile::fixed(0.0),
            r: 1e-20,
            qmin_f: -9999.0,
            qmax_f: 9999.0,
            qmin_t: -9999.0,
            qmax_t: 9999.0,
            dispatchable: false,
        }
    }
}

/// Quantity a converter control loop regulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConverterControlType {
    VmDc,
    VmAc,
    VaAc,
    Qac,
    Pdc,
    Pac,
}

/// Device whose magnitude is being regulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlTarget {
    Bus(BusId),
    Branch(BranchId),
}

/// Voltage source converter between a DC bus (from) and an AC bus (to).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vsc {
    pub id: VscId,
    pub idtag: String,
    pub name: String,
    pub from_bus: BusId,
    pub to_bus: BusId,
    pub active: Profile<bool>,
    pub rate: Profile<f64>,
    pub contingency_factor: Profile<f64>,
    pub protection_factor: Profile<f64>,
    pub control1: ConverterControlType,
    pub control2: ConverterControlType,
    pub control1_val: Profile<f64>,
    pub control2_val: Profile<f64>,
    /// Regulated device for each loop; `None` means the converter's own terminal
    pub control1_target: Option<ControlTarget>,
    pub control2_target: Option<ControlTarget>,
    /// Loss coefficients
    pub alpha1: f64,
    pub alpha2: f64,
    pub alpha3: f64,
    pub kdp: f64,
}

impl Vsc {
    pub fn new(id: VscId, name: impl Into<String>, from_bus: BusId, to_bus: BusId) -> Self {
        let name = name.into();
        Self {
            id,
            idtag: name.clone(),
            name,
            from_bus,
            to_bus,
            active: Profile::fixed(true),
            rate: Profile::fixed(9999.0),
            contingency_factor: Profile::fixed(1.0),
            protection_factor: Profile::fixed(1.4),
            control1: ConverterControlType::Pac,
            control2: ConverterControlType::Qac,
            control1_val: Profile::fixed(0.0),
            control2_val: Profile::fixed(0.0),
            control1_target: None,
            control2_target: None,
            alpha1: 0.0001,
            alpha2: 0.015,
            alpha3: 0.2,
            kdp: -0.05,
        }
    }
}

// ============================================================================
// Fluid (hydro) coupling
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FluidNode {
    pub id: FluidNodeId,
    pub idtag: String,
    pub name: String,
    /// Reservoir levels in hm3
    pub min_level: f64,
    pub max_level: f64,
    pub initial_level: f64,
    /// m3/s
    pub inflow: Profile<f64>,
    pub spillage_cost: Profile<f64>,
    pub min_soc: Profile<f64>,
    pub max_soc: Profile<f64>,
}

impl FluidNode {
    pub fn new(id: FluidNodeId, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id,
            idtag: name.clone(),
            name,
            min_level: 0.0,
            max_level: 0.0,
            initial_level: 0.0,
            inflow: Profile::fixed(0.0),
            spillage_cost: Profile::fixed(0.0),
            min_soc: Profile::fixed(0.0),
            max_soc: Profile::fixed(1.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FluidInjectionKind {
    Turbine,
    Pump,
    /// Power-to-X converter
    P2x,
}

/// Turbine, pump or P2X unit coupling a fluid node with a generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FluidInjection {
    pub id: FluidInjectionId,
    pub idtag: String,
    pub name: String,
    pub kind: FluidInjectionKind,
    pub plant: FluidNodeId,
    pub generator: GenId,
    /// MWh/m3
    pub efficiency: f64,
    /// m3/s
    pub max_flow_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FluidPath {
    pub id: FluidPathId,
    pub idtag: String,
    pub name: String,
    pub source: FluidNodeId,
    pub target: FluidNodeId,
    pub min_flow: f64,
    pub max_flow: f64,
}
