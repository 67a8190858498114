//! Bus and branch index sets consumed by the solvers.

use grid_core::{TapModuleControl, TapPhaseControl};
use serde::Serialize;

use crate::data::{BranchData, BusType};

/// Bus type sets after slack promotion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BusTypeSets {
    pub vd: Vec<usize>,
    pub pq: Vec<usize>,
    pub pv: Vec<usize>,
    pub p: Vec<usize>,
    pub pqv: Vec<usize>,
}

/// Split buses by type.
///
/// When there is no slack bus but PV buses exist, the PV bus with the largest
/// positive injection `pbus` (else the first PV bus) is used as slack. The
/// bus types themselves are left untouched.
pub fn compile_types(pbus: &[f64], types: &[BusType]) -> BusTypeSets {
    let mut sets = BusTypeSets::default();
    for (i, t) in types.iter().enumerate() {
        match t {
            BusType::Slack => sets.vd.push(i),
            BusType::Pv => sets.pv.push(i),
            BusType::Pq => sets.pq.push(i),
            BusType::P => sets.p.push(i),
            BusType::Pqv => sets.pqv.push(i),
        }
    }

    if sets.vd.is_empty() && !sets.pv.is_empty() {
        let best = sets
            .pv
            .iter()
            .copied()
            .max_by(|&a, &b| pbus[a].total_cmp(&pbus[b]));
        let chosen = match best {
            Some(i) if pbus[i] > 0.0 => i,
            _ => sets.pv[0],
        };
        sets.pv.retain(|&i| i != chosen);
        sets.vd.push(chosen);
    }
    sets
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SimulationIndices {
    pub vd: Vec<usize>,
    pub pv: Vec<usize>,
    pub pq: Vec<usize>,
    pub p: Vec<usize>,
    pub pqv: Vec<usize>,
    /// Every non-slack bus, sorted
    pub no_slack: Vec<usize>,

    pub ac: Vec<usize>,
    pub dc: Vec<usize>,

    pub k_pf_tau: Vec<usize>,
    pub k_pt_tau: Vec<usize>,
    pub k_qf_m: Vec<usize>,
    pub k_qt_m: Vec<usize>,
    pub k_v_m: Vec<usize>,
    /// Branches with a controlled tap module
    pub k_m: Vec<usize>,
    /// Branches with a controlled tap angle
    pub k_tau: Vec<usize>,
    /// Branches controlling both
    pub k_mtau: Vec<usize>,
    /// Buses whose magnitude is set by a tap module: the regulated bus for
    /// `Vm`, the measured terminal for `Qf`/`Qt`
    pub i_m: Vec<usize>,
    /// Buses whose angle is set by a phase shifter: the measured terminal
    pub i_tau: Vec<usize>,
    pub any_control: bool,
}

impl SimulationIndices {
    pub fn new(
        bus_types: &[BusType],
        pbus: &[f64],
        branches: &BranchData,
        force_only_pq_pv_vd_types: bool,
    ) -> Self {
        let mut idx = Self::default();

        let types: Vec<BusType> = if force_only_pq_pv_vd_types {
            bus_types
                .iter()
                .map(|t| match t {
                    BusType::P => BusType::Pv,
                    BusType::Pqv => BusType::Pq,
                    other => *other,
                })
                .collect()
        } else {
            bus_types.to_vec()
        };
        let sets = compile_types(pbus, &types);
        let mut no_slack: Vec<usize> = sets
            .pq
            .iter()
            .chain(&sets.pv)
            .chain(&sets.p)
            .chain(&sets.pqv)
            .copied()
            .collect();
        no_slack.sort_unstable();

        idx.vd = sets.vd;
        idx.pv = sets.pv;
        idx.pq = sets.pq;
        idx.p = sets.p;
        idx.pqv = sets.pqv;
        idx.no_slack = no_slack;

        for k in 0..branches.len() {
            if branches.is_dc[k] {
                idx.dc.push(k);
            } else {
                idx.ac.push(k);
            }
            if !branches.active[k] {
                continue;
            }

            let module = branches.tap_module_control[k];
            let phase = branches.tap_phase_control[k];

            match phase {
                TapPhaseControl::Fixed => {}
                TapPhaseControl::Pf => {
                    idx.k_pf_tau.push(k);
                    idx.k_tau.push(k);
                    idx.i_tau.push(branches.f[k]);
                }
                TapPhaseControl::Pt => {
                    idx.k_pt_tau.push(k);
                    idx.k_tau.push(k);
                    idx.i_tau.push(branches.t[k]);
                }
            }

            match module {
                TapModuleControl::Fixed => {}
                TapModuleControl::Vm => {
                    idx.k_v_m.push(k);
                    idx.k_m.push(k);
                    idx.i_m.push(branches.ctrl_bus[k].unwrap_or(branches.f[k]));
                }
                TapModuleControl::Qf => {
                    idx.k_qf_m.push(k);
                    idx.k_m.push(k);
                    idx.i_m.push(branches.f[k]);
                }
                TapModuleControl::Qt => {
                    idx.k_qt_m.push(k);
                    idx.k_m.push(k);
                    idx.i_m.push(branches.t[k]);
                }
            }

            if module != TapModuleControl::Fixed && phase != TapPhaseControl::Fixed {
                idx.k_mtau.push(k);
            }
            if module != TapModuleControl::Fixed || phase != TapPhaseControl::Fixed {
                idx.any_control = true;
            }
        }

        idx.i_m.sort_unstable();
        idx.i_m.dedup();
        idx.i_tau.sort_unstable();
        idx.i_tau.dedup();
        idx
    }

    pub fn nbus_no_slack(&self) -> usize {
        self.no_slack.len()
    }
}
