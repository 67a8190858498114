//! Admittance matrices of a compiled circuit.
//!
//! Every branch is a pi model with series admittance `ys`, half the shunt
//! charging `bc2` on each side, a tap `m∠tau` at the from side and virtual taps
//! `vf`, `vt` that absorb nominal voltage mismatches:
//!
//! ```text
//! ys  = 1 / (R + jX + 1e-20)
//! bc2 = (G + jB) / 2
//! Yff = (ys + bc2 + jBeq) / (m^2 vf^2)
//! Yft = -ys / (m e^{-j tau} vf vt)
//! Ytf = -ys / (m e^{+j tau} vt vf)
//! Ytt = (ys + bc2) / vt^2
//! ```
//!
//! Matrices are assembled directly from triplets (the same layout as
//! `Yf = diag(Yff) Cf + diag(Yft) Ct`, `Yt = diag(Ytf) Cf + diag(Ytt) Ct` and
//! `Ybus = Cf^T Yf + Ct^T Yt + diag(Yshunt_bus)`). Branches out of service
//! contribute nothing.

use grid_core::WindingsConnection;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use sprs::{CsMat, TriMat};

use crate::connectivity::in_service;
use crate::data::{BranchData, BranchKind};

/// Added to impedances so that zero-impedance branches stay finite.
pub const IMPEDANCE_EPS: f64 = 1e-20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Sequence {
    #[default]
    Positive,
    Negative,
    Zero,
}

/// Per-branch pi-model entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BranchPrimitives {
    pub yff: Vec<Complex64>,
    pub yft: Vec<Complex64>,
    pub ytf: Vec<Complex64>,
    pub ytt: Vec<Complex64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdmittanceMatrices {
    pub ybus: CsMat<Complex64>,
    /// Branch-from admittance (`nbr x nbus`)
    pub yf: CsMat<Complex64>,
    /// Branch-to admittance (`nbr x nbus`)
    pub yt: CsMat<Complex64>,
    pub primitives: BranchPrimitives,
    /// Bus shunt admittance added on the diagonal (p.u.)
    pub yshunt_bus: Vec<Complex64>,
}

impl AdmittanceMatrices {
    pub fn nbus(&self) -> usize {
        self.ybus.rows()
    }

    pub fn y(&self, i: usize, j: usize) -> Complex64 {
        self.ybus.get(i, j).copied().unwrap_or_default()
    }
}

/// Ybus split in its series part and the shunt part lumped per bus.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesShuntAdmittances {
    pub yseries: CsMat<Complex64>,
    pub yshunt_bus: Vec<Complex64>,
}

/// Fast-decoupled B' and B'' matrices.
#[derive(Debug, Clone, PartialEq)]
pub struct FastDecoupledAdmittances {
    pub b1: CsMat<f64>,
    pub b2: CsMat<f64>,
}

/// DC power flow matrices.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearAdmittances {
    pub bbus: CsMat<f64>,
    /// Branch flow sensitivity (`nbr x nbus`)
    pub bf: CsMat<f64>,
}

fn sequence_params(
    branches: &BranchData,
    k: usize,
    sequence: Sequence,
) -> (f64, f64, f64, f64) {
    match sequence {
        Sequence::Positive => (branches.r[k], branches.x[k], branches.g[k], branches.b[k]),
        Sequence::Negative => (branches.r2[k], branches.x2[k], branches.g2[k], branches.b2[k]),
        Sequence::Zero => (branches.r0[k], branches.x0[k], branches.g0[k], branches.b0[k]),
    }
}

/// Which sides of a transformer let zero-sequence current through.
fn zero_sequence_sides(conn: WindingsConnection) -> (bool, bool, bool) {
    // (from side grounded, to side grounded, coupled)
    match conn {
        WindingsConnection::GG => (true, true, true),
        WindingsConnection::GD => (true, false, false),
        WindingsConnection::GS
        | WindingsConnection::SS
        | WindingsConnection::SD
        | WindingsConnection::DD => (false, false, false),
    }
}

fn is_star_delta(conn: WindingsConnection) -> bool {
    matches!(conn, WindingsConnection::GD | WindingsConnection::SD)
}

/// Pi-model entries of every branch for the given sequence.
pub fn branch_primitives(branches: &BranchData, sequence: Sequence) -> BranchPrimitives {
    let n = branches.len();
    let mut prim = BranchPrimitives {
        yff: vec![Complex64::default(); n],
        yft: vec![Complex64::default(); n],
        ytf: vec![Complex64::default(); n],
        ytt: vec![Complex64::default(); n],
    };

    for k in 0..n {
        let (r, x, g, b) = sequence_params(branches, k, sequence);
        let ys = Complex64::new(1.0, 0.0) / Complex64::new(r + IMPEDANCE_EPS, x);
        let bc2 = Complex64::new(g, b) / 2.0;
        let m = branches.tap_module[k];
        let vf = branches.virtual_tap_f[k];
        let vt = branches.virtual_tap_t[k];
        let jbeq = Complex64::new(0.0, branches.beq[k]);

        let mut tau = branches.tap_angle[k];
        if sequence == Sequence::Negative {
            // phase shifts rotate the other way in negative sequence
            tau = -tau;
            if branches.kinds[k] == BranchKind::Transformer && is_star_delta(branches.conn[k]) {
                tau -= std::f64::consts::FRAC_PI_6;
            }
        }

        let yff = (ys + bc2 + jbeq) / (m * m * vf * vf);
        let yft = -ys / (Complex64::from_polar(m, -tau) * vf * vt);
        let ytf = -ys / (Complex64::from_polar(m, tau) * vt * vf);
        let ytt = (ys + bc2) / (vt * vt);

        if sequence == Sequence::Zero && branches.kinds[k] == BranchKind::Transformer {
            let (from_grounded, to_grounded, coupled) = zero_sequence_sides(branches.conn[k]);
            prim.yff[k] = if from_grounded { yff } else { Complex64::default() };
            prim.ytt[k] = if to_grounded { ytt } else { Complex64::default() };
            if coupled {
                prim.yft[k] = yft;
                prim.ytf[k] = ytf;
            }
            continue;
        }

        prim.yff[k] = yff;
        prim.yft[k] = yft;
        prim.ytf[k] = ytf;
        prim.ytt[k] = ytt;
    }
    prim
}

/// Full admittance family for one sequence.
///
/// `yshunt_bus` holds the shunt admittance lumped per bus (p.u.); its length
/// sets the number of buses.
pub fn compute_admittances(
    branches: &BranchData,
    yshunt_bus: &[Complex64],
    bus_active: &[bool],
    sequence: Sequence,
) -> AdmittanceMatrices {
    let nbus = yshunt_bus.len();
    let nbr = branches.len();
    let prim = branch_primitives(branches, sequence);
    let flags = in_service(&branches.f, &branches.t, &branches.active, bus_active);

    let mut yf = TriMat::new((nbr, nbus));
    let mut yt = TriMat::new((nbr, nbus));
    let mut ybus = TriMat::new((nbus, nbus));

    for k in (0..nbr).filter(|&k| flags[k]) {
        let (f, t) = (branches.f[k], branches.t[k]);
        yf.add_triplet(k, f, prim.yff[k]);
        yf.add_triplet(k, t, prim.yft[k]);
        yt.add_triplet(k, f, prim.ytf[k]);
        yt.add_triplet(k, t, prim.ytt[k]);

        ybus.add_triplet(f, f, prim.yff[k]);
        ybus.add_triplet(f, t, prim.yft[k]);
        ybus.add_triplet(t, f, prim.ytf[k]);
        ybus.add_triplet(t, t, prim.ytt[k]);
    }
    for (i, &y) in yshunt_bus.iter().enumerate() {
        if y != Complex64::default() {
            ybus.add_triplet(i, i, y);
        }
    }

    AdmittanceMatrices {
        ybus: ybus.to_csr(),
        yf: yf.to_csr(),
        yt: yt.to_csr(),
        primitives: prim,
        yshunt_bus: yshunt_bus.to_vec(),
    }
}

/// Series part of Ybus, with the branch shunt elements moved to the buses.
pub fn compute_split_admittances(
    branches: &BranchData,
    yshunt_bus: &[Complex64],
    bus_active: &[bool],
) -> SeriesShuntAdmittances {
    let nbus = yshunt_bus.len();
    let flags = in_service(&branches.f, &branches.t, &branches.active, bus_active);
    let mut yseries = TriMat::new((nbus, nbus));
    let mut yshunt = yshunt_bus.to_vec();

    for k in (0..branches.len()).filter(|&k| flags[k]) {
        let (f, t) = (branches.f[k], branches.t[k]);
        let ys = Complex64::new(1.0, 0.0)
            / Complex64::new(branches.r[k] + IMPEDANCE_EPS, branches.x[k]);
        let bc2 = Complex64::new(branches.g[k], branches.b[k]) / 2.0;
        let m = branches.tap_module[k];
        let tau = branches.tap_angle[k];
        let vf = branches.virtual_tap_f[k];
        let vt = branches.virtual_tap_t[k];

        yseries.add_triplet(f, f, ys / (m * m * vf * vf));
        yseries.add_triplet(f, t, -ys / (Complex64::from_polar(m, -tau) * vf * vt));
        yseries.add_triplet(t, f, -ys / (Complex64::from_polar(m, tau) * vt * vf));
        yseries.add_triplet(t, t, ys / (vt * vt));

        yshunt[f] += (bc2 + Complex64::new(0.0, branches.beq[k])) / (m * m * vf * vf);
        yshunt[t] += bc2 / (vt * vt);
    }

    SeriesShuntAdmittances {
        yseries: yseries.to_csr(),
        yshunt_bus: yshunt,
    }
}

/// B' from `1/X` only; B'' from `1/X + B` with the tap modules, plus bus shunts.
pub fn compute_fast_decoupled(
    branches: &BranchData,
    yshunt_bus: &[Complex64],
    bus_active: &[bool],
) -> FastDecoupledAdmittances {
    let nbus = yshunt_bus.len();
    let flags = in_service(&branches.f, &branches.t, &branches.active, bus_active);
    let mut b1 = TriMat::new((nbus, nbus));
    let mut b2 = TriMat::new((nbus, nbus));

    for k in (0..branches.len()).filter(|&k| flags[k]) {
        let (f, t) = (branches.f[k], branches.t[k]);
        let b1k = 1.0 / (branches.x[k] + IMPEDANCE_EPS);
        let b2k = b1k + branches.b[k];
        let m = branches.tap_module[k];
        let off = b1k * branches.tap_angle[k].cos() / m;

        b1.add_triplet(f, f, b1k);
        b1.add_triplet(f, t, -b1k);
        b1.add_triplet(t, f, -b1k);
        b1.add_triplet(t, t, b1k);

        b2.add_triplet(f, f, b2k / (m * m));
        b2.add_triplet(f, t, -off);
        b2.add_triplet(t, f, -off);
        b2.add_triplet(t, t, b2k);
    }
    for (i, y) in yshunt_bus.iter().enumerate() {
        if y.im != 0.0 {
            b2.add_triplet(i, i, -y.im);
        }
    }

    FastDecoupledAdmittances {
        b1: b1.to_csr(),
        b2: b2.to_csr(),
    }
}

/// Linearized (DC) susceptances `b = 1 / (X m)`; DC branches use R.
pub fn compute_linear_admittances(branches: &BranchData, bus_active: &[bool]) -> LinearAdmittances {
    let nbus = bus_active.len();
    let nbr = branches.len();
    let flags = in_service(&branches.f, &branches.t, &branches.active, bus_active);
    let mut bbus = TriMat::new((nbus, nbus));
    let mut bf = TriMat::new((nbr, nbus));

    for k in (0..nbr).filter(|&k| flags[k]) {
        let (f, t) = (branches.f[k], branches.t[k]);
        let z = if branches.is_dc[k] {
            branches.r[k]
        } else {
            branches.x[k] * branches.tap_module[k]
        };
        let b = 1.0 / (z + IMPEDANCE_EPS);

        bf.add_triplet(k, f, b);
        bf.add_triplet(k, t, -b);

        bbus.add_triplet(f, f, b);
        bbus.add_triplet(f, t, -b);
        bbus.add_triplet(t, f, -b);
        bbus.add_triplet(t, t, b);
    }

    LinearAdmittances {
        bbus: bbus.to_csr(),
        bf: bf.to_csr(),
    }
}

/// Rows `rows` and columns `cols` of `mat`, renumbered in the given order.
pub fn submatrix(mat: &CsMat<f64>, rows: &[usize], cols: &[usize]) -> CsMat<f64> {
    let mut col_pos = vec![None; mat.cols()];
    for (j, &c) in cols.iter().enumerate() {
        col_pos[c] = Some(j);
    }
    let mut sub = TriMat::new((rows.len(), cols.len()));
    for (i, &r) in rows.iter().enumerate() {
        if let Some(row) = mat.outer_view(r) {
            for (c, &v) in row.iter() {
                if let Some(j) = col_pos[c] {
                    sub.add_triplet(i, j, v);
                }
            }
        }
    }
    sub.to_csr()
}

/// `Bbus[no_slack, no_slack]`.
pub fn b_red(bbus: &CsMat<f64>, no_slack: &[usize]) -> CsMat<f64> {
    submatrix(bbus, no_slack, no_slack)
}

/// `Bbus[no_slack, vd]`.
pub fn b_slack(bbus: &CsMat<f64>, no_slack: &[usize], vd: &[usize]) -> CsMat<f64> {
    submatrix(bbus, no_slack, vd)
}
