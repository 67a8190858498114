//! Sparse incidence matrices.
//!
//! Branch incidence is split in a from-side matrix `Cf` and a to-side matrix
//! `Ct`, both `nbr x nbus` with a single `1.0` per row. A branch only gets its
//! entries when it is active and both of its buses are active, so inactive rows
//! stay empty and contribute nothing to anything built on top of them.
//!
//! Device incidence matrices (`nelm x nbus`) map single-terminal devices onto
//! their buses and are used to aggregate injections per bus.

use std::ops::AddAssign;

use sprs::{CsMat, TriMat};

use crate::data::{BranchData, HvdcData, VscData};

/// From/to incidence of a set of two-terminal elements.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchConnectivity {
    pub cf: CsMat<f64>,
    pub ct: CsMat<f64>,
}

impl BranchConnectivity {
    /// Build `Cf`/`Ct` from terminal indices and a per-row in-service flag.
    pub fn from_terminals(f: &[usize], t: &[usize], in_service: &[bool], nbus: usize) -> Self {
        let nelm = f.len();
        let mut cf = TriMat::new((nelm, nbus));
        let mut ct = TriMat::new((nelm, nbus));
        for k in 0..nelm {
            if in_service[k] {
                cf.add_triplet(k, f[k], 1.0);
                ct.add_triplet(k, t[k], 1.0);
            }
        }
        Self {
            cf: cf.to_csr(),
            ct: ct.to_csr(),
        }
    }

    pub fn n_elements(&self) -> usize {
        self.cf.rows()
    }

    pub fn n_buses(&self) -> usize {
        self.cf.cols()
    }

    /// Unsigned incidence `Cf + Ct`.
    pub fn c(&self) -> CsMat<f64> {
        &self.cf + &self.ct
    }

    /// Bus indices (from, to) of row `k`, if the row is in service.
    pub fn terminals(&self, k: usize) -> Option<(usize, usize)> {
        let f = self.cf.outer_view(k)?.indices().first().copied()?;
        let t = self.ct.outer_view(k)?.indices().first().copied()?;
        Some((f, t))
    }
}

/// Whether each row is active with both terminal buses active.
pub fn in_service(f: &[usize], t: &[usize], active: &[bool], bus_active: &[bool]) -> Vec<bool> {
    (0..f.len())
        .map(|k| active[k] && bus_active[f[k]] && bus_active[t[k]])
        .collect()
}

pub fn branch_connectivity(branches: &BranchData, bus_active: &[bool]) -> BranchConnectivity {
    let flags = in_service(&branches.f, &branches.t, &branches.active, bus_active);
    BranchConnectivity::from_terminals(&branches.f, &branches.t, &flags, bus_active.len())
}

pub fn hvdc_connectivity(hvdc: &HvdcData, bus_active: &[bool]) -> BranchConnectivity {
    let flags = in_service(&hvdc.f, &hvdc.t, &hvdc.active, bus_active);
    BranchConnectivity::from_terminals(&hvdc.f, &hvdc.t, &flags, bus_active.len())
}

pub fn vsc_connectivity(vsc: &VscData, bus_active: &[bool]) -> BranchConnectivity {
    let flags = in_service(&vsc.f, &vsc.t, &vsc.active, bus_active);
    BranchConnectivity::from_terminals(&vsc.f, &vsc.t, &flags, bus_active.len())
}

/// Device to bus incidence (`nelm x nbus`), with entries only for active devices.
pub fn device_incidence(bus_idx: &[usize], active: &[bool], nbus: usize) -> CsMat<f64> {
    let mut c = TriMat::new((bus_idx.len(), nbus));
    for (k, &bus) in bus_idx.iter().enumerate() {
        if active[k] {
            c.add_triplet(k, bus, 1.0);
        }
    }
    c.to_csr()
}

/// `C^T x`: sum per-device values onto buses through an incidence matrix.
pub fn aggregate<T>(incidence: &CsMat<f64>, values: &[T]) -> Vec<T>
where
    T: Copy + Default + AddAssign + std::ops::Mul<f64, Output = T>,
{
    let mut out = vec![T::default(); incidence.cols()];
    for (k, row) in incidence.outer_iterator().enumerate() {
        for (bus, &w) in row.iter() {
            out[bus] += values[k] * w;
        }
    }
    out
}
