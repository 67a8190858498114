//! Topology reduction and island splitting of a compiled circuit.

use std::borrow::Cow;
use std::collections::VecDeque;

use sprs::{CsMat, TriMat};
use tracing::{debug, info};

use crate::circuit::NumericalCircuit;
use crate::connectivity::in_service;
use crate::data::BusType;
use crate::extract::FluidData;
use crate::options::IslandOptions;

/// Bus adjacency `C^T C` of the given two-terminal elements.
pub fn adjacency(nbus: usize, terminals: &[(usize, usize)]) -> CsMat<f64> {
    let mut a = TriMat::new((nbus, nbus));
    for &(f, t) in terminals {
        a.add_triplet(f, f, 1.0);
        a.add_triplet(f, t, 1.0);
        a.add_triplet(t, f, 1.0);
        a.add_triplet(t, t, 1.0);
    }
    a.to_csr()
}

/// Connected components of `adj`, restricted to active buses.
///
/// Each component is sorted and components are ordered by their first bus.
pub fn find_islands(adj: &CsMat<f64>, bus_active: &[bool]) -> Vec<Vec<usize>> {
    let nbus = bus_active.len();
    let mut visited = vec![false; nbus];
    let mut islands = Vec::new();

    for start in 0..nbus {
        if visited[start] || !bus_active[start] {
            continue;
        }
        let mut members = Vec::new();
        let mut queue = VecDeque::new();
        visited[start] = true;
        queue.push_back(start);
        while let Some(i) = queue.pop_front() {
            members.push(i);
            if let Some(row) = adj.outer_view(i) {
                for (j, _) in row.iter() {
                    if !visited[j] && bus_active[j] {
                        visited[j] = true;
                        queue.push_back(j);
                    }
                }
            }
        }
        members.sort_unstable();
        islands.push(members);
    }
    islands
}

/// Strength of a bus type when merging buses; the strongest type survives.
fn type_rank(t: BusType) -> u8 {
    match t {
        BusType::Slack => 4,
        BusType::Pv => 3,
        BusType::Pqv => 2,
        BusType::P => 1,
        BusType::Pq => 0,
    }
}

fn rows_where(n: usize, keep: impl Fn(usize) -> bool) -> Vec<usize> {
    (0..n).filter(|&k| keep(k)).collect()
}

fn active_terminals(f: &[usize], t: &[usize], flags: &[bool]) -> Vec<(usize, usize)> {
    (0..f.len())
        .filter(|&k| flags[k])
        .map(|k| (f[k], t[k]))
        .collect()
}

impl NumericalCircuit {
    /// Terminals of every element that links buses topologically.
    fn island_links(&self, options: &IslandOptions) -> Vec<(usize, usize)> {
        let active = &self.bus_data.active;
        let br = &self.branch_data;
        let mut links = active_terminals(&br.f, &br.t, &in_service(&br.f, &br.t, &br.active, active));
        if options.consider_vsc_as_island_links {
            let v = &self.vsc_data;
            links.extend(active_terminals(&v.f, &v.t, &in_service(&v.f, &v.t, &v.active, active)));
        }
        if options.consider_hvdc_as_island_links {
            let h = &self.hvdc_data;
            links.extend(active_terminals(&h.f, &h.t, &in_service(&h.f, &h.t, &h.active, active)));
        }
        links
    }

    /// Bus groups of the circuit, without building the island circuits.
    pub fn islands(&self, options: &IslandOptions) -> Vec<Vec<usize>> {
        let adj = adjacency(self.nbus, &self.island_links(options));
        find_islands(&adj, &self.bus_data.active)
    }

    /// Collapse active reducible branches (bus-bar couplers).
    ///
    /// Every group of buses joined by such branches is merged into its lowest
    /// bus: device references are remapped, the other buses and the couplers
    /// are deactivated and `bus_map_arr` records where each bus went. Returns
    /// the number of merged buses.
    pub fn process_reducible_branches(&mut self) -> usize {
        let br = &self.branch_data;
        let flags = in_service(&br.f, &br.t, &br.active, &self.bus_data.active);
        let couplers: Vec<usize> = (0..br.len())
            .filter(|&k| flags[k] && br.reducible[k])
            .collect();
        if couplers.is_empty() {
            return 0;
        }

        let terminals: Vec<(usize, usize)> = couplers.iter().map(|&k| (br.f[k], br.t[k])).collect();
        let adj = adjacency(self.nbus, &terminals);
        let involved: Vec<bool> = (0..self.nbus)
            .map(|i| self.bus_data.active[i] && adj.outer_view(i).map_or(false, |r| r.nnz() > 0))
            .collect();

        let mut bus_map: Vec<usize> = (0..self.nbus).collect();
        let mut merged = 0;
        let bus = &mut self.bus_data;
        for group in find_islands(&adj, &involved) {
            let Some((&keep, rest)) = group.split_first() else {
                continue;
            };
            for &i in rest {
                bus_map[i] = keep;
                if type_rank(bus.bus_types[i]) > type_rank(bus.bus_types[keep]) {
                    bus.bus_types[keep] = bus.bus_types[i];
                }
                bus.installed_power[keep] += bus.installed_power[i];
                bus.q_fixed[keep] += bus.q_fixed[i];
                bus.q_shared_total[keep] += bus.q_shared_total[i];
                bus.srap_available_power[keep] += bus.srap_available_power[i];
                bus.active[i] = false;
                merged += 1;
            }
        }

        for &k in &couplers {
            self.branch_data.active[k] = false;
        }
        self.branch_data.remap_buses(&bus_map);
        self.generator_data.remap_buses(&bus_map);
        self.battery_data.remap_buses(&bus_map);
        self.load_data.remap_buses(&bus_map);
        self.shunt_data.remap_buses(&bus_map);
        self.hvdc_data.remap_buses(&bus_map);
        self.vsc_data.remap_buses(&bus_map);

        // compose with any earlier reduction
        for target in self.bus_map_arr.iter_mut() {
            *target = bus_map[*target];
        }
        self.topology_performed = true;
        self.reset_calculations();
        debug!(couplers = couplers.len(), merged, "reducible branches collapsed");
        merged
    }

    /// Split the circuit into one circuit per connected group of active buses.
    ///
    /// Reducible branches are collapsed on a copy first, so this circuit is
    /// left untouched; call [`Self::process_reducible_branches`] to reduce it
    /// in place. Elements are kept in an island when all their buses belong
    /// to it; indices are renumbered from zero and `original_idx` keeps the
    /// position in this circuit. Islands without a slack bus are returned as
    /// well.
    pub fn split_into_islands(&self, options: &IslandOptions) -> Vec<NumericalCircuit> {
        let base = if self.has_reducible_branches() {
            let mut reduced = self.clone();
            reduced.process_reducible_branches();
            Cow::Owned(reduced)
        } else {
            Cow::Borrowed(self)
        };
        let groups = base.islands(options);
        let total = groups.len();

        let islands: Vec<NumericalCircuit> = groups
            .iter()
            .filter(|g| !(options.ignore_single_node_islands && g.len() == 1))
            .map(|g| base.island(g))
            .collect();

        info!(
            islands = total,
            kept = islands.len(),
            nbus = base.nbus,
            "circuit split into islands"
        );
        islands
    }

    fn has_reducible_branches(&self) -> bool {
        let br = &self.branch_data;
        (0..br.len()).any(|k| br.active[k] && br.reducible[k])
    }

    /// Slice of the circuit spanning `buses` (sorted).
    pub fn island(&self, buses: &[usize]) -> NumericalCircuit {
        let mut bus_map = vec![None; self.nbus];
        for (new, &old) in buses.iter().enumerate() {
            bus_map[old] = Some(new);
        }
        let inside = |i: usize| bus_map[i].is_some();

        let br = &self.branch_data;
        let br_idx = rows_where(br.len(), |k| inside(br.f[k]) && inside(br.t[k]));
        let mut branch_map = vec![None; br.len()];
        for (new, &old) in br_idx.iter().enumerate() {
            branch_map[old] = Some(new);
        }

        let gens = &self.generator_data;
        let gen_idx = rows_where(gens.len(), |k| inside(gens.bus_idx[k]));
        let mut gen_map = vec![None; gens.len()];
        for (new, &old) in gen_idx.iter().enumerate() {
            gen_map[old] = Some(new);
        }

        let batt = &self.battery_data;
        let batt_idx = rows_where(batt.len(), |k| inside(batt.units.bus_idx[k]));
        let loads = &self.load_data;
        let load_idx = rows_where(loads.len(), |k| inside(loads.bus_idx[k]));
        let shunts = &self.shunt_data;
        let shunt_idx = rows_where(shunts.len(), |k| inside(shunts.bus_idx[k]));
        let hvdc = &self.hvdc_data;
        let hvdc_idx = rows_where(hvdc.len(), |k| inside(hvdc.f[k]) && inside(hvdc.t[k]));
        let vsc = &self.vsc_data;
        let vsc_idx = rows_where(vsc.len(), |k| inside(vsc.f[k]) && inside(vsc.t[k]));

        let fluid = &self.fluid_data;
        // hydro nodes and paths are not tied to buses and stay whole
        let fluid_data = FluidData {
            nodes: fluid.nodes.clone(),
            paths: fluid.paths.clone(),
            turbines: fluid.turbines.slice_by_generator(&gen_map),
            pumps: fluid.pumps.slice_by_generator(&gen_map),
            p2xs: fluid.p2xs.slice_by_generator(&gen_map),
        };

        let mut nc = NumericalCircuit::new(self.sbase, self.t_idx, self.options.clone());
        nc.bus_data = self.bus_data.slice(buses);
        nc.branch_data = br.slice(&br_idx, &bus_map);
        nc.generator_data = gens.slice(&gen_idx, &bus_map);
        nc.battery_data = batt.slice(&batt_idx, &bus_map);
        nc.load_data = loads.slice(&load_idx, &bus_map);
        nc.shunt_data = shunts.slice(&shunt_idx, &bus_map);
        nc.hvdc_data = hvdc.slice(&hvdc_idx, &bus_map);
        nc.vsc_data = vsc.slice(&vsc_idx, &bus_map, &branch_map);
        nc.fluid_data = fluid_data;
        nc.topology_performed = self.topology_performed;
        nc.recount();
        nc.update_reactive_shares();
        nc.any_pf_control = nc.nvsc > 0 || nc.branch_data.any_control();
        nc
    }
}
