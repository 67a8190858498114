use grid_core::{ExternalGridMode, Network};
use num_complex::Complex64;

use super::ExtractionContext;
use crate::bus_control::{set_bus_control_voltage, ControlPriority, ControlRequest};
use crate::data::{BusType, LoadData, LoadKind};
use crate::error::CompileResult;

/// Loads, static generators, external grids and current injections, in that
/// order, as ZIP rows in load convention.
///
/// External grid powers are given in load convention as well. A VD-mode grid
/// turns its bus into the slack; a PV-mode grid regulates its bus voltage.
pub fn extract_loads(network: &Network, ctx: &mut ExtractionContext) -> CompileResult<LoadData> {
    let loads = network.loads();
    let static_gens = network.static_generators();
    let grids = network.external_grids();
    let injections = network.current_injections();
    let mut data = LoadData::new(loads.len() + static_gens.len() + grids.len() + injections.len());
    let t = ctx.t_idx;
    let mut k = 0;

    for (ii, load) in loads.into_iter().enumerate() {
        let i = ctx.bus_map.resolve(load.bus, "Load", &load.name)?;
        let shedding = ctx.dispatch.map_or(0.0, |d| d.load_shedding_at(ii));
        let active = load.active.at(t);
        let q = load.q.at(t);

        data.names[k] = load.name.clone();
        data.idtags[k] = load.idtag.clone();
        data.kinds[k] = LoadKind::Load;
        data.bus_idx[k] = i;
        data.active[k] = active;
        data.s[k] = Complex64::new(load.p.at(t) - shedding, q);
        data.i[k] = Complex64::new(load.ir.at(t), load.ii.at(t));
        data.y[k] = Complex64::new(load.g.at(t), load.b.at(t));
        data.cost[k] = load.cost.at(t);
        data.mttf[k] = load.mttf;
        data.mttr[k] = load.mttr;

        if active {
            ctx.bus_data.q_fixed[i] -= q;
        }
        k += 1;
    }

    for sgen in static_gens {
        let i = ctx.bus_map.resolve(sgen.bus, "Static generator", &sgen.name)?;
        let active = sgen.active.at(t);
        let q = sgen.q.at(t);

        data.names[k] = sgen.name.clone();
        data.idtags[k] = sgen.idtag.clone();
        data.kinds[k] = LoadKind::StaticGenerator;
        data.bus_idx[k] = i;
        data.active[k] = active;
        data.s[k] -= Complex64::new(sgen.p.at(t), q);
        data.cost[k] = sgen.cost.at(t);

        if active {
            ctx.bus_data.q_fixed[i] += q;
        }
        k += 1;
    }

    for grid in grids {
        let i = ctx.bus_map.resolve(grid.bus, "External grid", &grid.name)?;
        let active = grid.active.at(t);
        let q = grid.q.at(t);

        data.names[k] = grid.name.clone();
        data.idtags[k] = grid.idtag.clone();
        data.kinds[k] = LoadKind::ExternalGrid;
        data.ext_grid_mode[k] = Some(grid.mode);
        data.bus_idx[k] = i;
        data.active[k] = active;
        data.s[k] += Complex64::new(grid.p.at(t), q);
        data.cost[k] = grid.cost.at(t);

        if active {
            match grid.mode {
                ExternalGridMode::Vd => ctx.bus_data.bus_types[i] = BusType::Slack,
                ExternalGridMode::Pv => {
                    let vm = grid.vm.at(t);
                    data.vset[k] = Some(vm);
                    let request = ControlRequest::local(i, vm, ControlPriority::ExternalGrid);
                    set_bus_control_voltage(
                        &mut ctx.bus_data,
                        &mut ctx.controls,
                        &request,
                        ctx.options.use_stored_guess,
                        &mut ctx.diagnostics,
                    );
                }
                ExternalGridMode::Pq => ctx.bus_data.q_fixed[i] -= q,
            }
        }
        k += 1;
    }

    for inj in injections {
        let i = ctx.bus_map.resolve(inj.bus, "Current injection", &inj.name)?;

        data.names[k] = inj.name.clone();
        data.idtags[k] = inj.idtag.clone();
        data.kinds[k] = LoadKind::CurrentInjection;
        data.bus_idx[k] = i;
        data.active[k] = inj.active.at(t);
        data.i[k] += Complex64::new(inj.ir.at(t), inj.ii.at(t));
        data.cost[k] = inj.cost.at(t);
        k += 1;
    }

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{extract_buses, BusIndexMap};
    use crate::options::{CompileOptions, DispatchOverride};
    use grid_core::{
        Bus, BusId, CurrentInjection, ExternalGrid, Load, LoadId, Node, Profile, StaticGenerator,
    };

    fn grid(mode: ExternalGridMode, bus: usize) -> ExternalGrid {
        ExternalGrid {
            id: LoadId::new(10),
            idtag: "grid".into(),
            name: "Grid".into(),
            bus: BusId::new(bus),
            active: Profile::fixed(true),
            mode,
            p: Profile::fixed(0.0),
            q: Profile::fixed(0.0),
            vm: Profile::fixed(1.01),
            cost: Profile::fixed(0.0),
        }
    }

    #[test]
    fn test_load_rows_in_order() {
        let mut network = Network::new();
        for i in 0..3 {
            network.add_bus(Bus::new(BusId::new(i), format!("B{}", i)));
        }
        network.add_device(Node::ExternalGrid(grid(ExternalGridMode::Vd, 0)));
        network.add_device(Node::StaticGenerator(StaticGenerator {
            id: LoadId::new(1),
            idtag: "pv".into(),
            name: "PV".into(),
            bus: BusId::new(1),
            active: Profile::fixed(true),
            p: Profile::fixed(5.0),
            q: Profile::fixed(1.0),
            cost: Profile::fixed(0.0),
        }));
        network.add_device(Node::Load(Load::new(LoadId::new(0), "L1", BusId::new(1), 20.0, 4.0)));
        network.add_device(Node::CurrentInjection(CurrentInjection {
            id: LoadId::new(2),
            idtag: "ci".into(),
            name: "CI".into(),
            bus: BusId::new(2),
            active: Profile::fixed(true),
            ir: Profile::fixed(2.0),
            ii: Profile::fixed(-1.0),
            cost: Profile::fixed(0.0),
        }));

        let dispatch = DispatchOverride {
            load_shedding: vec![3.0],
            ..DispatchOverride::default()
        };
        let map = BusIndexMap::from_network(&network);
        let options = CompileOptions::default();
        let mut ctx =
            ExtractionContext::new(&network, &map, None, &options, Some(&dispatch)).unwrap();
        extract_buses(&network, &mut ctx).unwrap();
        let data = extract_loads(&network, &mut ctx).unwrap();

        assert_eq!(
            data.kinds,
            vec![
                LoadKind::Load,
                LoadKind::StaticGenerator,
                LoadKind::ExternalGrid,
                LoadKind::CurrentInjection
            ]
        );
        assert_eq!(data.s[0], Complex64::new(17.0, 4.0));
        assert_eq!(data.s[1], Complex64::new(-5.0, -1.0));
        assert_eq!(data.i[3], Complex64::new(2.0, -1.0));
        assert_eq!(ctx.bus_data.q_fixed[1], -3.0);
        assert_eq!(ctx.bus_data.bus_types[0], BusType::Slack);
    }

    #[test]
    fn test_pv_external_grid_regulates_voltage() {
        let mut network = Network::new();
        network.add_bus(Bus::new(BusId::new(0), "B0"));
        network.add_device(Node::ExternalGrid(grid(ExternalGridMode::Pv, 0)));

        let map = BusIndexMap::from_network(&network);
        let options = CompileOptions::default();
        let mut ctx = ExtractionContext::new(&network, &map, None, &options, None).unwrap();
        extract_buses(&network, &mut ctx).unwrap();
        let data = extract_loads(&network, &mut ctx).unwrap();

        assert_eq!(ctx.bus_data.bus_types[0], BusType::Pv);
        assert_eq!(ctx.bus_data.v0[0].re, 1.01);
        assert_eq!(data.vset, vec![Some(1.01)]);
    }
}
