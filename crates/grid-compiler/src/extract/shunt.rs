use grid_core::Network;
use num_complex::Complex64;

use super::ExtractionContext;
use crate::bus_control::{set_bus_control_voltage, ControlPriority, ControlRequest};
use crate::data::ShuntData;
use crate::error::CompileResult;

/// Fixed shunts first, then controllable shunts.
pub fn extract_shunts(network: &Network, ctx: &mut ExtractionContext) -> CompileResult<ShuntData> {
    let fixed = network.shunts();
    let switched = network.controllable_shunts();
    let offset = fixed.len();
    let mut data = ShuntData::new(offset + switched.len());
    let t = ctx.t_idx;

    for (k, shunt) in fixed.into_iter().enumerate() {
        let i = ctx.bus_map.resolve(shunt.bus, "Shunt", &shunt.name)?;
        let active = shunt.active.at(t);
        let b = shunt.b.at(t);

        data.names[k] = shunt.name.clone();
        data.idtags[k] = shunt.idtag.clone();
        data.bus_idx[k] = i;
        data.active[k] = active;
        data.y[k] = Complex64::new(shunt.g.at(t), b);
        data.mttf[k] = shunt.mttf;
        data.mttr[k] = shunt.mttr;

        if active {
            ctx.bus_data.q_fixed[i] += b;
        }
    }

    for (j, shunt) in switched.into_iter().enumerate() {
        let k = offset + j;
        let i = ctx.bus_map.resolve(shunt.bus, "Controllable shunt", &shunt.name)?;
        let ctrl_bus = ctx
            .bus_map
            .resolve_opt(shunt.control_bus, "Controllable shunt", &shunt.name)?;
        let active = shunt.active.at(t);
        let b = shunt.b.at(t);

        data.names[k] = shunt.name.clone();
        data.idtags[k] = shunt.idtag.clone();
        data.bus_idx[k] = i;
        data.ctrl_bus[k] = ctrl_bus;
        data.active[k] = active;
        data.y[k] = Complex64::new(shunt.g.at(t), b);
        data.controllable[k] = shunt.is_controlled;
        data.qmin[k] = shunt.b_min;
        data.qmax[k] = shunt.b_max;
        data.vset[k] = shunt.vset.at(t);
        data.cost[k] = shunt.cost.at(t);
        data.mttf[k] = shunt.mttf;
        data.mttr[k] = shunt.mttr;

        if !active {
            continue;
        }
        if shunt.is_controlled {
            ctx.bus_data.q_shared_total[i] += shunt.b_max;
            let request = ControlRequest::local(i, data.vset[k], ControlPriority::Shunt)
                .with_remote(ctrl_bus);
            set_bus_control_voltage(
                &mut ctx.bus_data,
                &mut ctx.controls,
                &request,
                ctx.options.use_stored_guess,
                &mut ctx.diagnostics,
            );
        } else {
            ctx.bus_data.q_fixed[i] += b;
        }
    }

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::BusType;
    use crate::extract::{extract_buses, BusIndexMap};
    use crate::options::CompileOptions;
    use grid_core::{Bus, BusId, ControllableShunt, Node, Profile, Shunt, ShuntId};

    #[test]
    fn test_fixed_then_controllable_rows() {
        let mut network = Network::new();
        network.add_bus(Bus::new(BusId::new(0), "B0"));
        network.add_bus(Bus::new(BusId::new(1), "B1"));
        network.add_device(Node::ControllableShunt(ControllableShunt {
            id: ShuntId::new(1),
            idtag: "svc".into(),
            name: "SVC".into(),
            bus: BusId::new(1),
            active: Profile::fixed(true),
            g: Profile::fixed(0.0),
            b: Profile::fixed(10.0),
            b_min: -50.0,
            b_max: 50.0,
            vset: Profile::fixed(1.04),
            is_controlled: true,
            control_bus: None,
            cost: Profile::fixed(0.0),
            mttf: 0.0,
            mttr: 0.0,
        }));
        network.add_device(Node::Shunt(Shunt::new(ShuntId::new(0), "Cap", BusId::new(0), 0.5, 20.0)));

        let map = BusIndexMap::from_network(&network);
        let options = CompileOptions::default();
        let mut ctx = ExtractionContext::new(&network, &map, None, &options, None).unwrap();
        extract_buses(&network, &mut ctx).unwrap();
        let data = extract_shunts(&network, &mut ctx).unwrap();

        assert_eq!(data.names, vec!["Cap".to_string(), "SVC".to_string()]);
        assert_eq!(data.y[0], Complex64::new(0.5, 20.0));
        assert_eq!(data.controllable, vec![false, true]);
        assert_eq!(data.qmax[1], 50.0);
        assert_eq!(ctx.bus_data.q_fixed[0], 20.0);
        assert_eq!(ctx.bus_data.q_shared_total[1], 50.0);
        assert_eq!(ctx.bus_data.bus_types[1], BusType::Pv);
        assert_eq!(ctx.bus_data.v0[1].re, 1.04);
    }
}
