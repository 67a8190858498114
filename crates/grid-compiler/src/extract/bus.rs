use std::collections::HashMap;

use grid_core::{Network, Node};
use num_complex::Complex64;

use super::ExtractionContext;
use crate::data::BusType;
use crate::error::CompileResult;

/// Dense index of a grouping label, assigned in order of first appearance.
fn group_index(groups: &mut HashMap<String, usize>, label: &Option<String>) -> Option<usize> {
    label.as_ref().map(|name| {
        let next = groups.len();
        *groups.entry(name.clone()).or_insert(next)
    })
}

/// Fill the bus rows of the context.
///
/// Buses flagged as slack start as Slack, every other bus as PQ; the control
/// extractors that follow promote them.
pub fn extract_buses(network: &Network, ctx: &mut ExtractionContext) -> CompileResult<()> {
    let mut substations = HashMap::new();
    let mut areas = HashMap::new();
    let mut zones = HashMap::new();

    for node in network.graph.node_weights() {
        let Node::Bus(bus) = node else {
            continue;
        };
        let i = ctx.bus_map.resolve(bus.id, "Bus", &bus.name)?;
        let data = &mut ctx.bus_data;

        data.names[i] = bus.name.clone();
        data.idtags[i] = bus.idtag.clone();
        data.vnom[i] = bus.vnom.value();
        data.vmin[i] = bus.vmin;
        data.vmax[i] = bus.vmax;
        data.vm_cost[i] = bus.vm_cost;
        data.angle_min[i] = bus.angle_min;
        data.angle_max[i] = bus.angle_max;
        data.active[i] = bus.active.at(ctx.t_idx);
        data.is_dc[i] = bus.is_dc;
        data.bus_types[i] = if bus.is_slack {
            BusType::Slack
        } else {
            BusType::Pq
        };
        data.v0[i] = if ctx.options.use_stored_guess {
            Complex64::from_polar(bus.vm0, bus.va0)
        } else {
            Complex64::new(1.0, 0.0)
        };
        data.substations[i] = group_index(&mut substations, &bus.substation);
        data.areas[i] = group_index(&mut areas, &bus.area);
        data.zones[i] = group_index(&mut zones, &bus.zone);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::BusIndexMap;
    use crate::options::CompileOptions;
    use grid_core::{Bus, BusId, Profile};

    #[test]
    fn test_bus_rows() {
        let mut network = Network::new().with_time_steps(2);
        let mut b0 = Bus::new(BusId::new(0), "B0").with_vnom(132.0).as_slack();
        b0.area = Some("North".into());
        b0.vm0 = 1.02;
        let mut b1 = Bus::new(BusId::new(1), "B1");
        b1.area = Some("South".into());
        b1.active = Profile::with_series(true, vec![true, false]);
        let mut b2 = Bus::new(BusId::new(2), "B2");
        b2.area = Some("North".into());
        network.add_bus(b0);
        network.add_bus(b1);
        network.add_bus(b2);

        let map = BusIndexMap::from_network(&network);
        let options = CompileOptions::default();
        let mut ctx = ExtractionContext::new(&network, &map, Some(1), &options, None).unwrap();
        extract_buses(&network, &mut ctx).unwrap();

        let data = &ctx.bus_data;
        assert_eq!(data.bus_types, vec![BusType::Slack, BusType::Pq, BusType::Pq]);
        assert_eq!(data.active, vec![true, false, true]);
        assert_eq!(data.areas, vec![Some(0), Some(1), Some(0)]);
        assert_eq!(data.substations, vec![None, None, None]);
        assert_eq!(data.vnom[0], 132.0);
        // setpoint-based guess ignores the stored voltage
        assert_eq!(data.v0[0], Complex64::new(1.0, 0.0));
    }

    #[test]
    fn test_stored_guess() {
        let mut network = Network::new();
        let mut b0 = Bus::new(BusId::new(0), "B0");
        b0.vm0 = 1.02;
        b0.va0 = 0.1;
        network.add_bus(b0);

        let map = BusIndexMap::from_network(&network);
        let options = CompileOptions::default().with_stored_guess(true);
        let mut ctx = ExtractionContext::new(&network, &map, None, &options, None).unwrap();
        extract_buses(&network, &mut ctx).unwrap();
        approx::assert_relative_eq!(ctx.bus_data.v0[0].norm(), 1.02, epsilon = 1e-12);
        approx::assert_relative_eq!(ctx.bus_data.v0[0].arg(), 0.1, epsilon = 1e-12);
    }
}
