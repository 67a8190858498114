use grid_core::{Battery, Generator, Machine, Network};

use super::ExtractionContext;
use crate::bus_control::{set_bus_control_voltage, ControlPriority, ControlRequest};
use crate::data::{BatteryData, GeneratorData, MachineData};
use crate::error::CompileResult;
use crate::options::DispatchOverride;

/// A generating unit whose rows go through the shared machine extraction.
pub trait DispatchableInjection {
    const DEVICE: &'static str;
    const PRIORITY: ControlPriority;

    fn machine(&self) -> &Machine;

    /// Active power imposed by an external dispatch for row `k`.
    fn dispatched_p(dispatch: &DispatchOverride, k: usize) -> Option<f64>;
}

impl DispatchableInjection for Generator {
    const DEVICE: &'static str = "Generator";
    const PRIORITY: ControlPriority = ControlPriority::Generator;

    fn machine(&self) -> &Machine {
        &self.unit
    }

    fn dispatched_p(dispatch: &DispatchOverride, k: usize) -> Option<f64> {
        dispatch.generator_p(k)
    }
}

impl DispatchableInjection for Battery {
    const DEVICE: &'static str = "Battery";
    const PRIORITY: ControlPriority = ControlPriority::Battery;

    fn machine(&self) -> &Machine {
        &self.unit
    }

    fn dispatched_p(dispatch: &DispatchOverride, k: usize) -> Option<f64> {
        dispatch.battery_p(k)
    }
}

/// Reactive power of a unit running at a fixed power factor.
pub(crate) fn q_from_pf(p: f64, pf: f64) -> f64 {
    if pf.abs() < 1e-12 || pf.abs() >= 1.0 {
        0.0
    } else {
        p * (1.0 - pf * pf).sqrt() / pf
    }
}

fn fill_machine_row<D: DispatchableInjection>(
    device: &D,
    k: usize,
    data: &mut MachineData,
    ctx: &mut ExtractionContext,
) -> CompileResult<()> {
    let unit = device.machine();
    let t = ctx.t_idx;
    let i = ctx.bus_map.resolve(unit.bus, D::DEVICE, &unit.name)?;
    let ctrl_bus = ctx.bus_map.resolve_opt(unit.control_bus, D::DEVICE, &unit.name)?;

    let p = ctx
        .dispatch
        .and_then(|d| D::dispatched_p(d, k))
        .unwrap_or_else(|| unit.p.at(t));
    let active = unit.active.at(t);

    data.names[k] = unit.name.clone();
    data.idtags[k] = unit.idtag.clone();
    data.bus_idx[k] = i;
    data.ctrl_bus[k] = ctrl_bus;
    data.active[k] = active;
    data.dispatchable[k] = unit.dispatchable;
    data.controllable[k] = unit.is_controlled;
    data.p[k] = p;
    data.pf[k] = unit.pf.at(t);
    data.v[k] = unit.vset.at(t);
    data.pmin[k] = unit.pmin;
    data.pmax[k] = unit.pmax;
    data.installed_p[k] = unit.snom.value();
    data.cost_0[k] = unit.cost0.at(t);
    data.cost_1[k] = unit.cost1.at(t);
    data.cost_2[k] = unit.cost2.at(t);
    data.startup_cost[k] = unit.startup_cost;
    data.shutdown_cost[k] = unit.shutdown_cost;
    data.ramp_up[k] = unit.ramp_up;
    data.ramp_down[k] = unit.ramp_down;
    data.min_time_up[k] = unit.min_time_up;
    data.min_time_down[k] = unit.min_time_down;
    data.r0[k] = unit.r0;
    data.x0[k] = unit.x0;
    data.r1[k] = unit.r1;
    data.x1[k] = unit.x1;
    data.r2[k] = unit.r2;
    data.x2[k] = unit.x2;
    data.srap_enabled[k] = unit.srap_enabled.at(t);
    data.mttf[k] = unit.mttf;
    data.mttr[k] = unit.mttr;

    // capability curve limits follow the compiled dispatch
    let (qmin, qmax) = match &unit.q_curve {
        Some(curve) if !curve.points.is_empty() => curve.limits_at(p),
        _ => (unit.qmin, unit.qmax),
    };
    data.qmin[k] = qmin;
    data.qmax[k] = qmax;

    if active {
        let bus = &mut ctx.bus_data;
        bus.installed_power[i] += unit.snom.value();
        if data.srap_enabled[k] && p > 0.0 {
            bus.srap_available_power[i] += p;
        }

        if unit.is_controlled {
            bus.q_shared_total[i] += qmax;
            let request = ControlRequest::local(i, data.v[k], D::PRIORITY).with_remote(ctrl_bus);
            set_bus_control_voltage(
                &mut ctx.bus_data,
                &mut ctx.controls,
                &request,
                ctx.options.use_stored_guess,
                &mut ctx.diagnostics,
            );
        } else {
            bus.q_fixed[i] += q_from_pf(p, data.pf[k]);
        }
    }
    Ok(())
}

pub fn extract_generators(
    network: &Network,
    ctx: &mut ExtractionContext,
) -> CompileResult<GeneratorData> {
    let generators = network.generators();
    let mut data = MachineData::new(generators.len());
    for (k, gen) in generators.into_iter().enumerate() {
        fill_machine_row(gen, k, &mut data, ctx)?;
    }
    Ok(data)
}

pub fn extract_batteries(
    network: &Network,
    ctx: &mut ExtractionContext,
) -> CompileResult<BatteryData> {
    let batteries = network.batteries();
    let mut data = BatteryData::new(batteries.len());
    for (k, battery) in batteries.into_iter().enumerate() {
        fill_machine_row(battery, k, &mut data.units, ctx)?;
        data.enom[k] = battery.enom;
        data.min_soc[k] = battery.min_soc;
        data.max_soc[k] = battery.max_soc;
        data.soc_0[k] = battery.soc0;
        data.e_min[k] = battery.enom * battery.min_soc;
        data.e_max[k] = battery.enom * battery.max_soc;
        data.charge_efficiency[k] = battery.charge_efficiency;
        data.discharge_efficiency[k] = battery.discharge_efficiency;
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::BusType;
    use crate::extract::{extract_buses, BusIndexMap};
    use crate::options::CompileOptions;
    use grid_core::{
        BatteryId, Bus, BusId, GenId, Node, Profile, ReactiveCapabilityCurve,
    };

    fn network() -> Network {
        let mut network = Network::new().with_time_steps(2);
        network.add_bus(Bus::new(BusId::new(0), "B0").as_slack());
        network.add_bus(Bus::new(BusId::new(1), "B1"));
        network.add_bus(Bus::new(BusId::new(2), "B2"));
        network
    }

    fn compile(
        network: &Network,
        dispatch: Option<&DispatchOverride>,
        t_idx: Option<usize>,
    ) -> (GeneratorData, BatteryData, crate::data::BusData) {
        let map = BusIndexMap::from_network(network);
        let options = CompileOptions::default();
        let mut ctx = ExtractionContext::new(network, &map, t_idx, &options, dispatch).unwrap();
        extract_buses(network, &mut ctx).unwrap();
        let gens = extract_generators(network, &mut ctx).unwrap();
        let batteries = extract_batteries(network, &mut ctx).unwrap();
        (gens, batteries, ctx.bus_data)
    }

    #[test]
    fn test_generator_rows_and_accumulators() {
        let mut network = network();
        let mut gen = Generator::new(GenId::new(0), "G1", BusId::new(1)).with_vset(1.03);
        gen.unit.p = Profile::with_series(40.0, vec![10.0, 20.0]);
        gen.unit.snom = grid_core::MegavoltAmperes(120.0);
        gen.unit.qmax = 50.0;
        network.add_device(Node::Generator(gen));

        let (gens, _, buses) = compile(&network, None, Some(1));
        assert_eq!(gens.p, vec![20.0]);
        assert_eq!(gens.bus_idx, vec![1]);
        assert_eq!(buses.bus_types[1], BusType::Pv);
        assert_eq!(buses.v0[1].re, 1.03);
        assert_eq!(buses.installed_power[1], 120.0);
        assert_eq!(buses.q_shared_total[1], 50.0);
        assert_eq!(buses.srap_available_power[1], 20.0);
    }

    #[test]
    fn test_dispatch_override_and_capability_curve() {
        let mut network = network();
        let mut gen = Generator::new(GenId::new(0), "G1", BusId::new(2)).with_p(10.0);
        gen.unit.q_curve = Some(ReactiveCapabilityCurve::new(vec![
            (0.0, -100.0, 100.0),
            (100.0, -20.0, 20.0),
        ]));
        network.add_device(Node::Generator(gen));

        let dispatch = DispatchOverride {
            generator_power: vec![60.0],
            generator_shedding: vec![10.0],
            ..DispatchOverride::default()
        };
        let (gens, _, _) = compile(&network, Some(&dispatch), None);
        assert_eq!(gens.p, vec![50.0]);
        assert_eq!(gens.qmin, vec![-60.0]);
        assert_eq!(gens.qmax, vec![60.0]);
    }

    #[test]
    fn test_uncontrolled_generator_feeds_fixed_q() {
        let mut network = network();
        let mut gen = Generator::new(GenId::new(0), "G1", BusId::new(1))
            .with_p(80.0)
            .uncontrolled();
        gen.unit.pf = Profile::fixed(0.8);
        network.add_device(Node::Generator(gen));

        let (_, _, buses) = compile(&network, None, None);
        assert_eq!(buses.bus_types[1], BusType::Pq);
        approx::assert_relative_eq!(buses.q_fixed[1], 60.0, epsilon = 1e-9);
    }

    #[test]
    fn test_remote_controlled_battery() {
        let mut network = network();
        let mut battery = Battery::new(BatteryId::new(0), "BESS", BusId::new(1)).with_vset(1.01);
        battery.unit.control_bus = Some(BusId::new(2));
        battery.enom = 200.0;
        battery.min_soc = 0.2;
        battery.max_soc = 0.9;
        network.add_device(Node::Battery(battery));

        let (_, batteries, buses) = compile(&network, None, None);
        assert_eq!(batteries.units.ctrl_bus, vec![Some(2)]);
        assert_eq!(batteries.e_min, vec![40.0]);
        assert_eq!(batteries.e_max, vec![180.0]);
        assert_eq!(buses.bus_types[1], BusType::P);
        assert_eq!(buses.bus_types[2], BusType::Pqv);
        assert_eq!(buses.v0[2].re, 1.01);
    }

    #[test]
    fn test_missing_bus_is_fatal() {
        let mut network = network();
        network.add_device(Node::Generator(Generator::new(GenId::new(0), "G9", BusId::new(9))));
        let map = BusIndexMap::from_network(&network);
        let options = CompileOptions::default();
        let mut ctx = ExtractionContext::new(&network, &map, None, &options, None).unwrap();
        extract_buses(&network, &mut ctx).unwrap();
        assert!(extract_generators(&network, &mut ctx).is_err());
    }
}
