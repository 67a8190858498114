//! End-to-end compilation tests on small networks.

use std::collections::HashSet;

use approx::assert_relative_eq;
use grid_compiler::{
    BusType, CompileOptions, ContingencyEvent, IslandOptions, NumericalCircuitCompiler, Sequence,
};
use grid_core::{
    Battery, BatteryId, BranchCommon, BranchId, Bus, BusId, ControllableShunt,
    ConverterControlType, CurrentInjection, Edge, ExternalGrid, ExternalGridMode, FluidNode,
    FluidNodeId, GenId, Generator, Hvdc, HvdcId, Line, Load, LoadId, Network, Node, Profile, Shunt,
    ShuntId, StaticGenerator, Transformer, Vsc, VscId,
};
use num_complex::Complex64;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn line(id: usize, from: usize, to: usize, r: f64, x: f64, b: f64) -> Edge {
    Edge::Line(Line::new(
        BranchCommon::new(
            BranchId::new(id),
            format!("Line {}-{}", from, to),
            BusId::new(from),
            BusId::new(to),
        ),
        r,
        x,
        b,
    ))
}

/// Slack + 2 PQ buses, generator at the slack, a load at each PQ bus,
/// lines 1-2 and 2-3.
fn three_bus() -> Network {
    let mut network = Network::new().with_time_steps(2);
    network.add_bus(Bus::new(BusId::new(0), "Bus 1").with_vnom(138.0).as_slack());
    network.add_bus(Bus::new(BusId::new(1), "Bus 2").with_vnom(138.0));
    network.add_bus(Bus::new(BusId::new(2), "Bus 3").with_vnom(138.0));

    let mut gen = Generator::new(GenId::new(0), "Gen 1", BusId::new(0)).with_vset(1.03);
    gen.unit.p = Profile::with_series(80.0, vec![70.0, 90.0]);
    network.add_device(Node::Generator(gen));
    network.add_device(Node::Load(Load::new(LoadId::new(0), "Load 2", BusId::new(1), 40.0, 10.0)));
    network.add_device(Node::Load(Load::new(LoadId::new(1), "Load 3", BusId::new(2), 40.0, 15.0)));

    network.connect(line(0, 0, 1, 0.01, 0.1, 0.02)).unwrap();
    network.connect(line(1, 1, 2, 0.02, 0.2, 0.04)).unwrap();
    network
}

#[test]
fn three_bus_scenario() {
    init_tracing();
    let network = three_bus();
    let mut nc = NumericalCircuitCompiler::new(&network).compile().unwrap();

    assert_eq!(nc.nbus, 3);
    assert_eq!(nc.nbr, 2);
    assert_eq!(nc.ngen, 1);
    assert_eq!(nc.nload, 2);
    assert!(nc.diagnostics.is_empty());

    let islands = nc.split_into_islands(&IslandOptions::default());
    assert_eq!(islands.len(), 1);
    assert_eq!(islands[0].bus_data.original_idx, vec![0, 1, 2]);

    let idx = nc.simulation_indices();
    assert_eq!(idx.vd, vec![0]);
    assert_eq!(idx.pq, vec![1, 2]);
    assert!(idx.pv.is_empty());
    assert_eq!(idx.no_slack, vec![1, 2]);

    // controlled generator at the slack seeds the guess
    assert_eq!(nc.bus_data.v0[0], Complex64::new(1.03, 0.0));
    assert_eq!(nc.bus_data.bus_types[0], BusType::Slack);
}

#[test]
fn compiling_twice_is_deterministic() {
    let network = three_bus();
    let compiler = NumericalCircuitCompiler::new(&network);
    let a = compiler.compile().unwrap();
    let b = compiler.compile().unwrap();
    assert!(a == b);
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
}

#[test]
fn conflicting_setpoints_keep_first_writer() {
    let mut network = three_bus();
    network.add_device(Node::Generator(
        Generator::new(GenId::new(1), "Gen A", BusId::new(1)).with_vset(1.02),
    ));
    network.add_device(Node::Generator(
        Generator::new(GenId::new(2), "Gen B", BusId::new(1)).with_vset(1.05),
    ));

    let nc = NumericalCircuitCompiler::new(&network).compile().unwrap();
    assert_eq!(nc.bus_data.bus_types[1], BusType::Pv);
    assert_eq!(nc.bus_data.v0[1], Complex64::new(1.02, 0.0));
    assert_eq!(
        nc.diagnostics
            .issues_matching("Different control voltage set points")
            .count(),
        1
    );
}

#[test]
fn stored_guess_skips_seeding() {
    let mut network = Network::new();
    let mut slack = Bus::new(BusId::new(0), "Bus 1").as_slack();
    slack.vm0 = 0.98;
    network.add_bus(slack);
    network.add_device(Node::Generator(
        Generator::new(GenId::new(0), "Gen", BusId::new(0)).with_vset(1.05),
    ));

    let options = CompileOptions::new().with_stored_guess(true);
    let nc = NumericalCircuitCompiler::new(&network)
        .with_options(options)
        .compile()
        .unwrap();
    assert_relative_eq!(nc.bus_data.v0[0].re, 0.98, epsilon = 1e-12);
}

#[test]
fn single_line_admittance() {
    let mut network = Network::new();
    network.add_bus(Bus::new(BusId::new(0), "A").as_slack());
    network.add_bus(Bus::new(BusId::new(1), "B"));
    network.connect(line(0, 0, 1, 0.01, 0.1, 0.02)).unwrap();

    let mut nc = NumericalCircuitCompiler::new(&network).compile().unwrap();
    let ys = Complex64::new(0.01, 0.1).inv();
    let y = nc.admittances();

    let y01 = y.y(0, 1);
    let y00 = y.y(0, 0);
    assert_relative_eq!(y01.re, -ys.re, epsilon = 1e-9);
    assert_relative_eq!(y01.im, -ys.im, epsilon = 1e-9);
    assert_relative_eq!(y00.re, ys.re, epsilon = 1e-9);
    assert_relative_eq!(y00.im, ys.im + 0.01, epsilon = 1e-9);
    assert_eq!(y.y(1, 0), y01);

    let zero = nc.sequence_admittances(Sequence::Zero).ybus.clone();
    assert_eq!(zero.shape(), (2, 2));
}

#[test]
fn islands_partition_active_buses() {
    let mut network = Network::new();
    for i in 0..6 {
        network.add_bus(Bus::new(BusId::new(i), format!("Bus {}", i)));
    }
    network.connect(line(0, 0, 1, 0.01, 0.1, 0.0)).unwrap();
    network.connect(line(1, 1, 2, 0.01, 0.1, 0.0)).unwrap();
    network.connect(line(2, 3, 4, 0.01, 0.1, 0.0)).unwrap();
    network.connect(line(3, 4, 5, 0.01, 0.1, 0.0)).unwrap();

    let mut nc = NumericalCircuitCompiler::new(&network).compile().unwrap();
    nc.bus_data.active[5] = false;
    nc.reset_calculations();

    let islands = nc.split_into_islands(&IslandOptions::default());
    assert_eq!(islands.len(), 2);

    let mut seen = HashSet::new();
    for island in &islands {
        for &i in &island.bus_data.original_idx {
            assert!(seen.insert(i), "bus {} in two islands", i);
        }
    }
    let active: HashSet<usize> = (0..nc.nbus).filter(|&i| nc.bus_data.active[i]).collect();
    assert_eq!(seen, active);

    // the branch to the inactive bus is left out of the island
    assert_eq!(islands[1].nbr, 1);
    assert_eq!(islands[1].branch_data.original_idx, vec![2]);
}

#[test]
fn contingency_then_revert_restores_arrays() {
    let network = three_bus();
    let mut nc = NumericalCircuitCompiler::new(&network).compile().unwrap();
    let original = nc.clone();

    let events = vec![
        ContingencyEvent::outage("Line 1-2"),
        ContingencyEvent::power_percentage("Load 3", 150.0),
    ];
    let injections = nc.apply_contingencies(&events, false).unwrap();
    assert!(!nc.branch_data.active[1]);
    assert_relative_eq!(injections[2], -20.0, epsilon = 1e-9);
    assert_eq!(nc.islands(&IslandOptions::default()).len(), 2);

    nc.apply_contingencies(&events, true).unwrap();
    assert!(nc == original);
    assert_eq!(nc.islands(&IslandOptions::default()).len(), 1);
}

#[test]
fn time_series_matches_single_steps() {
    let network = three_bus();
    let compiler = NumericalCircuitCompiler::new(&network);
    let series = compiler.compile_time_series(&[0, 1]).unwrap();

    for (t, nc) in series.iter().enumerate() {
        let single = compiler.compile_at(Some(t), None).unwrap();
        assert!(*nc == single);
    }
    assert_eq!(series[0].generator_data.p, vec![70.0]);
    assert_eq!(series[1].generator_data.p, vec![90.0]);
}

#[test]
fn consolidate_after_mutation() {
    let network = three_bus();
    let mut nc = NumericalCircuitCompiler::new(&network).compile().unwrap();
    let installed = nc.bus_data.installed_power[0];
    assert!(installed > 0.0);

    nc.generator_data.active[0] = false;
    let diag = nc.consolidate();
    assert!(diag.is_empty());
    assert_eq!(nc.bus_data.installed_power[0], 0.0);
    assert_eq!(nc.bus_data.q_shared_total[0], 0.0);
    assert_eq!(nc.bus_data.v0[0], Complex64::new(1.0, 0.0));
    // types are never demoted
    assert_eq!(nc.bus_data.bus_types[0], BusType::Slack);
}

#[test]
fn slack_generator_with_remote_target_keeps_types() {
    let mut network = Network::new();
    network.add_bus(Bus::new(BusId::new(0), "Bus 1").as_slack());
    network.add_bus(Bus::new(BusId::new(1), "Bus 2"));
    network.add_bus(Bus::new(BusId::new(2), "Bus 3"));
    network.add_device(Node::Generator(
        Generator::new(GenId::new(0), "Gen", BusId::new(0))
            .with_vset(1.04)
            .with_remote_control(BusId::new(2)),
    ));
    network.connect(line(0, 0, 1, 0.01, 0.1, 0.0)).unwrap();
    network.connect(line(1, 1, 2, 0.01, 0.1, 0.0)).unwrap();

    let mut nc = NumericalCircuitCompiler::new(&network).compile().unwrap();
    assert_eq!(
        nc.bus_data.bus_types,
        vec![BusType::Slack, BusType::Pq, BusType::Pq]
    );
    assert_eq!(nc.bus_data.v0[2], Complex64::new(1.04, 0.0));

    let idx = nc.simulation_indices();
    assert_eq!(idx.vd, vec![0]);
    assert!(idx.p.is_empty());
    assert!(idx.pqv.is_empty());
}

/// One device of every kind: slack bus 0 carries a controlled generator and
/// a PQ external grid.
fn every_device_kind() -> Network {
    let mut network = Network::new();
    network.add_bus(Bus::new(BusId::new(0), "Bus 1").with_vnom(138.0).as_slack());
    for i in 1..4 {
        network.add_bus(Bus::new(BusId::new(i), format!("Bus {}", i + 1)).with_vnom(138.0));
    }
    network.add_bus(Bus::new(BusId::new(4), "DC bus").with_vnom(200.0).as_dc());

    network.add_device(Node::Generator(
        Generator::new(GenId::new(0), "Gen", BusId::new(0)).with_p(60.0).with_vset(1.03),
    ));
    network.add_device(Node::ExternalGrid(ExternalGrid {
        id: LoadId::new(10),
        idtag: "grid".into(),
        name: "Grid".into(),
        bus: BusId::new(0),
        active: Profile::fixed(true),
        mode: ExternalGridMode::Pq,
        p: Profile::fixed(10.0),
        q: Profile::fixed(5.0),
        vm: Profile::fixed(1.0),
        cost: Profile::fixed(0.0),
    }));
    network.add_device(Node::Battery(
        Battery::new(BatteryId::new(0), "Battery", BusId::new(2))
            .with_p(5.0)
            .with_vset(1.01),
    ));
    network.add_device(Node::Load(Load::new(LoadId::new(0), "Load", BusId::new(1), 40.0, 4.0)));
    network.add_device(Node::StaticGenerator(StaticGenerator {
        id: LoadId::new(20),
        idtag: "sgen".into(),
        name: "Static gen".into(),
        bus: BusId::new(1),
        active: Profile::fixed(true),
        p: Profile::fixed(5.0),
        q: Profile::fixed(1.0),
        cost: Profile::fixed(0.0),
    }));
    network.add_device(Node::CurrentInjection(CurrentInjection {
        id: LoadId::new(30),
        idtag: "ci".into(),
        name: "Current injection".into(),
        bus: BusId::new(3),
        active: Profile::fixed(true),
        ir: Profile::fixed(1.0),
        ii: Profile::fixed(0.5),
        cost: Profile::fixed(0.0),
    }));
    network.add_device(Node::Shunt(Shunt::new(ShuntId::new(0), "Shunt", BusId::new(1), 0.0, 2.0)));
    network.add_device(Node::ControllableShunt(ControllableShunt {
        id: ShuntId::new(1),
        idtag: "svc".into(),
        name: "SVC".into(),
        bus: BusId::new(3),
        active: Profile::fixed(true),
        g: Profile::fixed(0.0),
        b: Profile::fixed(3.0),
        b_min: -20.0,
        b_max: 20.0,
        vset: Profile::fixed(1.0),
        is_controlled: true,
        control_bus: None,
        cost: Profile::fixed(0.0),
        mttf: 0.0,
        mttr: 0.0,
    }));
    network.add_device(Node::FluidNode(FluidNode::new(FluidNodeId::new(0), "Reservoir")));

    network.connect(line(0, 0, 1, 0.01, 0.1, 0.02)).unwrap();
    network.connect(line(1, 1, 2, 0.02, 0.2, 0.04)).unwrap();
    network
        .connect(Edge::Transformer(
            Transformer::new(
                BranchCommon::new(BranchId::new(2), "Trafo", BusId::new(2), BusId::new(3)),
                0.005,
                0.08,
                138.0,
                138.0,
            )
            .with_voltage_control(1.0, Some(BusId::new(3))),
        ))
        .unwrap();
    network
        .connect(Edge::Hvdc(Hvdc::new(HvdcId::new(0), "HVDC", BusId::new(1), BusId::new(3))))
        .unwrap();
    let mut vsc = Vsc::new(VscId::new(0), "VSC", BusId::new(4), BusId::new(2));
    vsc.control1 = ConverterControlType::VmAc;
    vsc.control1_val = Profile::fixed(1.01);
    network.connect(Edge::Vsc(vsc)).unwrap();
    network
}

#[test]
fn consolidate_on_fresh_compile_is_a_no_op() {
    init_tracing();
    let network = every_device_kind();
    let compiled = NumericalCircuitCompiler::new(&network).compile().unwrap();
    assert_eq!(compiled.bus_data.q_fixed[0], -5.0);

    let mut again = compiled.clone();
    let conflicts = again.consolidate();
    assert!(conflicts.is_empty());
    assert_eq!(again.bus_data.q_fixed, compiled.bus_data.q_fixed);
    assert_eq!(again.bus_data.bus_types, compiled.bus_data.bus_types);
    assert!(again == compiled);
}
