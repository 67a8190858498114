//! Entry points: compile a [`Network`] into a [`NumericalCircuit`].

use grid_core::Network;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::debug;

use crate::circuit::NumericalCircuit;
use crate::error::CompileResult;
use crate::extract::{
    extract_batteries, extract_branches, extract_buses, extract_fluid, extract_generators,
    extract_hvdc, extract_loads, extract_shunts, extract_vsc, BusIndexMap, ExtractionContext,
};
use crate::options::{CompileOptions, DispatchOverride};

/// Compile the network at `t_idx` (`None` for the snapshot).
///
/// Extractors run in their fixed order over one [`ExtractionContext`]; the
/// voltage-control conflicts they find end up in the circuit diagnostics.
/// A `bus_map` built once with [`BusIndexMap::from_network`] can be shared
/// between calls on the same network.
pub fn compile_numerical_circuit_at(
    network: &Network,
    t_idx: Option<usize>,
    options: &CompileOptions,
    bus_map: Option<&BusIndexMap>,
    dispatch: Option<&DispatchOverride>,
) -> CompileResult<NumericalCircuit> {
    let owned_map;
    let bus_map = match bus_map {
        Some(map) => map,
        None => {
            owned_map = BusIndexMap::from_network(network);
            &owned_map
        }
    };
    debug!(?t_idx, nbus = bus_map.len(), "compiling numerical circuit");

    let mut ctx = ExtractionContext::new(network, bus_map, t_idx, options, dispatch)?;
    extract_buses(network, &mut ctx)?;
    let generator_data = extract_generators(network, &mut ctx)?;
    let battery_data = extract_batteries(network, &mut ctx)?;
    let shunt_data = extract_shunts(network, &mut ctx)?;
    let load_data = extract_loads(network, &mut ctx)?;
    let branch_data = extract_branches(network, &mut ctx)?;
    let hvdc_data = extract_hvdc(network, &mut ctx)?;
    let vsc_data = extract_vsc(network, &mut ctx)?;
    let fluid_data = extract_fluid(network, &ctx)?;

    let mut nc = NumericalCircuit::new(ctx.sbase, t_idx, options.clone());
    nc.bus_data = ctx.bus_data;
    nc.generator_data = generator_data;
    nc.battery_data = battery_data;
    nc.shunt_data = shunt_data;
    nc.load_data = load_data;
    nc.branch_data = branch_data;
    nc.hvdc_data = hvdc_data;
    nc.vsc_data = vsc_data;
    nc.fluid_data = fluid_data;
    nc.diagnostics = ctx.diagnostics;
    nc.recount();
    nc.update_reactive_shares();
    nc.any_pf_control = nc.nvsc > 0 || nc.branch_data.any_control();

    debug!(
        ?t_idx,
        nbus = nc.nbus,
        nbr = nc.nbr,
        ngen = nc.ngen,
        nload = nc.nload,
        issues = nc.diagnostics.len(),
        "numerical circuit compiled"
    );
    Ok(nc)
}

/// Reusable compiler bound to one network.
#[derive(Debug, Clone)]
pub struct NumericalCircuitCompiler<'a> {
    network: &'a Network,
    options: CompileOptions,
    bus_map: BusIndexMap,
}

impl<'a> NumericalCircuitCompiler<'a> {
    pub fn new(network: &'a Network) -> Self {
        Self {
            network,
            options: CompileOptions::default(),
            bus_map: BusIndexMap::from_network(network),
        }
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    /// Use a precomputed bus index map instead of the network order.
    pub fn with_bus_map(mut self, bus_map: BusIndexMap) -> Self {
        self.bus_map = bus_map;
        self
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Snapshot compile.
    pub fn compile(&self) -> CompileResult<NumericalCircuit> {
        self.compile_at(None, None)
    }

    pub fn compile_at(
        &self,
        t_idx: Option<usize>,
        dispatch: Option<&DispatchOverride>,
    ) -> CompileResult<NumericalCircuit> {
        compile_numerical_circuit_at(
            self.network,
            t_idx,
            &self.options,
            Some(&self.bus_map),
            dispatch,
        )
    }

    /// One independent circuit per time index, in the order given.
    ///
    /// Runs on the rayon pool when the `parallel` feature is enabled. The
    /// first failing step aborts the whole series.
    pub fn compile_time_series(&self, t_indices: &[usize]) -> CompileResult<Vec<NumericalCircuit>> {
        debug!(steps = t_indices.len(), "compiling time series");

        #[cfg(feature = "parallel")]
        let circuits = t_indices
            .par_iter()
            .map(|&t| self.compile_at(Some(t), None))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let circuits = t_indices
            .iter()
            .map(|&t| self.compile_at(Some(t), None))
            .collect();

        circuits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::BusType;
    use crate::error::CompileError;
    use grid_core::{
        BranchCommon, BranchId, Bus, BusId, Edge, GenId, Generator, Line, Load, LoadId, Node,
        Profile,
    };

    fn network() -> Network {
        let mut network = Network::new().with_time_steps(3);
        let mut slack = Bus::new(BusId::new(0), "Slack");
        slack.is_slack = true;
        network.add_bus(slack);
        network.add_bus(Bus::new(BusId::new(1), "Load bus"));

        let mut gen = Generator::new(GenId::new(0), "G", BusId::new(0));
        gen.unit.p = Profile::with_series(50.0, vec![40.0, 50.0, 60.0]);
        network.add_device(Node::Generator(gen));
        let mut load = Load::new(LoadId::new(0), "L", BusId::new(1), 45.0, 10.0);
        load.p = Profile::with_series(45.0, vec![35.0, 45.0, 55.0]);
        network.add_device(Node::Load(load));
        network
            .connect(Edge::Line(Line::new(
                BranchCommon::new(BranchId::new(0), "L01", BusId::new(0), BusId::new(1)),
                0.01,
                0.1,
                0.02,
            )))
            .unwrap();
        network
    }

    #[test]
    fn test_snapshot_compile() {
        let network = network();
        let nc = NumericalCircuitCompiler::new(&network).compile().unwrap();
        assert_eq!(nc.nbus, 2);
        assert_eq!(nc.nbr, 1);
        assert_eq!(nc.ngen, 1);
        assert_eq!(nc.nload, 1);
        assert_eq!(nc.bus_data.bus_types, vec![BusType::Slack, BusType::Pq]);
        assert_eq!(nc.generator_data.p, vec![50.0]);
        assert_eq!(nc.bus_map_arr, vec![0, 1]);
    }

    #[test]
    fn test_time_series_keeps_order() {
        let network = network();
        let compiler = NumericalCircuitCompiler::new(&network);
        let series = compiler.compile_time_series(&[2, 0]).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].t_idx, Some(2));
        assert_eq!(series[0].generator_data.p, vec![60.0]);
        assert_eq!(series[1].generator_data.p, vec![40.0]);
        assert_eq!(series[1].load_data.s[0].re, 35.0);
    }

    #[test]
    fn test_time_index_out_of_range() {
        let network = network();
        let err = NumericalCircuitCompiler::new(&network)
            .compile_time_series(&[0, 5])
            .unwrap_err();
        assert!(matches!(err, CompileError::TimeIndexOutOfRange { t_idx: 5, .. }));
    }

    #[test]
    fn test_dispatch_override() {
        let network = network();
        let dispatch = DispatchOverride {
            generator_power: vec![70.0],
            ..DispatchOverride::default()
        };
        let nc = NumericalCircuitCompiler::new(&network)
            .compile_at(Some(1), Some(&dispatch))
            .unwrap();
        assert_eq!(nc.generator_data.p, vec![70.0]);
    }
}
