use std::collections::HashMap;

use grid_core::{FluidInjection, FluidInjectionKind, FluidNodeId, GenId, Network};
use serde::Serialize;

use super::ExtractionContext;
use crate::data::{FluidInjectionData, FluidNodeData, FluidPathData};
use crate::error::{CompileError, CompileResult};

/// Hydro coupling of a compiled circuit.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FluidData {
    pub nodes: FluidNodeData,
    pub paths: FluidPathData,
    pub turbines: FluidInjectionData,
    pub pumps: FluidInjectionData,
    pub p2xs: FluidInjectionData,
}

impl FluidData {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

// hm3 -> m3
const LEVEL_SCALE: f64 = 1e6;

fn injection_rows(
    units: &[&FluidInjection],
    node_index: &HashMap<FluidNodeId, usize>,
    gen_index: &HashMap<GenId, usize>,
) -> CompileResult<FluidInjectionData> {
    let mut data = FluidInjectionData::new(units.len());
    for (k, unit) in units.iter().enumerate() {
        data.names[k] = unit.name.clone();
        data.idtags[k] = unit.idtag.clone();
        data.plant_idx[k] = *node_index
            .get(&unit.plant)
            .ok_or_else(|| CompileError::MissingFluidNode {
                device: "Fluid injection",
                name: unit.name.clone(),
                node: unit.plant.value(),
            })?;
        data.generator_idx[k] = *gen_index.get(&unit.generator).ok_or_else(|| {
            CompileError::MissingGenerator {
                name: unit.name.clone(),
                generator: unit.generator.value(),
            }
        })?;
        data.efficiency[k] = unit.efficiency;
        data.max_flow_rate[k] = unit.max_flow_rate;
    }
    Ok(data)
}

/// Fluid nodes, then paths, turbines, pumps and P2X units.
pub fn extract_fluid(network: &Network, ctx: &ExtractionContext) -> CompileResult<FluidData> {
    let t = ctx.t_idx;
    let nodes = network.fluid_nodes();
    let mut node_data = FluidNodeData::new(nodes.len());
    let mut node_index = HashMap::with_capacity(nodes.len());

    for (k, node) in nodes.into_iter().enumerate() {
        node_index.insert(node.id, k);
        node_data.names[k] = node.name.clone();
        node_data.idtags[k] = node.idtag.clone();
        node_data.min_level[k] = node.min_level * LEVEL_SCALE;
        node_data.max_level[k] = node.max_level * LEVEL_SCALE;
        node_data.initial_level[k] = node.initial_level * LEVEL_SCALE;
        node_data.inflow[k] = node.inflow.at(t);
        node_data.spillage_cost[k] = node.spillage_cost.at(t);
        node_data.min_soc[k] = node.min_soc.at(t);
        node_data.max_soc[k] = node.max_soc.at(t);
    }

    let paths = network.fluid_paths();
    let mut path_data = FluidPathData::new(paths.len());
    for (k, path) in paths.into_iter().enumerate() {
        let lookup = |id: FluidNodeId| {
            node_index
                .get(&id)
                .copied()
                .ok_or_else(|| CompileError::MissingFluidNode {
                    device: "Fluid path",
                    name: path.name.clone(),
                    node: id.value(),
                })
        };
        path_data.names[k] = path.name.clone();
        path_data.idtags[k] = path.idtag.clone();
        path_data.source[k] = lookup(path.source)?;
        path_data.target[k] = lookup(path.target)?;
        path_data.min_flow[k] = path.min_flow;
        path_data.max_flow[k] = path.max_flow;
    }

    let gen_index: HashMap<GenId, usize> = network
        .generators()
        .iter()
        .enumerate()
        .map(|(k, g)| (g.id, k))
        .collect();

    let units = network.fluid_injections();
    let of_kind = |kind: FluidInjectionKind| {
        units
            .iter()
            .copied()
            .filter(|u| u.kind == kind)
            .collect::<Vec<_>>()
    };

    Ok(FluidData {
        nodes: node_data,
        paths: path_data,
        turbines: injection_rows(&of_kind(FluidInjectionKind::Turbine), &node_index, &gen_index)?,
        pumps: injection_rows(&of_kind(FluidInjectionKind::Pump), &node_index, &gen_index)?,
        p2xs: injection_rows(&of_kind(FluidInjectionKind::P2x), &node_index, &gen_index)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::BusIndexMap;
    use crate::options::CompileOptions;
    use grid_core::{
        Bus, BusId, Edge, FluidInjectionId, FluidNode, FluidPath, FluidPathId, Generator, Node,
    };

    fn unit(id: usize, kind: FluidInjectionKind, plant: usize, gen: usize) -> FluidInjection {
        FluidInjection {
            id: FluidInjectionId::new(id),
            idtag: format!("u{}", id),
            name: format!("U{}", id),
            kind,
            plant: FluidNodeId::new(plant),
            generator: GenId::new(gen),
            efficiency: 1.2,
            max_flow_rate: 50.0,
        }
    }

    fn network() -> Network {
        let mut network = Network::new();
        network.add_bus(Bus::new(BusId::new(0), "B0").as_slack());
        network.add_device(Node::Generator(Generator::new(GenId::new(5), "G5", BusId::new(0))));
        network.add_device(Node::Generator(Generator::new(GenId::new(6), "G6", BusId::new(0))));
        let mut upper = FluidNode::new(FluidNodeId::new(0), "Upper");
        upper.max_level = 2.5;
        network.add_device(Node::FluidNode(upper));
        network.add_device(Node::FluidNode(FluidNode::new(FluidNodeId::new(1), "Lower")));
        network
    }

    #[test]
    fn test_fluid_rows() {
        let mut network = network();
        network
            .connect(Edge::FluidPath(FluidPath {
                id: FluidPathId::new(0),
                idtag: "river".into(),
                name: "River".into(),
                source: FluidNodeId::new(0),
                target: FluidNodeId::new(1),
                min_flow: 0.0,
                max_flow: 100.0,
            }))
            .unwrap();
        network.add_device(Node::FluidInjection(unit(0, FluidInjectionKind::Pump, 1, 6)));
        network.add_device(Node::FluidInjection(unit(1, FluidInjectionKind::Turbine, 0, 5)));

        let map = BusIndexMap::from_network(&network);
        let options = CompileOptions::default();
        let ctx = ExtractionContext::new(&network, &map, None, &options, None).unwrap();
        let data = extract_fluid(&network, &ctx).unwrap();

        assert_eq!(data.nodes.max_level[0], 2.5e6);
        assert_eq!(data.paths.source, vec![0]);
        assert_eq!(data.paths.target, vec![1]);
        assert_eq!(data.turbines.plant_idx, vec![0]);
        assert_eq!(data.turbines.generator_idx, vec![0]);
        assert_eq!(data.pumps.generator_idx, vec![1]);
        assert!(data.p2xs.is_empty());
    }

    #[test]
    fn test_unknown_generator_is_fatal() {
        let mut network = network();
        network.add_device(Node::FluidInjection(unit(0, FluidInjectionKind::Turbine, 0, 99)));

        let map = BusIndexMap::from_network(&network);
        let options = CompileOptions::default();
        let ctx = ExtractionContext::new(&network, &map, None, &options, None).unwrap();
        let err = extract_fluid(&network, &ctx).unwrap_err();
        assert!(matches!(err, CompileError::MissingGenerator { generator: 99, .. }));
    }
}
