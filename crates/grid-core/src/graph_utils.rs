use crate::{Edge, Network, Node};
use anyhow::{anyhow, Result};
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use std::collections::{HashSet, VecDeque};

/// Bus-level summary statistics (degree distribution, density, component count).
///
/// Only bus nodes and electrical edges count; injection nodes hang off the
/// graph unconnected and would otherwise show up as isolated components.
#[derive(Debug)]
pub struct GraphStats {
    pub bus_count: usize,
    pub edge_count: usize,
    pub connected_components: usize,
    pub min_degree: usize,
    pub avg_degree: f64,
    pub max_degree: usize,
    pub density: f64,
}

/// Size of one connected bus group.
#[derive(Debug)]
pub struct IslandSummary {
    pub island_id: usize,
    pub bus_count: usize,
}

/// Island membership of a single bus.
#[derive(Debug)]
pub struct BusAssignment {
    pub node_index: usize,
    pub label: String,
    pub island_id: usize,
}

/// Aggregated island analysis result.
#[derive(Debug)]
pub struct IslandAnalysis {
    pub islands: Vec<IslandSummary>,
    pub assignments: Vec<BusAssignment>,
}

fn is_bus(network: &Network, node: NodeIndex) -> bool {
    matches!(network.graph[node], Node::Bus(_))
}

/// Whether the edge joins two buses electrically (fluid paths never do).
fn is_electrical(edge: &Edge, include_hvdc: bool) -> bool {
    match edge {
        Edge::FluidPath(_) => false,
        Edge::Hvdc(_) => include_hvdc,
        _ => true,
    }
}

fn bus_neighbors(network: &Network, node: NodeIndex, include_hvdc: bool) -> Vec<NodeIndex> {
    network
        .graph
        .edges(node)
        .filter(|e| is_electrical(e.weight(), include_hvdc))
        .map(|e| if e.source() == node { e.target() } else { e.source() })
        .collect()
}

/// Degree and density statistics over the bus graph (HVDC links included).
pub fn graph_stats(network: &Network) -> Result<GraphStats> {
    let buses: Vec<NodeIndex> = network
        .graph
        .node_indices()
        .filter(|&n| is_bus(network, n))
        .collect();
    let bus_count = buses.len();
    let edge_count = network
        .graph
        .edge_weights()
        .filter(|e| is_electrical(e, true))
        .count();

    let degrees: Vec<usize> = buses
        .iter()
        .map(|&n| bus_neighbors(network, n, true).len())
        .collect();
    let min_degree = *degrees.iter().min().unwrap_or(&0);
    let max_degree = *degrees.iter().max().unwrap_or(&0);
    let avg_degree = if bus_count == 0 {
        0.0
    } else {
        degrees.iter().copied().sum::<usize>() as f64 / bus_count as f64
    };
    let density = if bus_count < 2 {
        0.0
    } else {
        2.0 * edge_count as f64 / (bus_count as f64 * (bus_count as f64 - 1.0))
    };
    let connected_components = find_islands(network, true)?.islands.len();
    Ok(GraphStats {
        bus_count,
        edge_count,
        connected_components,
        min_degree,
        avg_degree,
        max_degree,
        density,
    })
}

/// Labels connected bus groups with a breadth-first search.
///
/// This is a structural view of the device graph: active flags are ignored.
/// The compiled circuit has its own island splitter that honours them.
pub fn find_islands(network: &Network, include_hvdc: bool) -> Result<IslandAnalysis> {
    let mut visited = HashSet::new();
    let mut islands = Vec::new();
    let mut assignments = Vec::new();
    let mut island_id = 0;
    for start in network.graph.node_indices() {
        if !is_bus(network, start) || visited.contains(&start) {
            continue;
        }
        let mut queue = VecDeque::new();
        queue.push_back(start);
        let mut members = Vec::new();
        while let Some(node) = queue.pop_front() {
            if !visited.insert(node) {
                continue;
            }
            members.push(node);
            for neighbor in bus_neighbors(network, node, include_hvdc) {
                if !is_bus(network, neighbor) {
                    return Err(anyhow!(
                        "edge from '{}' ends on non-bus node '{}'",
                        network.graph[node].label(),
                        network.graph[neighbor].label()
                    ));
                }
                if !visited.contains(&neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }
        islands.push(IslandSummary {
            island_id,
            bus_count: members.len(),
        });
        for node in members {
            assignments.push(BusAssignment {
                node_index: node.index(),
                label: network.graph[node].label().to_string(),
                island_id,
            });
        }
        island_id += 1;
    }
    assignments.sort_by_key(|assignment| assignment.node_index);
    Ok(IslandAnalysis {
        islands,
        assignments,
    })
}
