//! # grid-core: Power Grid Device Graph
//!
//! Provides the device-level description of a power network that the numerical
//! circuit compiler consumes.
//!
//! ## Design Philosophy
//!
//! Networks are modeled as **undirected multigraphs** where:
//! - **Nodes**: buses and single-terminal devices (generators, batteries, loads,
//!   static generators, external grids, current injections, shunts) plus fluid
//!   nodes and the turbines/pumps attached to them
//! - **Edges**: two-terminal devices (lines, DC lines, transformers, series
//!   reactances, UPFCs, HVDC links, converters) and fluid paths
//!
//! Single-terminal devices reference their bus by [`BusId`]; edges connect the
//! graph nodes of their terminal buses so topology queries work on the graph
//! directly. Every time-varying attribute is a [`Profile`]: a snapshot value
//! plus an optional series indexed by time step.
//!
//! ## Quick Start
//!
//! ```rust
//! use grid_core::*;
//!
//! let mut network = Network::new();
//! network.add_bus(Bus::new(BusId::new(0), "Bus 1").with_vnom(138.0).as_slack());
//! network.add_bus(Bus::new(BusId::new(1), "Bus 2").with_vnom(138.0));
//!
//! network.add_device(Node::Generator(
//!     Generator::new(GenId::new(0), "Gen 1", BusId::new(0)).with_p(50.0),
//! ));
//! network.add_device(Node::Load(Load::new(LoadId::new(0), "Load 1", BusId::new(1), 50.0, 10.0)));
//!
//! network
//!     .connect(Edge::Line(Line::new(
//!         BranchCommon::new(BranchId::new(0), "Line 1-2", BusId::new(0), BusId::new(1)),
//!         0.01,
//!         0.1,
//!         0.02,
//!     )))
//!     .unwrap();
//!
//! assert_eq!(network.stats().num_buses, 2);
//! ```
//!
//! ## Modules
//!
//! - [`devices`] - Device structs stored on the graph
//! - [`profile`] - Snapshot plus time-series values
//! - [`units`] - Unit newtypes and per-unit conversion
//! - [`diagnostics`] - Accumulating warnings/errors
//! - [`graph_utils`] - Bus-level topology (statistics, islands)

use petgraph::{prelude::*, Undirected};
use serde::{Deserialize, Serialize};

pub mod devices;
pub mod diagnostics;
pub mod error;
pub mod graph_utils;
pub mod profile;
pub mod units;

pub use devices::*;
pub use diagnostics::{category, DiagnosticIssue, Diagnostics, Severity};
pub use error::{GridError, GridResult};
pub use graph_utils::*;
pub use petgraph::graph::NodeIndex;
pub use profile::Profile;
pub use units::{Degrees, Kilovolts, Megavars, MegavoltAmperes, Megawatts, PerUnit, Radians};

// Newtype wrappers for IDs for type safety
macro_rules! define_id {
    ($($name:ident),* $(,)?) => {
        $(
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name(usize);

            impl $name {
                #[inline]
                pub fn new(value: usize) -> Self {
                    $name(value)
                }
                #[inline]
                pub fn value(&self) -> usize {
                    self.0
                }
            }
        )*
    };
}

define_id!(
    BusId,
    BranchId,
    GenId,
    BatteryId,
    LoadId,
    ShuntId,
    HvdcId,
    VscId,
    FluidNodeId,
    FluidPathId,
    FluidInjectionId,
);

// Enum to represent different types of nodes in the graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Node {
    Bus(Bus),
    Generator(Generator),
    Battery(Battery),
    Load(Load),
    StaticGenerator(StaticGenerator),
    ExternalGrid(ExternalGrid),
    CurrentInjection(CurrentInjection),
    Shunt(Shunt),
    ControllableShunt(ControllableShunt),
    FluidNode(FluidNode),
    FluidInjection(FluidInjection),
}

// Enum to represent different types of edges in the graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Edge {
    Line(Line),
    DcLine(DcLine),
    Transformer(Transformer),
    SeriesReactance(SeriesReactance),
    Upfc(Upfc),
    Hvdc(Hvdc),
    Vsc(Vsc),
    FluidPath(FluidPath),
}

/// The core power network graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    pub graph: Graph<Node, Edge, Undirected>,
    /// System base power
    pub sbase: MegavoltAmperes,
    /// Number of time steps carried by the profiles (0 for snapshot-only models)
    pub time_steps: usize,
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}

// Buses and injections are nodes while branches, DC links and converters are
// edges, so connectivity is explicit in the graph and node/edge insertion order
// fixes the element order of every compiled array.

impl Network {
    pub fn new() -> Self {
        Self {
            graph: Graph::new_undirected(),
            sbase: MegavoltAmperes::DEFAULT_BASE,
            time_steps: 0,
        }
    }

    pub fn with_time_steps(mut self, time_steps: usize) -> Self {
        self.time_steps = time_steps;
        self
    }

    pub fn add_bus(&mut self, bus: Bus) -> NodeIndex {
        self.graph.add_node(Node::Bus(bus))
    }

    /// Add a single-terminal device (or fluid node) as an unconnected node.
    pub fn add_device(&mut self, node: Node) -> NodeIndex {
        self.graph.add_node(node)
    }

    /// Add a two-terminal device as an edge between the graph nodes of its terminals.
    pub fn connect(&mut self, edge: Edge) -> GridResult<EdgeIndex> {
        let (a, b) = match &edge {
            Edge::FluidPath(path) => (
                self.fluid_node_index(path.source)?,
                self.fluid_node_index(path.target)?,
            ),
            _ => {
                let (from, to) = edge.terminals().ok_or_else(|| {
                    GridError::Network(format!("edge '{}' has no bus terminals", edge.label()))
                })?;
                (self.bus_node_index(from)?, self.bus_node_index(to)?)
            }
        };
        Ok(self.graph.add_edge(a, b, edge))
    }

    /// Graph node holding the bus with the given id.
    pub fn bus_node_index(&self, id: BusId) -> GridResult<NodeIndex> {
        self.graph
            .node_indices()
            .find(|&idx| matches!(&self.graph[idx], Node::Bus(b) if b.id == id))
            .ok_or_else(|| GridError::Reference(format!("bus {} not found", id.value())))
    }

    fn fluid_node_index(&self, id: FluidNodeId) -> GridResult<NodeIndex> {
        self.graph
            .node_indices()
            .find(|&idx| matches!(&self.graph[idx], Node::FluidNode(n) if n.id == id))
            .ok_or_else(|| GridError::Reference(format!("fluid node {} not found", id.value())))
    }

    /// Compute basic statistics about the network
    pub fn stats(&self) -> NetworkStats {
        let mut stats = NetworkStats::default();

        for node in self.graph.node_weights() {
            match node {
                Node::Bus(_) => stats.num_buses += 1,
                Node::Generator(g) => {
                    stats.num_generators += 1;
                    stats.total_gen_capacity_mw += g.unit.pmax;
                }
                Node::Battery(b) => {
                    stats.num_batteries += 1;
                    stats.total_gen_capacity_mw += b.unit.pmax;
                }
                Node::Load(l) => {
                    stats.num_loads += 1;
                    stats.total_load_mw += l.p.value;
                    stats.total_load_mvar += l.q.value;
                }
                Node::StaticGenerator(_)
                | Node::ExternalGrid(_)
                | Node::CurrentInjection(_) => stats.num_loads += 1,
                Node::Shunt(_) | Node::ControllableShunt(_) => stats.num_shunts += 1,
                Node::FluidNode(_) | Node::FluidInjection(_) => stats.num_fluid_elements += 1,
            }
        }

        for edge in self.graph.edge_weights() {
            match edge {
                Edge::Hvdc(_) => stats.num_hvdc += 1,
                Edge::Vsc(_) => stats.num_vsc += 1,
                Edge::FluidPath(_) => stats.num_fluid_elements += 1,
                _ => stats.num_branches += 1,
            }
        }
        stats
    }

    /// Validate network data for issues that break compilation or solvers.
    ///
    /// Checks dangling bus references, profile lengths against `time_steps`
    /// and the presence of a slack bus. Populates the provided `Diagnostics`.
    pub fn validate_into(&self, diag: &mut Diagnostics) {
        let stats = self.stats();

        if stats.num_buses == 0 {
            diag.add_error(category::VALIDATION, "Network has no buses");
            return;
        }

        let bus_ids: std::collections::HashSet<BusId> = self.buses().iter().map(|b| b.id).collect();

        for node in self.graph.node_weights() {
            for bus in node.bus_refs() {
                if !bus_ids.contains(&bus) {
                    diag.add_error_with_entity(
                        category::REFERENCE,
                        &format!("References missing bus {}", bus.value()),
                        node.label(),
                    );
                }
            }
        }
        for edge in self.graph.edge_weights() {
            for bus in edge.bus_refs() {
                if !bus_ids.contains(&bus) {
                    diag.add_error_with_entity(
                        category::REFERENCE,
                        &format!("References missing bus {}", bus.value()),
                        edge.label(),
                    );
                }
            }
        }

        if self.time_steps > 0 {
            for node in self.graph.node_weights() {
                if let Some(len) = node.profile_lengths().into_iter().find(|&n| n != 0 && n != self.time_steps) {
                    diag.add_warning_with_entity(
                        category::VALIDATION,
                        &format!(
                            "Profile has {} steps but the network has {}",
                            len, self.time_steps
                        ),
                        node.label(),
                    );
                }
            }
        }

        if !self.buses().iter().any(|b| b.is_slack) {
            diag.add_warning(category::TOPOLOGY, "Network has no slack bus");
        }

        if stats.num_branches == 0 && stats.num_buses > 1 {
            diag.add_warning(category::TOPOLOGY, "Network has multiple buses but no branches");
        }
    }

    /// Get all buses in insertion order
    pub fn buses(&self) -> Vec<&Bus> {
        self.graph
            .node_weights()
            .filter_map(|n| match n {
                Node::Bus(b) => Some(b),
                _ => None,
            })
            .collect()
    }

    pub fn generators(&self) -> Vec<&Generator> {
        self.graph
            .node_weights()
            .filter_map(|n| match n {
                Node::Generator(g) => Some(g),
                _ => None,
            })
            .collect()
    }

    pub fn batteries(&self) -> Vec<&Battery> {
        self.graph
            .node_weights()
            .filter_map(|n| match n {
                Node::Battery(b) => Some(b),
                _ => None,
            })
            .collect()
    }

    pub fn loads(&self) -> Vec<&Load> {
        self.graph
            .node_weights()
            .filter_map(|n| match n {
                Node::Load(l) => Some(l),
                _ => None,
            })
            .collect()
    }

    pub fn static_generators(&self) -> Vec<&StaticGenerator> {
        self.graph
            .node_weights()
            .filter_map(|n| match n {
                Node::StaticGenerator(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn external_grids(&self) -> Vec<&ExternalGrid> {
        self.graph
            .node_weights()
            .filter_map(|n| match n {
                Node::ExternalGrid(e) => Some(e),
                _ => None,
            })
            .collect()
    }

    pub fn current_injections(&self) -> Vec<&CurrentInjection> {
        self.graph
            .node_weights()
            .filter_map(|n| match n {
                Node::CurrentInjection(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    pub fn shunts(&self) -> Vec<&Shunt> {
        self.graph
            .node_weights()
            .filter_map(|n| match n {
                Node::Shunt(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn controllable_shunts(&self) -> Vec<&ControllableShunt> {
        self.graph
            .node_weights()
            .filter_map(|n| match n {
                Node::ControllableShunt(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn fluid_nodes(&self) -> Vec<&FluidNode> {
        self.graph
            .node_weights()
            .filter_map(|n| match n {
                Node::FluidNode(f) => Some(f),
                _ => None,
            })
            .collect()
    }

    pub fn fluid_injections(&self) -> Vec<&FluidInjection> {
        self.graph
            .node_weights()
            .filter_map(|n| match n {
                Node::FluidInjection(f) => Some(f),
                _ => None,
            })
            .collect()
    }

    pub fn lines(&self) -> Vec<&Line> {
        self.graph
            .edge_weights()
            .filter_map(|e| match e {
                Edge::Line(l) => Some(l),
                _ => None,
            })
            .collect()
    }

    pub fn dc_lines(&self) -> Vec<&DcLine> {
        self.graph
            .edge_weights()
            .filter_map(|e| match e {
                Edge::DcLine(l) => Some(l),
                _ => None,
            })
            .collect()
    }

    pub fn transformers(&self) -> Vec<&Transformer> {
        self.graph
            .edge_weights()
            .filter_map(|e| match e {
                Edge::Transformer(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    pub fn series_reactances(&self) -> Vec<&SeriesReactance> {
        self.graph
            .edge_weights()
            .filter_map(|e| match e {
                Edge::SeriesReactance(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn upfcs(&self) -> Vec<&Upfc> {
        self.graph
            .edge_weights()
            .filter_map(|e| match e {
                Edge::Upfc(u) => Some(u),
                _ => None,
            })
            .collect()
    }

    pub fn hvdc_links(&self) -> Vec<&Hvdc> {
        self.graph
            .edge_weights()
            .filter_map(|e| match e {
                Edge::Hvdc(h) => Some(h),
                _ => None,
            })
            .collect()
    }

    pub fn converters(&self) -> Vec<&Vsc> {
        self.graph
            .edge_weights()
            .filter_map(|e| match e {
                Edge::Vsc(v) => Some(v),
                _ => None,
            })
            .collect()
    }

    pub fn fluid_paths(&self) -> Vec<&FluidPath> {
        self.graph
            .edge_weights()
            .filter_map(|e| match e {
                Edge::FluidPath(p) => Some(p),
                _ => None,
            })
            .collect()
    }
}

/// Statistics about a network's size and capacity
#[derive(Debug, Clone, Default)]
pub struct NetworkStats {
    pub num_buses: usize,
    pub num_generators: usize,
    pub num_batteries: usize,
    /// Loads, static generators, external grids and current injections
    pub num_loads: usize,
    pub num_shunts: usize,
    /// AC/DC branches (lines, transformers, UPFC, series reactances)
    pub num_branches: usize,
    pub num_hvdc: usize,
    pub num_vsc: usize,
    pub num_fluid_elements: usize,
    pub total_load_mw: f64,
    pub total_load_mvar: f64,
    pub total_gen_capacity_mw: f64,
}

impl std::fmt::Display for NetworkStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} buses, {} branches, {} hvdc, {} vsc, {} gens ({:.0} MW), {} loads ({:.0} MW)",
            self.num_buses,
            self.num_branches,
            self.num_hvdc,
            self.num_vsc,
            self.num_generators + self.num_batteries,
            self.total_gen_capacity_mw,
            self.num_loads,
            self.total_load_mw
        )
    }
}

impl Node {
    /// Returns a human-readable label for the node.
    pub fn label(&self) -> &str {
        match self {
            Node::Bus(bus) => &bus.name,
            Node::Generator(g) => &g.unit.name,
            Node::Battery(b) => &b.unit.name,
            Node::Load(l) => &l.name,
            Node::StaticGenerator(s) => &s.name,
            Node::ExternalGrid(e) => &e.name,
            Node::CurrentInjection(c) => &c.name,
            Node::Shunt(s) => &s.name,
            Node::ControllableShunt(s) => &s.name,
            Node::FluidNode(f) => &f.name,
            Node::FluidInjection(f) => &f.name,
        }
    }

    /// Buses this device refers to (own bus and remote control bus).
    pub fn bus_refs(&self) -> Vec<BusId> {
        let mut refs = Vec::with_capacity(2);
        match self {
            Node::Bus(_) | Node::FluidNode(_) | Node::FluidInjection(_) => {}
            Node::Generator(g) => {
                refs.push(g.unit.bus);
                refs.extend(g.unit.control_bus);
            }
            Node::Battery(b) => {
                refs.push(b.unit.bus);
                refs.extend(b.unit.control_bus);
            }
            Node::Load(l) => refs.push(l.bus),
            Node::StaticGenerator(s) => refs.push(s.bus),
            Node::ExternalGrid(e) => refs.push(e.bus),
            Node::CurrentInjection(c) => refs.push(c.bus),
            Node::Shunt(s) => refs.push(s.bus),
            Node::ControllableShunt(s) => {
                refs.push(s.bus);
                refs.extend(s.control_bus);
            }
        }
        refs
    }

    fn profile_lengths(&self) -> Vec<usize> {
        match self {
            Node::Bus(b) => vec![b.active.len()],
            Node::Generator(Generator { unit, .. }) | Node::Battery(Battery { unit, .. }) => {
                vec![unit.active.len(), unit.p.len(), unit.vset.len(), unit.pf.len()]
            }
            Node::Load(l) => vec![l.active.len(), l.p.len(), l.q.len()],
            Node::StaticGenerator(s) => vec![s.active.len(), s.p.len(), s.q.len()],
            Node::ExternalGrid(e) => vec![e.active.len(), e.p.len(), e.q.len(), e.vm.len()],
            Node::CurrentInjection(c) => vec![c.active.len(), c.ir.len(), c.ii.len()],
            Node::Shunt(s) => vec![s.active.len(), s.g.len(), s.b.len()],
            Node::ControllableShunt(s) => vec![s.active.len(), s.b.len(), s.vset.len()],
            Node::FluidNode(f) => vec![f.inflow.len()],
            Node::FluidInjection(_) => Vec::new(),
        }
    }
}

impl Edge {
    /// Returns a human-readable label for the edge.
    pub fn label(&self) -> &str {
        match self {
            Edge::Line(l) => &l.common.name,
            Edge::DcLine(l) => &l.common.name,
            Edge::Transformer(t) => &t.common.name,
            Edge::SeriesReactance(s) => &s.common.name,
            Edge::Upfc(u) => &u.common.name,
            Edge::Hvdc(h) => &h.name,
            Edge::Vsc(v) => &v.name,
            Edge::FluidPath(p) => &p.name,
        }
    }

    /// Terminal buses (from, to); `None` for fluid paths.
    pub fn terminals(&self) -> Option<(BusId, BusId)> {
        match self {
            Edge::Line(l) => Some((l.common.from_bus, l.common.to_bus)),
            Edge::DcLine(l) => Some((l.common.from_bus, l.common.to_bus)),
            Edge::Transformer(t) => Some((t.common.from_bus, t.common.to_bus)),
            Edge::SeriesReactance(s) => Some((s.common.from_bus, s.common.to_bus)),
            Edge::Upfc(u) => Some((u.common.from_bus, u.common.to_bus)),
            Edge::Hvdc(h) => Some((h.from_bus, h.to_bus)),
            Edge::Vsc(v) => Some((v.from_bus, v.to_bus)),
            Edge::FluidPath(_) => None,
        }
    }

    /// Terminal buses plus any regulated bus.
    pub fn bus_refs(&self) -> Vec<BusId> {
        let mut refs: Vec<BusId> = self
            .terminals()
            .map(|(f, t)| vec![f, t])
            .unwrap_or_default();
        if let Edge::Transformer(t) = self {
            refs.extend(t.regulation_bus);
        }
        if let Edge::Vsc(v) = self {
            for target in [v.control1_target, v.control2_target].into_iter().flatten() {
                if let ControlTarget::Bus(b) = target {
                    refs.push(b);
                }
            }
        }
        refs
    }
}
