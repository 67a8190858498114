//! # grid-compiler: Numerical Circuit Compiler
//!
//! Turns a [`grid_core::Network`] device graph into a [`NumericalCircuit`]:
//! flat, index-aligned arrays per device family plus the sparse matrices and
//! index sets that power-flow, OPF and contingency solvers consume.
//!
//! ## Pipeline
//!
//! | Stage | Module | Output |
//! |-------|--------|--------|
//! | Extraction | [`extract`] | `BusData`, `BranchData`, `GeneratorData`, ... |
//! | Voltage-control resolution | [`bus_control`] | bus types and voltage guess |
//! | Connectivity | [`connectivity`] | `Cf`, `Ct`, device incidence |
//! | Admittances | [`admittance`] | `Ybus`, `Yf`, `Yt`, `B'`, `B''`, `Bbus` |
//! | Simulation indices | [`indices`] | `vd`, `pv`, `pq`, control branch sets |
//! | Islands | [`islands`] | one circuit per connected component |
//!
//! Derived quantities are computed on first access and cached in the circuit.
//! After mutating any array directly, call
//! [`NumericalCircuit::reset_calculations`] (or
//! [`NumericalCircuit::consolidate`] when controllers changed) before reading
//! them again.
//!
//! ## Quick Start
//!
//! ```rust
//! use grid_compiler::NumericalCircuitCompiler;
//! use grid_core::*;
//!
//! let mut network = Network::new();
//! network.add_bus(Bus::new(BusId::new(0), "Bus 1").as_slack());
//! network.add_bus(Bus::new(BusId::new(1), "Bus 2"));
//! network.add_device(Node::Load(Load::new(LoadId::new(0), "Load", BusId::new(1), 20.0, 5.0)));
//! network
//!     .connect(Edge::Line(Line::new(
//!         BranchCommon::new(BranchId::new(0), "Line", BusId::new(0), BusId::new(1)),
//!         0.01,
//!         0.1,
//!         0.0,
//!     )))
//!     .unwrap();
//!
//! let mut nc = NumericalCircuitCompiler::new(&network).compile().unwrap();
//! assert_eq!(nc.nbus, 2);
//! assert_eq!(nc.simulation_indices().pq, vec![1]);
//! ```

pub mod admittance;
pub mod bus_control;
pub mod circuit;
pub mod compiler;
pub mod connectivity;
pub mod contingency;
pub mod data;
pub mod error;
pub mod extract;
pub mod indices;
pub mod islands;
pub mod options;

pub use admittance::{AdmittanceMatrices, Sequence};
pub use bus_control::ControlPriority;
pub use circuit::{CircuitKind, DeviceKind, NumericalCircuit};
pub use compiler::{compile_numerical_circuit_at, NumericalCircuitCompiler};
pub use contingency::{ContingencyEvent, ContingencyProperty, Investment};
pub use data::BusType;
pub use error::{CompileError, CompileResult};
pub use extract::BusIndexMap;
pub use indices::SimulationIndices;
pub use options::{BranchImpedanceMode, CompileOptions, DispatchOverride, IslandOptions};
