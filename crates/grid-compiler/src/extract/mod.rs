//! Per-device-type extractors.
//!
//! Each extractor reads one device family from the [`Network`] at the context's
//! time index and returns its struct-of-arrays. Bus-level accumulators (bus
//! types, voltage guess, installed power, reactive pools) live in the shared
//! [`ExtractionContext`], so the call order matters and is fixed:
//!
//! 1. [`extract_buses`]
//! 2. [`extract_generators`], [`extract_batteries`]
//! 3. [`extract_shunts`]
//! 4. [`extract_loads`]
//! 5. [`extract_branches`]
//! 6. [`extract_hvdc`], [`extract_vsc`]
//! 7. [`extract_fluid`]

mod branch;
mod bus;
mod fluid;
mod hvdc;
mod load;
mod machine;
mod shunt;

use std::collections::HashMap;

use grid_core::{BranchId, BusId, Diagnostics, Network, Node};

use crate::bus_control::VoltageControls;
use crate::data::BusData;
use crate::error::{CompileError, CompileResult};
use crate::options::{CompileOptions, DispatchOverride};

pub use branch::extract_branches;
pub use bus::extract_buses;
pub use fluid::{extract_fluid, FluidData};
pub use hvdc::{extract_hvdc, extract_vsc};
pub use load::extract_loads;
pub use machine::{extract_batteries, extract_generators, DispatchableInjection};
pub(crate) use machine::q_from_pf;
pub use shunt::extract_shunts;

/// Dense 0-based index of every bus, in network order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BusIndexMap {
    map: HashMap<BusId, usize>,
}

impl BusIndexMap {
    pub fn from_network(network: &Network) -> Self {
        let mut map = HashMap::new();
        for node in network.graph.node_weights() {
            if let Node::Bus(bus) = node {
                let next = map.len();
                map.entry(bus.id).or_insert(next);
            }
        }
        Self { map }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn get(&self, id: BusId) -> Option<usize> {
        self.map.get(&id).copied()
    }

    /// Index of `id`, or the fatal error naming the referencing device.
    pub fn resolve(&self, id: BusId, device: &'static str, name: &str) -> CompileResult<usize> {
        self.get(id).ok_or_else(|| CompileError::MissingBus {
            device,
            name: name.to_string(),
            bus: id.value(),
        })
    }

    pub fn resolve_opt(
        &self,
        id: Option<BusId>,
        device: &'static str,
        name: &str,
    ) -> CompileResult<Option<usize>> {
        id.map(|b| self.resolve(b, device, name)).transpose()
    }
}

/// Shared state threaded through every extractor.
pub struct ExtractionContext<'a> {
    pub t_idx: Option<usize>,
    pub options: &'a CompileOptions,
    pub dispatch: Option<&'a DispatchOverride>,
    pub bus_map: &'a BusIndexMap,
    /// System base (MVA)
    pub sbase: f64,
    pub bus_data: BusData,
    pub controls: VoltageControls,
    /// Row of every branch, filled by [`extract_branches`]
    pub branch_index: HashMap<BranchId, usize>,
    pub diagnostics: Diagnostics,
}

impl<'a> ExtractionContext<'a> {
    pub fn new(
        network: &Network,
        bus_map: &'a BusIndexMap,
        t_idx: Option<usize>,
        options: &'a CompileOptions,
        dispatch: Option<&'a DispatchOverride>,
    ) -> CompileResult<Self> {
        if let Some(t) = t_idx {
            if t >= network.time_steps {
                return Err(CompileError::TimeIndexOutOfRange {
                    t_idx: t,
                    time_steps: network.time_steps,
                });
            }
        }
        let nbus = bus_map.len();
        Ok(Self {
            t_idx,
            options,
            dispatch,
            bus_map,
            sbase: network.sbase.value(),
            bus_data: BusData::new(nbus),
            controls: VoltageControls::new(nbus),
            branch_index: HashMap::new(),
            diagnostics: Diagnostics::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_core::Bus;

    #[test]
    fn test_bus_index_map_follows_network_order() {
        let mut network = Network::new();
        network.add_bus(Bus::new(BusId::new(10), "A"));
        network.add_bus(Bus::new(BusId::new(3), "B"));
        let map = BusIndexMap::from_network(&network);
        assert_eq!(map.get(BusId::new(10)), Some(0));
        assert_eq!(map.get(BusId::new(3)), Some(1));

        let err = map.resolve(BusId::new(4), "Load", "L1").unwrap_err();
        assert!(matches!(err, CompileError::MissingBus { bus: 4, .. }));
        assert_eq!(map.resolve_opt(None, "Load", "L1").unwrap(), None);
    }

    #[test]
    fn test_time_index_out_of_range() {
        let network = Network::new().with_time_steps(2);
        let map = BusIndexMap::from_network(&network);
        let options = CompileOptions::default();
        assert!(ExtractionContext::new(&network, &map, Some(1), &options, None).is_ok());
        let err = ExtractionContext::new(&network, &map, Some(2), &options, None)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            CompileError::TimeIndexOutOfRange {
                t_idx: 2,
                time_steps: 2
            }
        ));
    }
}
