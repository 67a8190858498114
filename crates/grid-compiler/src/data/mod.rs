//! Struct-of-arrays storage for compiled devices.
//!
//! Every struct holds one `Vec` per attribute, indexed by element position in
//! network order. Rows are never removed: a disconnected element keeps its row
//! with `active = false`. `slice` produces the rows of an island with bus
//! indices translated through a bus map (`None` for buses outside the island).

mod branch;
mod bus;
mod fluid;
mod hvdc;
mod load;
mod machine;

pub use branch::{BranchData, BranchKind};
pub use bus::{BusData, BusType};
pub use fluid::{FluidInjectionData, FluidNodeData, FluidPathData};
pub use hvdc::{HvdcData, VscData};
pub use load::{LoadData, LoadKind, ShuntData};
pub use machine::{BatteryData, GeneratorData, MachineData};

/// Rows of `values` at `idx`, in `idx` order.
pub(crate) fn pick<T: Clone>(values: &[T], idx: &[usize]) -> Vec<T> {
    idx.iter().map(|&i| values[i].clone()).collect()
}

/// New index of bus `bus`; buses outside the map keep their index.
#[inline]
pub(crate) fn remap_bus(bus_map: &[Option<usize>], bus: usize) -> usize {
    bus_map.get(bus).copied().flatten().unwrap_or(bus)
}

pub(crate) fn remap_all(bus_map: &[Option<usize>], buses: &[usize], idx: &[usize]) -> Vec<usize> {
    idx.iter().map(|&i| remap_bus(bus_map, buses[i])).collect()
}

pub(crate) fn remap_opt(
    bus_map: &[Option<usize>],
    buses: &[Option<usize>],
    idx: &[usize],
) -> Vec<Option<usize>> {
    idx.iter()
        .map(|&i| buses[i].and_then(|b| bus_map.get(b).copied().flatten()))
        .collect()
}
