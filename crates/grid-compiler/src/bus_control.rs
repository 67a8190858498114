//! Bus voltage-control arbitration.
//!
//! Several devices may want to regulate the voltage of the same bus. Each
//! request changes the bus types (PV locally, or P + PQV for remote control)
//! and, unless the stored voltages are used as the initial guess, seeds the
//! voltage of the regulated bus with the device setpoint.
//!
//! Ownership of the voltage slot is explicit: the first request writes it and
//! records its [`ControlPriority`]. A later request with a different setpoint
//! logs one "Different control voltage set points" error and only replaces the
//! setpoint when its priority ranks strictly higher than the owner's. Equal
//! setpoints are silent.

use grid_core::diagnostics::category;
use grid_core::Diagnostics;
use num_complex::Complex64;
use serde::Serialize;
use tracing::warn;

use crate::data::{BusData, BusType};

/// Setpoints closer than this are considered equal.
const SETPOINT_TOL: f64 = 1e-9;

/// Precedence of voltage controllers, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ControlPriority {
    Generator,
    Battery,
    Shunt,
    ExternalGrid,
    Branch,
    Hvdc,
    Vsc,
}

impl ControlPriority {
    /// Whether `self` may take over a slot owned by `owner`.
    #[inline]
    pub fn outranks(self, owner: ControlPriority) -> bool {
        self < owner
    }
}

/// Per-bus record of who wrote the voltage setpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoltageControls {
    owner: Vec<Option<ControlPriority>>,
    setpoint: Vec<f64>,
}

impl VoltageControls {
    pub fn new(nbus: usize) -> Self {
        Self {
            owner: vec![None; nbus],
            setpoint: vec![1.0; nbus],
        }
    }

    #[inline]
    pub fn is_written(&self, bus: usize) -> bool {
        self.owner[bus].is_some()
    }

    pub fn owner(&self, bus: usize) -> Option<ControlPriority> {
        self.owner[bus]
    }

    pub fn setpoint(&self, bus: usize) -> Option<f64> {
        self.owner[bus].map(|_| self.setpoint[bus])
    }
}

/// One device asking to regulate a bus voltage.
#[derive(Debug, Clone, Copy)]
pub struct ControlRequest {
    /// Bus the device is connected to
    pub bus: usize,
    /// Regulated bus when different from `bus`
    pub remote_bus: Option<usize>,
    /// Voltage setpoint (p.u.)
    pub vset: f64,
    pub priority: ControlPriority,
}

impl ControlRequest {
    pub fn local(bus: usize, vset: f64, priority: ControlPriority) -> Self {
        Self {
            bus,
            remote_bus: None,
            vset,
            priority,
        }
    }

    pub fn with_remote(mut self, remote_bus: Option<usize>) -> Self {
        self.remote_bus = remote_bus;
        self
    }

    /// Bus whose voltage ends up regulated.
    pub fn target(&self) -> usize {
        match self.remote_bus {
            Some(j) if j != self.bus => j,
            _ => self.bus,
        }
    }
}

/// Apply a control request: update bus types and seed the controlled voltage.
pub fn set_bus_control_voltage(
    bus_data: &mut BusData,
    controls: &mut VoltageControls,
    request: &ControlRequest,
    use_stored_guess: bool,
    diag: &mut Diagnostics,
) {
    let i = request.bus;
    // a device on the slack bus changes no types, remote target included
    if bus_data.bus_types[i] != BusType::Slack {
        match request.remote_bus {
            Some(j) if j != i => {
                if bus_data.bus_types[j] != BusType::Slack {
                    bus_data.bus_types[j] = BusType::Pqv;
                    bus_data.bus_types[i] = BusType::P;
                }
            }
            _ => bus_data.bus_types[i] = BusType::Pv,
        }
    }

    if !use_stored_guess {
        seed_voltage(
            bus_data,
            controls,
            request.target(),
            request.vset,
            request.priority,
            diag,
        );
    }
}

/// Write a voltage setpoint into the guess of `bus` without touching its type.
pub fn seed_voltage(
    bus_data: &mut BusData,
    controls: &mut VoltageControls,
    bus: usize,
    vset: f64,
    priority: ControlPriority,
    diag: &mut Diagnostics,
) {
    match controls.owner[bus] {
        None => {
            controls.owner[bus] = Some(priority);
            controls.setpoint[bus] = vset;
            bus_data.v0[bus] = Complex64::new(vset, 0.0);
        }
        Some(owner) => {
            let stored = controls.setpoint[bus];
            if (stored - vset).abs() <= SETPOINT_TOL {
                return;
            }
            diag.add_error_with_values(
                category::CONTROL,
                "Different control voltage set points",
                &bus_data.names[bus],
                vset,
                stored,
            );
            warn!(
                bus = %bus_data.names[bus],
                value = vset,
                kept = stored,
                "different control voltage set points"
            );
            if priority.outranks(owner) {
                controls.owner[bus] = Some(priority);
                controls.setpoint[bus] = vset;
                bus_data.v0[bus] = Complex64::new(vset, 0.0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buses(n: usize) -> (BusData, VoltageControls) {
        let mut data = BusData::new(n);
        data.names = (0..n).map(|i| format!("Bus {}", i)).collect();
        (data, VoltageControls::new(n))
    }

    #[test]
    fn test_local_control_sets_pv_and_seeds_voltage() {
        let (mut data, mut controls) = buses(2);
        let mut diag = Diagnostics::new();
        let req = ControlRequest::local(1, 1.03, ControlPriority::Generator);
        set_bus_control_voltage(&mut data, &mut controls, &req, false, &mut diag);

        assert_eq!(data.bus_types[1], BusType::Pv);
        assert_eq!(data.v0[1], Complex64::new(1.03, 0.0));
        assert!(controls.is_written(1));
        assert!(diag.is_empty());
    }

    #[test]
    fn test_remote_control_sets_p_and_pqv() {
        let (mut data, mut controls) = buses(3);
        let mut diag = Diagnostics::new();
        let req = ControlRequest::local(0, 1.01, ControlPriority::Generator).with_remote(Some(2));
        set_bus_control_voltage(&mut data, &mut controls, &req, false, &mut diag);

        assert_eq!(data.bus_types[0], BusType::P);
        assert_eq!(data.bus_types[2], BusType::Pqv);
        assert_eq!(data.v0[2].re, 1.01);
        assert_eq!(data.v0[0].re, 1.0);
    }

    #[test]
    fn test_remote_equal_to_local_is_local() {
        let (mut data, mut controls) = buses(2);
        let mut diag = Diagnostics::new();
        let req = ControlRequest::local(1, 1.0, ControlPriority::Shunt).with_remote(Some(1));
        set_bus_control_voltage(&mut data, &mut controls, &req, false, &mut diag);
        assert_eq!(data.bus_types[1], BusType::Pv);
    }

    #[test]
    fn test_slack_is_never_reclassified() {
        let (mut data, mut controls) = buses(2);
        data.bus_types[0] = BusType::Slack;
        let mut diag = Diagnostics::new();
        let req = ControlRequest::local(0, 1.05, ControlPriority::Generator);
        set_bus_control_voltage(&mut data, &mut controls, &req, false, &mut diag);
        let req = ControlRequest::local(1, 1.02, ControlPriority::Generator).with_remote(Some(0));
        set_bus_control_voltage(&mut data, &mut controls, &req, false, &mut diag);

        // a slack target stays slack and leaves no unpaired P bus behind
        assert_eq!(data.bus_types[0], BusType::Slack);
        assert_eq!(data.bus_types[1], BusType::Pq);
        assert_eq!(data.v0[0].re, 1.05);
    }

    #[test]
    fn test_slack_device_with_remote_target_changes_no_types() {
        let (mut data, mut controls) = buses(3);
        data.bus_types[0] = BusType::Slack;
        let mut diag = Diagnostics::new();
        let req = ControlRequest::local(0, 1.04, ControlPriority::Generator).with_remote(Some(2));
        set_bus_control_voltage(&mut data, &mut controls, &req, false, &mut diag);

        assert_eq!(data.bus_types, vec![BusType::Slack, BusType::Pq, BusType::Pq]);
        assert_eq!(data.v0[2].re, 1.04);
        assert!(diag.is_empty());
    }

    #[test]
    fn test_conflict_first_writer_wins_with_one_error() {
        let (mut data, mut controls) = buses(1);
        let mut diag = Diagnostics::new();
        for vset in [1.02, 1.05] {
            let req = ControlRequest::local(0, vset, ControlPriority::Generator);
            set_bus_control_voltage(&mut data, &mut controls, &req, false, &mut diag);
        }
        assert_eq!(data.v0[0].re, 1.02);
        assert_eq!(diag.error_count(), 1);
        let issue = diag.errors().next().unwrap();
        assert_eq!(issue.entity.as_deref(), Some("Bus 0"));
        assert_eq!(issue.value, Some(1.05));
        assert_eq!(issue.expected, Some(1.02));
    }

    #[test]
    fn test_equal_setpoints_are_silent() {
        let (mut data, mut controls) = buses(1);
        let mut diag = Diagnostics::new();
        for priority in [ControlPriority::Generator, ControlPriority::Battery] {
            let req = ControlRequest::local(0, 1.02, priority);
            set_bus_control_voltage(&mut data, &mut controls, &req, false, &mut diag);
        }
        assert!(diag.is_empty());
        assert_eq!(controls.owner(0), Some(ControlPriority::Generator));
    }

    #[test]
    fn test_higher_priority_takes_over() {
        let (mut data, mut controls) = buses(1);
        let mut diag = Diagnostics::new();
        seed_voltage(&mut data, &mut controls, 0, 1.04, ControlPriority::Hvdc, &mut diag);
        seed_voltage(&mut data, &mut controls, 0, 1.01, ControlPriority::Generator, &mut diag);
        seed_voltage(&mut data, &mut controls, 0, 0.98, ControlPriority::Vsc, &mut diag);

        assert_eq!(data.v0[0].re, 1.01);
        assert_eq!(controls.owner(0), Some(ControlPriority::Generator));
        assert_eq!(diag.error_count(), 2);
    }

    #[test]
    fn test_stored_guess_skips_seeding() {
        let (mut data, mut controls) = buses(1);
        data.v0[0] = Complex64::new(0.97, 0.01);
        let mut diag = Diagnostics::new();
        let req = ControlRequest::local(0, 1.05, ControlPriority::Generator);
        set_bus_control_voltage(&mut data, &mut controls, &req, true, &mut diag);

        assert_eq!(data.bus_types[0], BusType::Pv);
        assert_eq!(data.v0[0], Complex64::new(0.97, 0.01));
        assert!(!controls.is_written(0));
    }
}
