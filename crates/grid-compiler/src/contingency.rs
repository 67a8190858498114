//! Contingency events and investment toggles applied to a compiled circuit.
//!
//! Events address devices by idtag. Applying an event set and then applying the
//! same set with `revert = true` restores the circuit arrays.

use grid_core::category;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::circuit::{DeviceKind, NumericalCircuit};
use crate::error::{CompileError, CompileResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContingencyProperty {
    /// Switch the device on (`value != 0`) or off (`value == 0`)
    Active,
    /// Scale the device power by `value` percent
    PowerPercentage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContingencyEvent {
    pub idtag: String,
    pub property: ContingencyProperty,
    pub value: f64,
}

impl ContingencyEvent {
    /// Outage of the device `idtag`.
    pub fn outage(idtag: impl Into<String>) -> Self {
        Self {
            idtag: idtag.into(),
            property: ContingencyProperty::Active,
            value: 0.0,
        }
    }

    pub fn power_percentage(idtag: impl Into<String>, percent: f64) -> Self {
        Self {
            idtag: idtag.into(),
            property: ContingencyProperty::PowerPercentage,
            value: percent,
        }
    }
}

/// A candidate device whose status is toggled as a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Investment {
    pub idtag: String,
    pub name: String,
}

impl NumericalCircuit {
    /// Set the `active` flag of every device named by `investments`.
    pub fn set_investments_status(
        &mut self,
        investments: &[Investment],
        active: bool,
    ) -> CompileResult<()> {
        for inv in investments {
            let (kind, k) = self
                .query_idtag(&inv.idtag)
                .ok_or_else(|| CompileError::UnknownIdTag(inv.idtag.clone()))?;
            self.set_device_active(kind, k, active);
        }
        self.reset_calculations();
        Ok(())
    }

    /// Apply (or revert) contingency events.
    ///
    /// Returns the active power injection increment per bus (MW) caused by
    /// the events. Properties a device family does not support are reported
    /// as contingency warnings in [`NumericalCircuit::diagnostics`] and
    /// skipped.
    pub fn apply_contingencies(
        &mut self,
        events: &[ContingencyEvent],
        revert: bool,
    ) -> CompileResult<Vec<f64>> {
        let mut injections = vec![0.0; self.nbus];

        for event in events {
            let (kind, k) = self
                .query_idtag(&event.idtag)
                .ok_or_else(|| CompileError::UnknownIdTag(event.idtag.clone()))?;

            match event.property {
                ContingencyProperty::Active => {
                    let on = event.value != 0.0;
                    self.apply_status(kind, k, on != revert, &mut injections);
                }
                ContingencyProperty::PowerPercentage => {
                    if event.value == 0.0 {
                        return Err(CompileError::InvalidEvent(format!(
                            "power percentage of '{}' is zero",
                            event.idtag
                        )));
                    }
                    let factor = event.value / 100.0;
                    if !self.apply_scaling(kind, k, factor, revert, &mut injections) {
                        self.diagnostics.add_warning_with_entity(
                            category::CONTINGENCY,
                            "Unsupported contingency property for device type",
                            &event.idtag,
                        );
                        warn!(idtag = %event.idtag, ?kind, "power percentage not supported");
                    }
                }
            }
        }

        debug!(events = events.len(), revert, "contingencies applied");
        self.reset_calculations();
        Ok(injections)
    }

    /// P injected at the bus of a single-terminal device while it is active (MW).
    fn device_injection(&self, kind: DeviceKind, k: usize) -> Option<(usize, f64)> {
        match kind {
            DeviceKind::Generator => {
                let g = &self.generator_data;
                Some((g.bus_idx[k], g.p[k]))
            }
            DeviceKind::Battery => {
                let b = &self.battery_data.units;
                Some((b.bus_idx[k], b.p[k]))
            }
            DeviceKind::Load => {
                let l = &self.load_data;
                Some((l.bus_idx[k], -l.s[k].re))
            }
            DeviceKind::Shunt => {
                let s = &self.shunt_data;
                Some((s.bus_idx[k], -s.y[k].re))
            }
            _ => None,
        }
    }

    fn is_device_active(&self, kind: DeviceKind, k: usize) -> bool {
        match kind {
            DeviceKind::Bus => self.bus_data.active[k],
            DeviceKind::Branch => self.branch_data.active[k],
            DeviceKind::Generator => self.generator_data.active[k],
            DeviceKind::Battery => self.battery_data.units.active[k],
            DeviceKind::Load => self.load_data.active[k],
            DeviceKind::Shunt => self.shunt_data.active[k],
            DeviceKind::Hvdc => self.hvdc_data.active[k],
            DeviceKind::Vsc => self.vsc_data.active[k],
        }
    }

    fn apply_status(&mut self, kind: DeviceKind, k: usize, on: bool, injections: &mut [f64]) {
        if self.is_device_active(kind, k) == on {
            return;
        }
        let sign = if on { 1.0 } else { -1.0 };
        if let Some((bus, p)) = self.device_injection(kind, k) {
            injections[bus] += sign * p;
        } else if kind == DeviceKind::Hvdc {
            let h = &self.hvdc_data;
            injections[h.f[k]] -= sign * h.pset[k];
            injections[h.t[k]] += sign * h.pset[k];
        }
        self.set_device_active(kind, k, on);
    }

    /// Multiply (or, reverting, divide) the device power by `factor`.
    /// Returns `false` when the family has no power to scale.
    fn apply_scaling(
        &mut self,
        kind: DeviceKind,
        k: usize,
        factor: f64,
        revert: bool,
        injections: &mut [f64],
    ) -> bool {
        let scale = |v: f64| if revert { v / factor } else { v * factor };
        let scale_c = |v: Complex64| if revert { v / factor } else { v * factor };
        let active = self.is_device_active(kind, k);
        let before = self.device_injection(kind, k);
        match kind {
            DeviceKind::Generator => self.generator_data.p[k] = scale(self.generator_data.p[k]),
            DeviceKind::Battery => {
                let units = &mut self.battery_data.units;
                units.p[k] = scale(units.p[k]);
            }
            DeviceKind::Load => self.load_data.s[k] = scale_c(self.load_data.s[k]),
            DeviceKind::Shunt => self.shunt_data.y[k] = scale_c(self.shunt_data.y[k]),
            DeviceKind::Hvdc => {
                let h = &mut self.hvdc_data;
                let old = h.pset[k];
                h.pset[k] = scale(old);
                if active {
                    let delta = h.pset[k] - old;
                    injections[h.f[k]] -= delta;
                    injections[h.t[k]] += delta;
                }
                return true;
            }
            DeviceKind::Bus | DeviceKind::Branch | DeviceKind::Vsc => return false,
        }
        if active {
            if let (Some((bus, old)), Some((_, new))) = (before, self.device_injection(kind, k)) {
                injections[bus] += new - old;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{BusData, HvdcData, LoadData, MachineData};
    use crate::options::CompileOptions;

    fn circuit() -> NumericalCircuit {
        let mut nc = NumericalCircuit::new(100.0, None, CompileOptions::default());
        nc.bus_data = BusData::new(2);
        nc.bus_data.names = vec!["A".into(), "B".into()];

        nc.generator_data = MachineData::new(1);
        nc.generator_data.idtags[0] = "g".into();
        nc.generator_data.active[0] = true;
        nc.generator_data.p[0] = 80.0;

        nc.load_data = LoadData::new(1);
        nc.load_data.idtags[0] = "ld".into();
        nc.load_data.active[0] = true;
        nc.load_data.bus_idx[0] = 1;
        nc.load_data.s[0] = Complex64::new(50.0, 20.0);

        nc.hvdc_data = HvdcData::new(1);
        nc.hvdc_data.idtags[0] = "dc".into();
        nc.hvdc_data.active[0] = true;
        nc.hvdc_data.t[0] = 1;
        nc.hvdc_data.pset[0] = 30.0;
        nc.recount();
        nc
    }

    #[test]
    fn test_outage_and_revert() {
        let mut nc = circuit();
        let events = vec![ContingencyEvent::outage("g"), ContingencyEvent::outage("dc")];

        let inj = nc.apply_contingencies(&events, false).unwrap();
        assert!(!nc.generator_data.active[0]);
        assert!(!nc.hvdc_data.active[0]);
        assert_eq!(inj, vec![-80.0 + 30.0, -30.0]);

        let inj = nc.apply_contingencies(&events, true).unwrap();
        assert!(nc.generator_data.active[0]);
        assert!(nc.hvdc_data.active[0]);
        assert_eq!(inj, vec![80.0 - 30.0, 30.0]);
    }

    #[test]
    fn test_power_percentage_round_trip() {
        let original = circuit();
        let mut nc = original.clone();
        let events = vec![
            ContingencyEvent::power_percentage("ld", 50.0),
            ContingencyEvent::power_percentage("dc", 200.0),
        ];

        let inj = nc.apply_contingencies(&events, false).unwrap();
        assert_eq!(nc.load_data.s[0], Complex64::new(25.0, 10.0));
        assert_eq!(nc.hvdc_data.pset[0], 60.0);
        assert_eq!(inj, vec![-30.0, 25.0 + 30.0]);

        nc.apply_contingencies(&events, true).unwrap();
        assert!(nc == original);
    }

    #[test]
    fn test_event_errors_and_warnings() {
        let mut nc = circuit();
        let err = nc
            .apply_contingencies(&[ContingencyEvent::outage("missing")], false)
            .unwrap_err();
        assert!(matches!(err, CompileError::UnknownIdTag(ref t) if t == "missing"));

        let err = nc
            .apply_contingencies(&[ContingencyEvent::power_percentage("g", 0.0)], false)
            .unwrap_err();
        assert!(matches!(err, CompileError::InvalidEvent(_)));

        nc.bus_data.idtags[0] = "busA".into();
        nc.reset_calculations();
        let inj = nc
            .apply_contingencies(&[ContingencyEvent::power_percentage("busA", 50.0)], false)
            .unwrap();
        assert_eq!(inj, vec![0.0, 0.0]);
        assert_eq!(nc.diagnostics.issues_by_category(category::CONTINGENCY).count(), 1);
    }

    #[test]
    fn test_investments_toggle_status() {
        let mut nc = circuit();
        let investments = vec![Investment {
            idtag: "g".into(),
            name: "New unit".into(),
        }];
        nc.set_investments_status(&investments, false).unwrap();
        assert!(!nc.generator_data.active[0]);
        nc.set_investments_status(&investments, true).unwrap();
        assert!(nc.generator_data.active[0]);

        let unknown = vec![Investment {
            idtag: "x".into(),
            name: "x".into(),
        }];
        assert!(nc.set_investments_status(&unknown, true).is_err());
    }
}
