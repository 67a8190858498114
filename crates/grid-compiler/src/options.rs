//! Compilation and island-splitting options.

use serde::{Deserialize, Serialize};

use crate::error::CompileResult;

/// Which end of a branch's resistance tolerance band to compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchImpedanceMode {
    #[default]
    Specified,
    /// R x (1 + tolerance / 100)
    Upper,
    /// R x (1 - tolerance / 100)
    Lower,
}

impl BranchImpedanceMode {
    /// Resistance factor for a tolerance given in percent.
    pub fn r_factor(self, tolerance: f64) -> f64 {
        match self {
            BranchImpedanceMode::Specified => 1.0,
            BranchImpedanceMode::Upper => 1.0 + tolerance / 100.0,
            BranchImpedanceMode::Lower => 1.0 - tolerance / 100.0,
        }
    }
}

/// Options for [`crate::NumericalCircuitCompiler`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Use the stored bus voltages as the initial guess instead of the
    /// setpoints of the controlling devices.
    pub use_stored_guess: bool,
    /// Correct line resistance to the operating temperature.
    pub apply_temperature: bool,
    pub branch_tolerance_mode: BranchImpedanceMode,
    /// Collapse the remote-control bus types (P -> PV, PQV -> PQ) in the
    /// simulation indices, for solvers that only know Slack/PV/PQ.
    pub force_only_pq_pv_vd_types: bool,
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stored_guess(mut self, enabled: bool) -> Self {
        self.use_stored_guess = enabled;
        self
    }

    pub fn with_temperature_correction(mut self, enabled: bool) -> Self {
        self.apply_temperature = enabled;
        self
    }

    pub fn with_tolerance_mode(mut self, mode: BranchImpedanceMode) -> Self {
        self.branch_tolerance_mode = mode;
        self
    }

    pub fn with_only_pq_pv_vd_types(mut self, enabled: bool) -> Self {
        self.force_only_pq_pv_vd_types = enabled;
        self
    }

    /// Parse options from JSON; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> CompileResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Options for the island splitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IslandOptions {
    /// Drop islands made of a single bus.
    pub ignore_single_node_islands: bool,
    /// Treat HVDC links as topological connectors.
    pub consider_hvdc_as_island_links: bool,
    /// Treat converters as topological connectors.
    pub consider_vsc_as_island_links: bool,
}

impl Default for IslandOptions {
    fn default() -> Self {
        Self {
            ignore_single_node_islands: false,
            consider_hvdc_as_island_links: false,
            consider_vsc_as_island_links: true,
        }
    }
}

impl IslandOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ignoring_single_node_islands(mut self) -> Self {
        self.ignore_single_node_islands = true;
        self
    }

    pub fn with_hvdc_links(mut self) -> Self {
        self.consider_hvdc_as_island_links = true;
        self
    }
}

/// Externally computed dispatch (e.g. OPF results) for one time step.
///
/// Vectors are indexed by device position within its type, in network order.
/// A missing entry leaves the device's own setpoint in place; missing
/// shedding entries count as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchOverride {
    /// Generator active power (MW)
    pub generator_power: Vec<f64>,
    pub generator_shedding: Vec<f64>,
    /// Battery active power (MW)
    pub battery_power: Vec<f64>,
    /// Load shedding (MW), indexed by load
    pub load_shedding: Vec<f64>,
    /// HVDC transfer (MW) from -> to
    pub hvdc_power: Vec<f64>,
    /// Transformer phase shift (rad)
    pub tap_angle: Vec<f64>,
}

impl DispatchOverride {
    pub(crate) fn generator_p(&self, i: usize) -> Option<f64> {
        self.generator_power
            .get(i)
            .map(|p| p - self.generator_shedding.get(i).copied().unwrap_or(0.0))
    }

    pub(crate) fn battery_p(&self, i: usize) -> Option<f64> {
        self.battery_power.get(i).copied()
    }

    pub(crate) fn load_shedding_at(&self, i: usize) -> f64 {
        self.load_shedding.get(i).copied().unwrap_or(0.0)
    }

    pub(crate) fn hvdc_p(&self, i: usize) -> Option<f64> {
        self.hvdc_power.get(i).copied()
    }

    pub(crate) fn tap_angle_at(&self, i: usize) -> Option<f64> {
        self.tap_angle.get(i).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_partial_json() {
        let opts = CompileOptions::from_json_str(
            r#"{"use_stored_guess": true, "branch_tolerance_mode": "upper"}"#,
        )
        .unwrap();
        assert!(opts.use_stored_guess);
        assert!(!opts.apply_temperature);
        assert_eq!(opts.branch_tolerance_mode, BranchImpedanceMode::Upper);
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let err = CompileOptions::from_json_str("{").unwrap_err();
        assert!(err.to_string().starts_with("invalid configuration"));
    }

    #[test]
    fn test_tolerance_factor() {
        assert_eq!(BranchImpedanceMode::Specified.r_factor(10.0), 1.0);
        assert!((BranchImpedanceMode::Upper.r_factor(10.0) - 1.1).abs() < 1e-12);
        assert!((BranchImpedanceMode::Lower.r_factor(10.0) - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_dispatch_override_lookup() {
        let dispatch = DispatchOverride {
            generator_power: vec![100.0],
            generator_shedding: vec![10.0],
            ..DispatchOverride::default()
        };
        assert_eq!(dispatch.generator_p(0), Some(90.0));
        assert_eq!(dispatch.generator_p(1), None);
        assert_eq!(dispatch.load_shedding_at(3), 0.0);
    }
}
