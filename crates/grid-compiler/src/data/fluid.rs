use serde::Serialize;

use super::pick;

/// Reservoirs and junctions. Levels in m3.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FluidNodeData {
    pub names: Vec<String>,
    pub idtags: Vec<String>,
    pub min_level: Vec<f64>,
    pub max_level: Vec<f64>,
    pub initial_level: Vec<f64>,
    /// m3/s
    pub inflow: Vec<f64>,
    pub spillage_cost: Vec<f64>,
    pub min_soc: Vec<f64>,
    pub max_soc: Vec<f64>,
}

impl FluidNodeData {
    pub fn new(n: usize) -> Self {
        Self {
            names: vec![String::new(); n],
            idtags: vec![String::new(); n],
            min_level: vec![0.0; n],
            max_level: vec![0.0; n],
            initial_level: vec![0.0; n],
            inflow: vec![0.0; n],
            spillage_cost: vec![0.0; n],
            min_soc: vec![0.0; n],
            max_soc: vec![1.0; n],
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FluidPathData {
    pub names: Vec<String>,
    pub idtags: Vec<String>,
    pub source: Vec<usize>,
    pub target: Vec<usize>,
    pub min_flow: Vec<f64>,
    pub max_flow: Vec<f64>,
}

impl FluidPathData {
    pub fn new(n: usize) -> Self {
        Self {
            names: vec![String::new(); n],
            idtags: vec![String::new(); n],
            source: vec![0; n],
            target: vec![0; n],
            min_flow: vec![0.0; n],
            max_flow: vec![0.0; n],
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Turbines, pumps and P2X units: fluid node coupled with a generator row.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FluidInjectionData {
    pub names: Vec<String>,
    pub idtags: Vec<String>,
    pub plant_idx: Vec<usize>,
    pub generator_idx: Vec<usize>,
    pub efficiency: Vec<f64>,
    pub max_flow_rate: Vec<f64>,
}

impl FluidInjectionData {
    pub fn new(n: usize) -> Self {
        Self {
            names: vec![String::new(); n],
            idtags: vec![String::new(); n],
            plant_idx: vec![0; n],
            generator_idx: vec![0; n],
            efficiency: vec![1.0; n],
            max_flow_rate: vec![0.0; n],
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Rows whose generator maps into an island, with generator indices translated.
    pub fn slice_by_generator(&self, gen_map: &[Option<usize>]) -> Self {
        let idx: Vec<usize> = (0..self.len())
            .filter(|&k| gen_map.get(self.generator_idx[k]).copied().flatten().is_some())
            .collect();
        Self {
            names: pick(&self.names, &idx),
            idtags: pick(&self.idtags, &idx),
            plant_idx: pick(&self.plant_idx, &idx),
            generator_idx: idx
                .iter()
                .filter_map(|&k| gen_map[self.generator_idx[k]])
                .collect(),
            efficiency: pick(&self.efficiency, &idx),
            max_flow_rate: pick(&self.max_flow_rate, &idx),
        }
    }
}
