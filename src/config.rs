//! Dashboard configuration.
//!
//! Every field has a default matching the original indicator workbook, so an
//! empty JSON object (or no config file at all) is a valid configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::RenderOptions;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Names of the source columns as they appear in the workbook header.
    #[serde(default)]
    pub columns: SourceColumns,

    /// Number of rows kept by the top strata view.
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Constant trace label attached to every row of the top strata view.
    #[serde(default = "default_trace_label")]
    pub trace_label: String,

    /// Evaluate the seven views on separate threads.
    #[serde(default)]
    pub parallel: bool,

    #[serde(default)]
    pub render: RenderOptions,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            columns: SourceColumns::default(),
            top_n: default_top_n(),
            trace_label: default_trace_label(),
            parallel: false,
            render: RenderOptions::default(),
        }
    }
}

fn default_top_n() -> usize {
    10
}

fn default_trace_label() -> String {
    "Escala".to_string()
}

/// Original (pre-rename) column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceColumns {
    pub region: String,
    pub status: String,
    pub sustainability: String,
    pub participants: String,
    pub women_participants: String,
    pub period: String,
    pub target_population: String,
}

impl Default for SourceColumns {
    fn default() -> Self {
        Self {
            region: "Región(es) en la que se implementa".to_string(),
            status: "Estado del proceso".to_string(),
            sustainability:
                "¿La iniciativa tiene una forma de hacer seguimiento o estrategia de sostenibilidad?"
                    .to_string(),
            participants: "Participantes directos (OSIGD)".to_string(),
            women_participants: "Participantes directos (mujeres)".to_string(),
            period: "Periodo de implementación".to_string(),
            target_population: "Población objetivo de la iniciativa".to_string(),
        }
    }
}

impl DashboardConfig {
    /// Load a configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}
