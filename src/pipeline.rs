//! View assembly: one load, seven independent views.
//!
//! A load failure aborts the whole dashboard. A view failure is recorded in its
//! slot and the remaining views are still produced.

use crate::config::DashboardConfig;
use crate::data::Dataset;
use crate::error::{LoadError, ViewError};
use crate::loader::load_dataset;
use crate::view::AnalyticalView;
use crate::views::{Schemas, VIEWS};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::thread;
use tracing::{debug, info, warn};

/// Outcome of every view, keyed `graph1`..`graph7`
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub views: BTreeMap<String, Result<AnalyticalView, ViewError>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Entry<'a> {
    View(&'a AnalyticalView),
    Failed { error: String },
}

impl Dashboard {
    pub fn get(&self, id: &str) -> Option<&Result<AnalyticalView, ViewError>> {
        self.views.get(id)
    }

    pub fn successes(&self) -> impl Iterator<Item = &AnalyticalView> {
        self.views.values().filter_map(|v| v.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &ViewError)> {
        self.views
            .iter()
            .filter_map(|(id, v)| v.as_ref().err().map(|e| (id.as_str(), e)))
    }

    /// Views with their tables, failed slots as `{ "error": ... }`
    pub fn to_json(&self) -> serde_json::Value {
        let entries: BTreeMap<&str, Entry<'_>> = self
            .views
            .iter()
            .map(|(id, v)| {
                let entry = match v {
                    Ok(view) => Entry::View(view),
                    Err(e) => Entry::Failed { error: e.to_string() },
                };
                (id.as_str(), entry)
            })
            .collect();

        serde_json::to_value(entries).unwrap_or(serde_json::Value::Null)
    }
}

/// Compute all views over an already loaded dataset
pub fn build_dashboard(dataset: &Dataset, config: &DashboardConfig) -> Dashboard {
    let schemas = Schemas::new(dataset, config);

    let results: Vec<(String, Result<AnalyticalView, ViewError>)> = if config.parallel {
        debug!("evaluating {} views on scoped threads", VIEWS.len());
        thread::scope(|scope| {
            let handles: Vec<_> = VIEWS
                .iter()
                .map(|&(id, builder)| {
                    let schemas = &schemas;
                    (id, scope.spawn(move || builder(schemas, config)))
                })
                .collect();

            handles
                .into_iter()
                .map(|(id, handle)| {
                    let result = handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic));
                    (id.to_string(), result)
                })
                .collect()
        })
    } else {
        VIEWS
            .iter()
            .map(|&(id, builder)| (id.to_string(), builder(&schemas, config)))
            .collect()
    };

    for (id, result) in &results {
        match result {
            Ok(view) => debug!("{}: {} rows", id, view.table.len()),
            Err(e) => warn!("{} failed: {}", id, e),
        }
    }

    Dashboard {
        views: results.into_iter().collect(),
    }
}

/// Load the source file and build every view. Only loading is fatal.
pub fn run(path: impl AsRef<Path>, config: &DashboardConfig) -> Result<Dashboard, LoadError> {
    let dataset = load_dataset(path)?;
    let dashboard = build_dashboard(&dataset, config);
    info!(
        "dashboard ready: {} views, {} failed",
        dashboard.views.len(),
        dashboard.failures().count()
    );
    Ok(dashboard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceColumns;

    fn make_data() -> Dataset {
        let c = SourceColumns::default();
        Dataset::new(
            vec![
                c.region,
                c.status,
                c.sustainability,
                c.participants,
                c.women_participants,
                c.period,
                c.target_population,
            ],
            vec![
                ["Norte", "Activo", "Sí", "10", "4", "2023", "C"],
                ["Sur", "Cerrado", "No", "5", "2", "2022", "A"],
            ]
            .iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_all_seven_slots() {
        let dashboard = build_dashboard(&make_data(), &DashboardConfig::default());
        let ids: Vec<&str> = dashboard.views.keys().map(String::as_str).collect();
        assert_eq!(
            ids,
            vec!["graph1", "graph2", "graph3", "graph4", "graph5", "graph6", "graph7"]
        );
        assert_eq!(dashboard.successes().count(), 7);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let data = make_data();
        let sequential = build_dashboard(&data, &DashboardConfig::default());
        let parallel = build_dashboard(
            &data,
            &DashboardConfig {
                parallel: true,
                ..DashboardConfig::default()
            },
        );
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_failure_is_isolated() {
        let data = make_data().without_column("Población objetivo de la iniciativa");
        let dashboard = build_dashboard(&data, &DashboardConfig::default());
        let failed: Vec<&str> = dashboard.failures().map(|(id, _)| id).collect();
        assert_eq!(failed, vec!["graph5", "graph6", "graph7"]);
        assert_eq!(dashboard.successes().count(), 4);

        let json = dashboard.to_json();
        assert_eq!(json["graph5"]["error"], "column 'Estrato' not found");
        assert_eq!(json["graph1"]["chart"]["kind"], "bar");
    }

    #[test]
    fn test_run_load_error() {
        let err = run("missing/indicador31.csv", &DashboardConfig::default()).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
