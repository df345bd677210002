// Library exports for indicador

pub mod aggregate;
pub mod config;
pub mod data;
pub mod error;
pub mod loader;
pub mod palette;
pub mod pipeline;
pub mod render;
pub mod schema;
pub mod view;
pub mod views;

pub use config::DashboardConfig;
pub use data::Dataset;
pub use error::{LoadError, ViewError};
pub use pipeline::{build_dashboard, run, Dashboard};
pub use view::AnalyticalView;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
pub enum OutputFormat {
    #[serde(rename = "png")]
    #[default]
    Png,
    #[serde(rename = "svg")]
    Svg,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Svg => "svg",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RenderOptions {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default, rename = "type")]
    pub format: OutputFormat,
}

fn default_width() -> u32 { 800 }
fn default_height() -> u32 { 600 }

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            format: OutputFormat::Png,
        }
    }
}
