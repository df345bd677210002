use plotters::style::RGBColor;
use std::collections::HashMap;

/// Categorical colors assigned to legend keys in order
#[derive(Debug, Clone)]
pub struct ColorPalette {
    colors: Vec<RGBColor>,
}

impl ColorPalette {
    /// The D3 / plotly "category10" sequence
    pub fn category10() -> Self {
        Self {
            colors: vec![
                RGBColor(0x1f, 0x77, 0xb4),
                RGBColor(0xff, 0x7f, 0x0e),
                RGBColor(0x2c, 0xa0, 0x2c),
                RGBColor(0xd6, 0x27, 0x28),
                RGBColor(0x94, 0x67, 0xbd),
                RGBColor(0x8c, 0x56, 0x4b),
                RGBColor(0xe3, 0x77, 0xc2),
                RGBColor(0x7f, 0x7f, 0x7f),
                RGBColor(0xbc, 0xbd, 0x22),
                RGBColor(0x17, 0xbe, 0xcf),
            ],
        }
    }

    /// Palette from color names; unknown names are skipped, an empty result
    /// falls back to category10.
    pub fn from_names(names: &[String]) -> Self {
        let colors: Vec<RGBColor> = names.iter().filter_map(|n| parse_color(n)).collect();
        if colors.is_empty() {
            Self::category10()
        } else {
            Self { colors }
        }
    }

    pub fn color(&self, index: usize) -> RGBColor {
        self.colors[index % self.colors.len()]
    }

    pub fn assign_colors(&self, keys: &[String]) -> HashMap<String, RGBColor> {
        keys.iter()
            .enumerate()
            .map(|(i, k)| (k.clone(), self.color(i)))
            .collect()
    }
}

/// Named color or `#rrggbb`
pub fn parse_color(name: &str) -> Option<RGBColor> {
    let lower = name.trim().to_ascii_lowercase();
    let color = match lower.as_str() {
        "red" => RGBColor(255, 0, 0),
        "green" => RGBColor(0, 128, 0),
        "blue" => RGBColor(0, 0, 255),
        "black" => RGBColor(0, 0, 0),
        "yellow" => RGBColor(255, 255, 0),
        "cyan" => RGBColor(0, 255, 255),
        "magenta" => RGBColor(255, 0, 255),
        "white" => RGBColor(255, 255, 255),
        "gray" | "grey" => RGBColor(128, 128, 128),
        hex => {
            let digits = hex.strip_prefix('#')?;
            if digits.len() != 6 {
                return None;
            }
            let channel = |i: usize| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok();
            RGBColor(channel(0)?, channel(2)?, channel(4)?)
        }
    };
    Some(color)
}
