use crate::schema::parse_finite;
use serde::Serialize;

/// A single table cell in an analytical view
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Integer(i64),
    Number(f64),
    Missing,
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Number(n) => Some(*n).filter(|n| n.is_finite()),
            Value::Text(s) => parse_finite(s),
            Value::Missing => None,
        }
    }

    /// Label used on categorical axes and legends
    pub fn label(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Number(n) => n.to_string(),
            Value::Missing => String::new(),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Integer(n as i64)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<Option<f64>> for Value {
    fn from(n: Option<f64>) -> Self {
        n.map_or(Value::Missing, Value::Number)
    }
}

/// Column-named rows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<Value>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All values of one column, in row order
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// Append a constant-valued column
    pub fn with_constant(mut self, name: &str, value: Value) -> Self {
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(value.clone());
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    Pie,
    Scatter3d,
    Line3d,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Vertical,
    Horizontal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BarMode {
    #[default]
    Relative,
    Group,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    White,
    Dark,
}

/// Axis titles; `None` falls back to the mapped column name
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AxisLabels {
    pub x: Option<String>,
    pub y: Option<String>,
    pub z: Option<String>,
}

/// How a table maps onto a chart. Field names refer to table columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: Option<String>,
    pub x: String,
    pub y: String,
    pub z: Option<String>,
    pub color: Option<String>,
    pub hover: Option<String>,
    pub labels: AxisLabels,
    pub orientation: Orientation,
    pub bar_mode: BarMode,
    pub value_labels: bool,
    pub theme: Theme,
    pub color_sequence: Vec<String>,
}

impl ChartSpec {
    pub fn new(kind: ChartKind, x: &str, y: &str) -> Self {
        Self {
            kind,
            title: None,
            x: x.to_string(),
            y: y.to_string(),
            z: None,
            color: None,
            hover: None,
            labels: AxisLabels::default(),
            orientation: Orientation::Vertical,
            bar_mode: BarMode::Relative,
            value_labels: false,
            theme: Theme::Light,
            color_sequence: Vec::new(),
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn z(mut self, z: &str) -> Self {
        self.z = Some(z.to_string());
        self
    }

    pub fn color(mut self, column: &str) -> Self {
        self.color = Some(column.to_string());
        self
    }

    pub fn hover(mut self, column: &str) -> Self {
        self.hover = Some(column.to_string());
        self
    }

    pub fn x_label(mut self, label: &str) -> Self {
        self.labels.x = Some(label.to_string());
        self
    }

    pub fn y_label(mut self, label: &str) -> Self {
        self.labels.y = Some(label.to_string());
        self
    }

    pub fn horizontal(mut self) -> Self {
        self.orientation = Orientation::Horizontal;
        self
    }

    pub fn grouped(mut self) -> Self {
        self.bar_mode = BarMode::Group;
        self
    }

    pub fn value_labels(mut self) -> Self {
        self.value_labels = true;
        self
    }

    pub fn theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    pub fn color_sequence(mut self, colors: &[&str]) -> Self {
        self.color_sequence = colors.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Title shown on the x axis
    pub fn x_title(&self) -> &str {
        self.labels.x.as_deref().unwrap_or(&self.x)
    }

    pub fn y_title(&self) -> &str {
        self.labels.y.as_deref().unwrap_or(&self.y)
    }

    pub fn z_title(&self) -> &str {
        self.labels
            .z
            .as_deref()
            .or(self.z.as_deref())
            .unwrap_or("")
    }
}

/// A chart-ready table plus its display metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticalView {
    pub id: String,
    pub chart: ChartSpec,
    pub table: Table,
}
