// The seven dashboard views, one builder each

use crate::aggregate::{factorize, group_sum, proportions, sort_by_count_desc, top_by_key_desc, value_counts};
use crate::config::DashboardConfig;
use crate::data::Dataset;
use crate::error::ViewError;
use crate::schema::{
    is_missing, parse_finite, CanonicalSchema, RawSchema, Schema, ESTRATO, PARTICIPANTES, PERIODO, REGION,
};
use crate::view::{AnalyticalView, ChartKind, ChartSpec, Table, Theme, Value};

const CANTIDAD: &str = "Cantidad";
const PROPORCION: &str = "Proporcion";
const TIENE_SOSTENIBILIDAD: &str = "Tiene_sostenibilidad";
const POBLACION_OBJETIVO: &str = "Poblacion_objetivo";
const TRAZABILIDAD: &str = "Trazabilidad";
const N_PARTICIPANTES: &str = "N° de Participantes";

/// Both namings of the same dataset. Stages pick the one they need,
/// so evaluation order never matters.
#[derive(Debug, Clone)]
pub struct Schemas<'a> {
    pub raw: RawSchema<'a>,
    pub canonical: CanonicalSchema<'a>,
}

impl<'a> Schemas<'a> {
    pub fn new(dataset: &'a Dataset, config: &DashboardConfig) -> Self {
        Self {
            raw: RawSchema::new(dataset),
            canonical: CanonicalSchema::new(dataset, &config.columns),
        }
    }
}

pub type ViewBuilder = fn(&Schemas<'_>, &DashboardConfig) -> Result<AnalyticalView, ViewError>;

/// Dashboard slots in display order
pub const VIEWS: [(&str, ViewBuilder); 7] = [
    ("graph1", region_frequency),
    ("graph2", process_state_distribution),
    ("graph3", sustainability_breakdown),
    ("graph4", participants_by_region),
    ("graph5", participants_by_region_and_stratum),
    ("graph6", stratum_encoded_scatter),
    ("graph7", top_strata_by_women_participants),
];

fn view(id: &str, chart: ChartSpec, table: Table) -> AnalyticalView {
    AnalyticalView {
        id: id.to_string(),
        chart,
        table,
    }
}

/// Initiatives per region, source column names
pub fn region_frequency(s: &Schemas<'_>, config: &DashboardConfig) -> Result<AnalyticalView, ViewError> {
    let region = &config.columns.region;
    let counts = value_counts(&s.raw, region)?;

    let mut table = Table::new(vec![region.clone(), CANTIDAD.to_string()]);
    for (key, n) in counts {
        table.push(vec![key.into(), n.into()]);
    }

    let chart = ChartSpec::new(ChartKind::Bar, region, CANTIDAD)
        .title("Cantidad de iniciativas por región")
        .color(region)
        .x_label("Región")
        .y_label(CANTIDAD);

    Ok(view("graph1", chart, table))
}

/// Share of each process status
pub fn process_state_distribution(
    s: &Schemas<'_>,
    config: &DashboardConfig,
) -> Result<AnalyticalView, ViewError> {
    let status = &config.columns.status;
    let counts = value_counts(&s.raw, status)?;

    let mut table = Table::new(vec![status.clone(), CANTIDAD.to_string(), PROPORCION.to_string()]);
    for (key, n, share) in proportions(&counts) {
        table.push(vec![key.into(), n.into(), share.into()]);
    }

    let chart = ChartSpec::new(ChartKind::Pie, status, CANTIDAD)
        .title("Distribución de los estados del proceso");

    Ok(view("graph2", chart, table))
}

pub fn sustainability_breakdown(
    s: &Schemas<'_>,
    config: &DashboardConfig,
) -> Result<AnalyticalView, ViewError> {
    let mut counts = value_counts(&s.raw, &config.columns.sustainability)?;
    sort_by_count_desc(&mut counts);

    let mut table = Table::new(vec![TIENE_SOSTENIBILIDAD.to_string(), CANTIDAD.to_string()]);
    for (key, n) in counts {
        table.push(vec![key.into(), n.into()]);
    }

    let chart = ChartSpec::new(ChartKind::Bar, TIENE_SOSTENIBILIDAD, CANTIDAD)
        .title("Estrategia de sostenibilidad en iniciativas")
        .x_label("¿Tiene sostenibilidad?")
        .y_label(CANTIDAD)
        .value_labels();

    Ok(view("graph3", chart, table))
}

/// Total participants per canonical region, horizontal bars with value labels
pub fn participants_by_region(
    s: &Schemas<'_>,
    _config: &DashboardConfig,
) -> Result<AnalyticalView, ViewError> {
    let groups = group_sum(&s.canonical, &[REGION], PARTICIPANTES)?;

    let mut table = Table::new(vec![REGION.to_string(), PARTICIPANTES.to_string()]);
    for g in groups {
        let mut keys = g.keys.into_iter();
        table.push(vec![keys.next().unwrap_or_default().into(), g.sum.into()]);
    }

    let chart = ChartSpec::new(ChartKind::Bar, PARTICIPANTES, REGION)
        .title("Total de Participantes OSIGD por Región")
        .x_label(N_PARTICIPANTES)
        .horizontal()
        .value_labels()
        .theme(Theme::White);

    Ok(view("graph4", chart, table))
}

/// Participants per (region, stratum) pair present in the data
pub fn participants_by_region_and_stratum(
    s: &Schemas<'_>,
    _config: &DashboardConfig,
) -> Result<AnalyticalView, ViewError> {
    let groups = group_sum(&s.canonical, &[REGION, ESTRATO], PARTICIPANTES)?;

    let mut table = Table::new(vec![
        REGION.to_string(),
        ESTRATO.to_string(),
        PARTICIPANTES.to_string(),
    ]);
    for g in groups {
        let mut row: Vec<Value> = g.keys.into_iter().map(Value::from).collect();
        row.push(g.sum.into());
        table.push(row);
    }

    let chart = ChartSpec::new(ChartKind::Bar, REGION, PARTICIPANTES)
        .title("Participantes por Región y Población Objetivo")
        .color(ESTRATO)
        .y_label(N_PARTICIPANTES)
        .grouped()
        .value_labels()
        .theme(Theme::White);

    Ok(view("graph5", chart, table))
}

/// One point per record; the stratum is replaced by its first-seen integer code
pub fn stratum_encoded_scatter(
    s: &Schemas<'_>,
    _config: &DashboardConfig,
) -> Result<AnalyticalView, ViewError> {
    let schema = &s.canonical;
    let encoded = factorize(schema, ESTRATO)?;
    let participants = schema.column(PARTICIPANTES)?;
    let period = schema.column(PERIODO)?;
    let region = schema.column(REGION)?;
    let stratum = schema.column(ESTRATO)?;

    let mut table = Table::new(vec![
        POBLACION_OBJETIVO.to_string(),
        PARTICIPANTES.to_string(),
        PERIODO.to_string(),
        REGION.to_string(),
        ESTRATO.to_string(),
    ]);
    for (row, code) in encoded.codes.iter().enumerate() {
        table.push(vec![
            (*code).into(),
            participants.number(row)?.into(),
            infer(period.get(row)),
            region.get(row).into(),
            stratum.get(row).into(),
        ]);
    }

    let chart = ChartSpec::new(ChartKind::Scatter3d, POBLACION_OBJETIVO, PARTICIPANTES)
        .title("Participantes por Población Objetivo")
        .z(PERIODO)
        .color(REGION)
        .hover(ESTRATO)
        .y_label(N_PARTICIPANTES)
        .theme(Theme::Dark);

    Ok(view("graph6", chart, table))
}

/// Women participants per (region, stratum), ranked by the stratum label
/// descending (not by the sum), first `top_n` rows.
pub fn top_strata_by_women_participants(
    s: &Schemas<'_>,
    config: &DashboardConfig,
) -> Result<AnalyticalView, ViewError> {
    let women = &config.columns.women_participants;
    let groups = group_sum(&s.canonical, &[REGION, ESTRATO], women)?;
    let top = top_by_key_desc(groups, 1, config.top_n);

    let mut table = Table::new(vec![REGION.to_string(), ESTRATO.to_string(), women.clone()]);
    for g in top {
        let mut row: Vec<Value> = g.keys.into_iter().map(Value::from).collect();
        row.push(g.sum.into());
        table.push(row);
    }
    let table = table.with_constant(TRAZABILIDAD, config.trace_label.as_str().into());

    let chart = ChartSpec::new(ChartKind::Line3d, REGION, women)
        .z(ESTRATO)
        .color(TRAZABILIDAD)
        .color_sequence(&["green"]);

    Ok(view("graph7", chart, table))
}

/// Numeric when the cell holds a finite number, text otherwise
fn infer(raw: &str) -> Value {
    if is_missing(raw) {
        Value::Missing
    } else if let Some(n) = parse_finite(raw) {
        Value::Number(n)
    } else {
        Value::Text(raw.to_string())
    }
}
