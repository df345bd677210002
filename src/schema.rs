// Raw and canonical views over one immutable Dataset

use crate::config::SourceColumns;
use crate::data::Dataset;
use crate::error::ViewError;

pub const PARTICIPANTES: &str = "Participantes";
pub const REGION: &str = "Region";
pub const PERIODO: &str = "Periodo";
pub const ESTRATO: &str = "Estrato";

/// Cell texts that spreadsheet exports use for a missing number
const NA_MARKERS: [&str; 18] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN", "<NA>",
    "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Blank or an NA marker
pub fn is_missing(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty() || NA_MARKERS.contains(&trimmed)
}

/// Finite number in a cell; `inf` and `NaN` spellings are not numbers here
pub fn parse_finite(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Column lookup over a dataset. Implementations differ only in naming.
pub trait Schema {
    fn dataset(&self) -> &Dataset;

    fn index_of(&self, name: &str) -> Result<usize, ViewError>;

    fn column(&self, name: &str) -> Result<Column<'_>, ViewError> {
        let index = self.index_of(name)?;
        Ok(Column {
            name: name.to_string(),
            index,
            dataset: self.dataset(),
        })
    }
}

/// Columns under their source names
#[derive(Debug, Clone, Copy)]
pub struct RawSchema<'a> {
    dataset: &'a Dataset,
}

impl<'a> RawSchema<'a> {
    pub fn new(dataset: &'a Dataset) -> Self {
        Self { dataset }
    }
}

impl Schema for RawSchema<'_> {
    fn dataset(&self) -> &Dataset {
        self.dataset
    }

    fn index_of(&self, name: &str) -> Result<usize, ViewError> {
        self.dataset
            .column_index(name)
            .ok_or_else(|| ViewError::missing(name))
    }
}

/// Columns under the canonical short names (`Participantes`, `Region`,
/// `Periodo`, `Estrato`). The dataset is never modified; the rename is a
/// lookup table applied on access.
///
/// A renamed original is no longer addressable by its source name. When the
/// source already uses a canonical name and lacks the original, the canonical
/// column is used as-is. If both are present, the original wins.
#[derive(Debug, Clone)]
pub struct CanonicalSchema<'a> {
    dataset: &'a Dataset,
    renames: [(&'static str, String); 4],
}

impl<'a> CanonicalSchema<'a> {
    pub fn new(dataset: &'a Dataset, columns: &SourceColumns) -> Self {
        Self {
            dataset,
            renames: [
                (PARTICIPANTES, columns.participants.clone()),
                (REGION, columns.region.clone()),
                (PERIODO, columns.period.clone()),
                (ESTRATO, columns.target_population.clone()),
            ],
        }
    }
}

impl Schema for CanonicalSchema<'_> {
    fn dataset(&self) -> &Dataset {
        self.dataset
    }

    fn index_of(&self, name: &str) -> Result<usize, ViewError> {
        if let Some((_, original)) = self.renames.iter().find(|(canonical, _)| *canonical == name) {
            return self
                .dataset
                .column_index(original)
                .or_else(|| self.dataset.column_index(name))
                .ok_or_else(|| ViewError::missing(name));
        }

        if self.renames.iter().any(|(_, original)| original == name) {
            return Err(ViewError::missing(name));
        }

        self.dataset
            .column_index(name)
            .ok_or_else(|| ViewError::missing(name))
    }
}

/// A resolved column: cell access by row
#[derive(Debug, Clone)]
pub struct Column<'a> {
    pub name: String,
    index: usize,
    dataset: &'a Dataset,
}

impl<'a> Column<'a> {
    pub fn len(&self) -> usize {
        self.dataset.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dataset.rows.is_empty()
    }

    pub fn get(&self, row: usize) -> &'a str {
        &self.dataset.rows[row][self.index]
    }

    pub fn values(&self) -> impl Iterator<Item = &'a str> + '_ {
        let index = self.index;
        self.dataset.rows.iter().map(move |row| row[index].as_str())
    }

    /// Numeric value of a cell; blank and NA cells are missing (`None`).
    pub fn number(&self, row: usize) -> Result<Option<f64>, ViewError> {
        let raw = self.get(row);
        if is_missing(raw) {
            return Ok(None);
        }

        parse_finite(raw).map(Some).ok_or_else(|| ViewError::NotNumeric {
            column: self.name.clone(),
            row: row + 1,
            value: raw.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_data() -> Dataset {
        let columns = SourceColumns::default();
        Dataset::new(
            vec![
                columns.region.clone(),
                columns.participants.clone(),
                columns.women_participants.clone(),
            ],
            vec![
                vec!["Norte".into(), "10".into(), "4".into()],
                vec!["Sur".into(), " ".into(), "x".into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_raw_schema_uses_source_names() {
        let data = make_data();
        let raw = RawSchema::new(&data);
        assert_eq!(raw.index_of("Región(es) en la que se implementa").unwrap(), 0);
        assert_eq!(raw.index_of(REGION), Err(ViewError::missing(REGION)));
    }

    #[test]
    fn test_canonical_schema_renames_on_access() {
        let data = make_data();
        let canonical = CanonicalSchema::new(&data, &SourceColumns::default());
        assert_eq!(canonical.index_of(REGION).unwrap(), 0);
        assert_eq!(canonical.index_of(PARTICIPANTES).unwrap(), 1);
        // not renamed, passes through
        assert_eq!(canonical.index_of("Participantes directos (mujeres)").unwrap(), 2);
        // renamed away
        assert!(canonical.index_of("Región(es) en la que se implementa").is_err());
        // absent in both spellings
        assert_eq!(canonical.index_of(ESTRATO), Err(ViewError::missing(ESTRATO)));
        // dataset untouched
        assert_eq!(data.headers[0], "Región(es) en la que se implementa");
    }

    #[test]
    fn test_canonical_schema_accepts_already_renamed_source() {
        let data = Dataset::new(
            vec![REGION.into(), ESTRATO.into()],
            vec![vec!["Norte".into(), "A".into()]],
        )
        .unwrap();
        let canonical = CanonicalSchema::new(&data, &SourceColumns::default());
        assert_eq!(canonical.index_of(REGION).unwrap(), 0);
        assert_eq!(canonical.index_of(ESTRATO).unwrap(), 1);
    }

    #[test]
    fn test_column_numbers() {
        let data = make_data();
        let canonical = CanonicalSchema::new(&data, &SourceColumns::default());
        let participants = canonical.column(PARTICIPANTES).unwrap();
        assert_eq!(participants.number(0).unwrap(), Some(10.0));
        assert_eq!(participants.number(1).unwrap(), None);

        let women = canonical.column("Participantes directos (mujeres)").unwrap();
        let err = women.number(1).unwrap_err();
        assert_eq!(
            err,
            ViewError::NotNumeric {
                column: "Participantes directos (mujeres)".into(),
                row: 2,
                value: "x".into(),
            }
        );
        assert_eq!(women.values().collect::<Vec<_>>(), vec!["4", "x"]);
    }

    #[test]
    fn test_na_markers_and_non_finite_cells() {
        let data = Dataset::new(
            vec!["n".into()],
            ["NaN", " N/A ", "null", "inf", "-Infinity", "1e3"]
                .iter()
                .map(|s| vec![s.to_string()])
                .collect(),
        )
        .unwrap();
        let raw = RawSchema::new(&data);
        let n = raw.column("n").unwrap();
        assert_eq!(n.number(0).unwrap(), None);
        assert_eq!(n.number(1).unwrap(), None);
        assert_eq!(n.number(2).unwrap(), None);
        assert!(matches!(n.number(3), Err(ViewError::NotNumeric { row: 4, .. })));
        assert!(matches!(n.number(4), Err(ViewError::NotNumeric { row: 5, .. })));
        assert_eq!(n.number(5).unwrap(), Some(1000.0));

        assert!(is_missing("  "));
        assert!(!is_missing("0"));
        assert_eq!(parse_finite("NaN"), None);
    }
}
