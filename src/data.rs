use crate::error::LoadError;
use serde_json::Value;
use std::collections::HashSet;
use std::io::Read;

/// An in-memory table: trimmed, unique headers and rectangular string rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Dataset {
    /// Build a dataset, trimming header whitespace and checking the table shape.
    /// Cell values are kept verbatim.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, LoadError> {
        let headers = normalize_headers(headers)?;

        for (idx, row) in rows.iter().enumerate() {
            if row.len() != headers.len() {
                return Err(LoadError::RaggedRow {
                    row: idx + 1,
                    expected: headers.len(),
                    found: row.len(),
                });
            }
        }

        Ok(Self { headers, rows })
    }

    /// Read a headed CSV table from any reader
    pub fn from_csv<R: Read>(reader: R) -> Result<Self, LoadError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Self::new(headers, rows)
    }

    /// Create a Dataset from a JSON Array of Objects
    pub fn from_json(value: &Value) -> Result<Self, LoadError> {
        let array = value
            .as_array()
            .ok_or_else(|| LoadError::InvalidJson("input data must be a JSON array of objects".into()))?;

        let Some(first) = array.first() else {
            return Self::new(Vec::new(), Vec::new());
        };

        // Headers come from the first object
        let first_obj = first
            .as_object()
            .ok_or_else(|| LoadError::InvalidJson("items in array must be objects".into()))?;
        let headers: Vec<String> = first_obj.keys().cloned().collect();

        let mut rows = Vec::with_capacity(array.len());
        for (idx, item) in array.iter().enumerate() {
            let obj = item
                .as_object()
                .ok_or_else(|| LoadError::InvalidJson("items in array must be objects".into()))?;

            let mut row = Vec::with_capacity(headers.len());
            for header in &headers {
                let cell = match obj.get(header) {
                    Some(Value::String(s)) => s.clone(),
                    Some(Value::Number(n)) => n.to_string(),
                    Some(Value::Bool(b)) => b.to_string(),
                    Some(Value::Null) | None => String::new(),
                    Some(_) => {
                        return Err(LoadError::BadCell {
                            row: idx + 1,
                            column: header.clone(),
                            detail: "nested JSON values are not supported".into(),
                        })
                    }
                };
                row.push(cell);
            }
            rows.push(row);
        }

        Self::new(headers, rows)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Copy of the dataset without the named column (no-op if absent)
    pub fn without_column(&self, name: &str) -> Self {
        let Some(idx) = self.column_index(name) else {
            return self.clone();
        };

        let mut headers = self.headers.clone();
        headers.remove(idx);
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut row = row.clone();
                row.remove(idx);
                row
            })
            .collect();

        Self { headers, rows }
    }
}

fn normalize_headers(headers: Vec<String>) -> Result<Vec<String>, LoadError> {
    let mut seen = HashSet::new();
    let mut normalized = Vec::with_capacity(headers.len());

    for (idx, header) in headers.into_iter().enumerate() {
        let trimmed = header.trim();
        let name = if trimmed.is_empty() {
            format!("Unnamed: {}", idx)
        } else {
            trimmed.to_string()
        };

        if !seen.insert(name.clone()) {
            return Err(LoadError::DuplicateColumn(name));
        }
        normalized.push(name);
    }

    Ok(normalized)
}
