use crate::error::ViewError;
use crate::schema::Schema;
use std::collections::{BTreeMap, HashMap};

/// One group of a group-by-sum: key values in key order, and the sum
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSum {
    pub keys: Vec<String>,
    pub sum: f64,
}

/// Integer codes per row plus the distinct values, code = position in `uniques`
#[derive(Debug, Clone, PartialEq)]
pub struct Factorized {
    pub codes: Vec<usize>,
    pub uniques: Vec<String>,
}

/// Count rows per distinct value, in order of first appearance.
/// Blank cells form their own category.
pub fn value_counts<S: Schema + ?Sized>(
    schema: &S,
    column: &str,
) -> Result<Vec<(String, usize)>, ViewError> {
    let col = schema.column(column)?;

    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(String, usize)> = Vec::new();
    for value in col.values() {
        match positions.get(value) {
            Some(&pos) => counts[pos].1 += 1,
            None => {
                positions.insert(value, counts.len());
                counts.push((value.to_string(), 1));
            }
        }
    }

    Ok(counts)
}

/// Descending by count; equal counts keep their relative order
pub fn sort_by_count_desc(counts: &mut [(String, usize)]) {
    counts.sort_by(|a, b| b.1.cmp(&a.1));
}

/// Share of each count in the total. An empty input yields no rows.
pub fn proportions(counts: &[(String, usize)]) -> Vec<(String, usize, f64)> {
    let total: usize = counts.iter().map(|(_, n)| n).sum();
    if total == 0 {
        return Vec::new();
    }

    counts
        .iter()
        .map(|(key, n)| (key.clone(), *n, *n as f64 / total as f64))
        .collect()
}

/// Sum `value` grouped by the tuple of `keys`.
///
/// Only key tuples present in the data appear. Groups are ordered by key tuple.
/// Blank and NA values are skipped; any other non-numeric cell fails the whole view.
pub fn group_sum<S: Schema + ?Sized>(
    schema: &S,
    keys: &[&str],
    value: &str,
) -> Result<Vec<GroupSum>, ViewError> {
    let key_cols = keys
        .iter()
        .map(|k| schema.column(k))
        .collect::<Result<Vec<_>, _>>()?;
    let value_col = schema.column(value)?;

    let mut groups: BTreeMap<Vec<&str>, f64> = BTreeMap::new();
    for row in 0..value_col.len() {
        let key: Vec<&str> = key_cols.iter().map(|c| c.get(row)).collect();
        let amount = value_col.number(row)?.unwrap_or(0.0);
        *groups.entry(key).or_insert(0.0) += amount;
    }

    Ok(groups
        .into_iter()
        .map(|(keys, sum)| GroupSum {
            keys: keys.into_iter().map(str::to_string).collect(),
            sum,
        })
        .collect())
}

/// Assign each distinct value an integer code, starting at 0, in order of first appearance
pub fn factorize<S: Schema + ?Sized>(schema: &S, column: &str) -> Result<Factorized, ViewError> {
    let col = schema.column(column)?;

    let mut lookup: HashMap<&str, usize> = HashMap::new();
    let mut uniques = Vec::new();
    let mut codes = Vec::with_capacity(col.len());
    for value in col.values() {
        let code = *lookup.entry(value).or_insert_with(|| {
            uniques.push(value.to_string());
            uniques.len() - 1
        });
        codes.push(code);
    }

    Ok(Factorized { codes, uniques })
}

/// Stable sort by one key position, descending, then keep the first `n` groups
pub fn top_by_key_desc(mut groups: Vec<GroupSum>, key_pos: usize, n: usize) -> Vec<GroupSum> {
    groups.sort_by(|a, b| b.keys[key_pos].cmp(&a.keys[key_pos]));
    groups.truncate(n);
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Dataset;
    use crate::schema::RawSchema;

    fn make_data() -> Dataset {
        Dataset::new(
            vec!["region".into(), "estrato".into(), "n".into()],
            vec![
                vec!["Sur".into(), "B".into(), "5".into()],
                vec!["Norte".into(), "A".into(), "2".into()],
                vec!["Sur".into(), "A".into(), "".into()],
                vec!["Sur".into(), "B".into(), "1.5".into()],
                vec!["".into(), "C".into(), "4".into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_value_counts_first_seen_order() {
        let data = make_data();
        let counts = value_counts(&RawSchema::new(&data), "region").unwrap();
        assert_eq!(
            counts,
            vec![("Sur".into(), 3), ("Norte".into(), 1), ("".into(), 1)]
        );
    }

    #[test]
    fn test_sort_by_count_is_stable() {
        let mut counts = vec![("a".into(), 1), ("b".into(), 2), ("c".into(), 1)];
        sort_by_count_desc(&mut counts);
        assert_eq!(counts, vec![("b".into(), 2), ("a".into(), 1), ("c".into(), 1)]);
    }

    #[test]
    fn test_proportions() {
        let props = proportions(&[("si".into(), 3), ("no".into(), 1)]);
        assert_eq!(props[0].2, 0.75);
        assert_eq!(props[1].2, 0.25);
        assert!(proportions(&[]).is_empty());
    }

    #[test]
    fn test_group_sum_two_keys() {
        let data = make_data();
        let groups = group_sum(&RawSchema::new(&data), &["region", "estrato"], "n").unwrap();
        let flat: Vec<(Vec<String>, f64)> = groups.into_iter().map(|g| (g.keys, g.sum)).collect();
        assert_eq!(
            flat,
            vec![
                (vec!["".to_string(), "C".to_string()], 4.0),
                (vec!["Norte".to_string(), "A".to_string()], 2.0),
                (vec!["Sur".to_string(), "A".to_string()], 0.0),
                (vec!["Sur".to_string(), "B".to_string()], 6.5),
            ]
        );
    }

    #[test]
    fn test_group_sum_errors() {
        let data = make_data();
        let schema = RawSchema::new(&data);
        assert_eq!(
            group_sum(&schema, &["missing"], "n"),
            Err(ViewError::missing("missing"))
        );
        assert!(matches!(
            group_sum(&schema, &["region"], "estrato"),
            Err(ViewError::NotNumeric { .. })
        ));
    }

    #[test]
    fn test_group_sum_skips_nan_cells() {
        let data = Dataset::new(
            vec!["region".into(), "n".into()],
            vec![
                vec!["Caribe".into(), "NaN".into()],
                vec!["Caribe".into(), "5".into()],
                vec!["Andina".into(), "#N/A".into()],
            ],
        )
        .unwrap();
        let groups = group_sum(&RawSchema::new(&data), &["region"], "n").unwrap();
        let sums: Vec<f64> = groups.iter().map(|g| g.sum).collect();
        assert_eq!(sums, vec![0.0, 5.0]);
        assert!(sums.iter().all(|s| s.is_finite()));

        let data = Dataset::new(vec!["region".into(), "n".into()], vec![vec!["Caribe".into(), "inf".into()]])
            .unwrap();
        assert!(matches!(
            group_sum(&RawSchema::new(&data), &["region"], "n"),
            Err(ViewError::NotNumeric { row: 1, .. })
        ));
    }

    #[test]
    fn test_factorize() {
        let data = make_data();
        let f = factorize(&RawSchema::new(&data), "estrato").unwrap();
        assert_eq!(f.uniques, vec!["B", "A", "C"]);
        assert_eq!(f.codes, vec![0, 1, 1, 0, 2]);
    }

    #[test]
    fn test_top_by_key_desc() {
        let groups: Vec<GroupSum> = ["C", "A", "B", "A"]
            .iter()
            .enumerate()
            .map(|(i, k)| GroupSum {
                keys: vec![format!("r{}", i), k.to_string()],
                sum: i as f64,
            })
            .collect();
        let top = top_by_key_desc(groups, 1, 3);
        let order: Vec<&str> = top.iter().map(|g| g.keys[1].as_str()).collect();
        assert_eq!(order, vec!["C", "B", "A"]);
        assert_eq!(top[2].keys[0], "r1");
    }
}
