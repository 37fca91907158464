//! Raw record to canonical record conversion.

use log::debug;
use regex::Regex;
use std::sync::LazyLock;

use super::{CanonicalRecord, ColumnMapping, FieldValue, RawRecord};
use crate::catalog::CanonicalField;

static LABEL_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s\-_]+").expect("separator pattern is valid"));

/// Fold a column label into canonical key form: trimmed, lowercase, with runs
/// of whitespace, hyphens and underscores collapsed into one `_`.
///
/// `" Client-Name "` becomes `"client_name"`.
pub fn normalize_label(label: &str) -> String {
    let lowered = label.trim().to_lowercase();
    LABEL_SEPARATORS
        .replace_all(&lowered, "_")
        .trim_matches('_')
        .to_string()
}

/// Convert `raw` into a record holding exactly `keys`.
///
/// With a non-empty mapping every key is read from its mapped column; an
/// unmapped key or a mapped column the row does not have yields
/// `FieldValue::Missing`. Without one, each key is matched exactly first and
/// then against the normalized column labels, first column in row order
/// winning. Keys listed twice are kept once.
pub fn normalize_record(
    raw: &RawRecord,
    keys: &[CanonicalField],
    mapping: Option<&ColumnMapping>,
) -> CanonicalRecord {
    let mapping = mapping.filter(|mapping| !mapping.is_empty());
    let mut fields: Vec<(CanonicalField, FieldValue)> = Vec::with_capacity(keys.len());

    for &key in keys {
        if fields.iter().any(|(existing, _)| *existing == key) {
            continue;
        }

        let value = match mapping {
            Some(mapping) => mapped_value(raw, key, mapping),
            None => matched_value(raw, key),
        };
        fields.push((key, value));
    }

    CanonicalRecord::from_fields(fields)
}

/// Best-effort mapping proposal for a header row, using the same label
/// matching as `normalize_record`.
pub fn suggest_mapping(headers: &[String]) -> ColumnMapping {
    CanonicalField::ALL
        .iter()
        .filter_map(|field| {
            headers
                .iter()
                .find(|header| header.as_str() == field.key())
                .or_else(|| {
                    headers
                        .iter()
                        .find(|header| normalize_label(header) == field.key())
                })
                .map(|header| (*field, header.clone()))
        })
        .collect()
}

fn mapped_value(raw: &RawRecord, key: CanonicalField, mapping: &ColumnMapping) -> FieldValue {
    let Some(column) = mapping.column_for(key) else {
        return FieldValue::Missing;
    };

    match raw.get(column) {
        Some(value) => FieldValue::Present(value.clone()),
        None => {
            debug!("mapped column '{}' for '{}' is not in the record", column, key);
            FieldValue::Missing
        }
    }
}

fn matched_value(raw: &RawRecord, key: CanonicalField) -> FieldValue {
    if let Some(value) = raw.get(key.key()) {
        return FieldValue::Present(value.clone());
    }

    raw.columns()
        .find(|(name, _)| normalize_label(name) == key.key())
        .map(|(_, value)| FieldValue::Present(value.clone()))
        .unwrap_or(FieldValue::Missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RawValue;

    fn sample_row() -> RawRecord {
        [
            ("Name", RawValue::text("Acme Ltd")),
            ("Task", RawValue::text("SEO audit")),
            ("Status", RawValue::text("Done")),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_normalize_label_folds_case_and_separators() {
        assert_eq!(normalize_label(" Client-Name "), "client_name");
        assert_eq!(normalize_label("CLIENT   name"), "client_name");
        assert_eq!(normalize_label("client__-name"), "client_name");
        assert_eq!(normalize_label("Amount"), "amount");
    }

    #[test]
    fn test_mapping_reads_mapped_columns() {
        let mapping = ColumnMapping::new()
            .with(CanonicalField::ClientName, "Name")
            .with(CanonicalField::Task, "Task");

        let record = normalize_record(&sample_row(), &CanonicalField::ALL, Some(&mapping));

        assert_eq!(
            record.get(CanonicalField::ClientName),
            &FieldValue::Present(RawValue::text("Acme Ltd"))
        );
        assert_eq!(
            record.get(CanonicalField::Task),
            &FieldValue::Present(RawValue::text("SEO audit"))
        );
        // Partial mapping: Status is in the row but not mapped.
        assert!(record.get(CanonicalField::Status).is_missing());
    }

    #[test]
    fn test_mapping_to_absent_column_yields_missing() {
        let mapping = ColumnMapping::new().with(CanonicalField::Comments, "Notes");
        let record = normalize_record(&sample_row(), &CanonicalField::ALL, Some(&mapping));
        assert!(record.get(CanonicalField::Comments).is_missing());
    }

    #[test]
    fn test_best_effort_matches_normalized_labels() {
        let raw: RawRecord = [
            (" Client-Name ", RawValue::text("Acme")),
            ("STATUS", RawValue::text("Open")),
        ]
        .into_iter()
        .collect();

        let record = normalize_record(&raw, &CanonicalField::ALL, None);

        assert_eq!(
            record.get(CanonicalField::ClientName),
            &FieldValue::Present(RawValue::text("Acme"))
        );
        assert_eq!(
            record.get(CanonicalField::Status),
            &FieldValue::Present(RawValue::text("Open"))
        );
        assert!(record.get(CanonicalField::Task).is_missing());
    }

    #[test]
    fn test_exact_key_beats_earlier_normalized_match() {
        let raw: RawRecord = [
            ("Client Name", RawValue::text("loose")),
            ("client_name", RawValue::text("exact")),
        ]
        .into_iter()
        .collect();

        let record = normalize_record(&raw, &[CanonicalField::ClientName], None);
        assert_eq!(
            record.get(CanonicalField::ClientName),
            &FieldValue::Present(RawValue::text("exact"))
        );
    }

    #[test]
    fn test_colliding_columns_first_match_wins() {
        let raw: RawRecord = [
            ("Client Name", RawValue::text("first")),
            ("client-name", RawValue::text("second")),
        ]
        .into_iter()
        .collect();

        let record = normalize_record(&raw, &[CanonicalField::ClientName], None);
        assert_eq!(
            record.get(CanonicalField::ClientName),
            &FieldValue::Present(RawValue::text("first"))
        );
    }

    #[test]
    fn test_empty_mapping_falls_back_to_matching() {
        let raw: RawRecord = [("task", RawValue::text("Call back"))].into_iter().collect();
        let mapping = ColumnMapping::new().with(CanonicalField::Task, "");

        let record = normalize_record(&raw, &CanonicalField::ALL, Some(&mapping));
        assert_eq!(
            record.get(CanonicalField::Task),
            &FieldValue::Present(RawValue::text("Call back"))
        );
    }

    #[test]
    fn test_output_has_exactly_requested_keys() {
        let shapes: Vec<RawRecord> = vec![
            RawRecord::new(),
            sample_row(),
            [
                ("amount", RawValue::Number(3.0)),
                ("extra", RawValue::text("x")),
                ("other", RawValue::Empty),
            ]
            .into_iter()
            .collect(),
        ];
        let key_sets: Vec<Vec<CanonicalField>> = vec![
            vec![],
            CanonicalField::ALL.to_vec(),
            vec![CanonicalField::Amount, CanonicalField::Task],
            vec![CanonicalField::Date, CanonicalField::Date],
        ];
        let mapping = ColumnMapping::new().with(CanonicalField::Amount, "amount");

        for raw in &shapes {
            for keys in &key_sets {
                for mapping in [None, Some(&mapping)] {
                    let record = normalize_record(raw, keys, mapping);
                    let mut expected = keys.clone();
                    expected.dedup();
                    assert_eq!(record.keys().collect::<Vec<_>>(), expected);
                }
            }
        }
    }

    #[test]
    fn test_suggest_mapping_uses_label_matching() {
        let headers = vec![
            "Client Name".to_string(),
            "task".to_string(),
            "Due".to_string(),
        ];
        let mapping = suggest_mapping(&headers);
        assert_eq!(mapping.column_for(CanonicalField::ClientName), Some("Client Name"));
        assert_eq!(mapping.column_for(CanonicalField::Task), Some("task"));
        assert_eq!(mapping.column_for(CanonicalField::Date), None);
    }
}
