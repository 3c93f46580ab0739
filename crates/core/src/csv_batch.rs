//! Batch CSV ingestion and results export.
//!
//! Ingestion turns an uploaded CSV into one field map per task after
//! checking it against the project's template fields. Every problem found is
//! collected so the requester sees the full list in one response. Export
//! produces the results CSV: input columns, optional worker columns, and one
//! column per answer field.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Column prefix for original CSV values in the results file.
pub const INPUT_PREFIX: &str = "Input.";

/// Column prefix for submitted answer values in the results file.
pub const ANSWER_PREFIX: &str = "Answer.";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// A validated batch CSV.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedBatchCsv {
    /// Header fields in file order.
    pub fields: Vec<String>,
    /// One map per data row, keyed by header field.
    pub rows: Vec<HashMap<String, String>>,
}

/// Parse and validate a batch CSV against the project's template fields.
///
/// Checks, all reported together:
/// - the header field set equals the template field set;
/// - the header has no duplicate fields;
/// - every row has as many values as the header.
pub fn parse_batch_csv(
    bytes: &[u8],
    template_fields: &[String],
) -> Result<ParsedBatchCsv, CoreError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);
    let mut records = reader.records();

    let header = match records.next() {
        Some(Ok(record)) => record,
        Some(Err(e)) => {
            return Err(CoreError::InvalidInput(vec![format!(
                "The CSV file could not be read: {e}"
            )]))
        }
        None => {
            return Err(CoreError::InvalidInput(vec![
                "The CSV file is empty".to_string()
            ]))
        }
    };
    let fields: Vec<String> = header.iter().map(str::to_string).collect();

    let mut errors = header_errors(&fields, template_fields);

    let mut rows = Vec::new();
    for (i, record) in records.enumerate() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                errors.push(format!("The CSV file could not be read: {e}"));
                break;
            }
        };
        if record.len() != fields.len() {
            let line = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(i + 2);
            errors.push(format!(
                "The CSV file header has {} fields, but line {} has {} fields",
                fields.len(),
                line,
                record.len()
            ));
            continue;
        }
        rows.push(
            fields
                .iter()
                .cloned()
                .zip(record.iter().map(str::to_string))
                .collect(),
        );
    }

    if !errors.is_empty() {
        return Err(CoreError::InvalidInput(errors));
    }

    Ok(ParsedBatchCsv { fields, rows })
}

/// Compare the CSV header with the template fields.
///
/// Extra and missing fields are listed in the order they appear in the CSV
/// header and template respectively.
fn header_errors(header: &[String], template_fields: &[String]) -> Vec<String> {
    let mut errors = Vec::new();

    let mut seen = HashSet::new();
    for field in header {
        if !seen.insert(field.as_str()) {
            errors.push(format!(
                "The CSV file header contains the field \"{field}\" more than once"
            ));
        }
    }

    let template: HashSet<&str> = template_fields.iter().map(String::as_str).collect();

    let extra: Vec<&str> = dedup(header.iter().map(String::as_str))
        .into_iter()
        .filter(|f| !template.contains(f))
        .collect();
    if !extra.is_empty() {
        errors.push(format!(
            "The CSV file contained fields that are not in the HTML template. \
             These extra fields are: {}",
            extra.join(", ")
        ));
    }

    let missing: Vec<&str> = template_fields
        .iter()
        .map(String::as_str)
        .filter(|f| !seen.contains(f))
        .collect();
    if !missing.is_empty() {
        errors.push(format!(
            "The CSV file is missing fields that are in the HTML template. \
             These missing fields are: {}",
            missing.join(", ")
        ));
    }

    errors
}

fn dedup<'a>(items: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    items.filter(|i| seen.insert(*i)).collect()
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// One completed assignment in the results file.
#[derive(Debug, Clone)]
pub struct ExportAssignment {
    pub assignment_id: DbId,
    /// Username of the worker, `None` for anonymous workers.
    pub worker: Option<String>,
    pub accepted_at: Timestamp,
    pub submitted_at: Option<Timestamp>,
    pub answers: HashMap<String, String>,
}

/// One task with its input values and completed assignments.
#[derive(Debug, Clone)]
pub struct ExportTask {
    pub task_id: DbId,
    pub input: HashMap<String, String>,
    pub assignments: Vec<ExportAssignment>,
}

/// Write the results CSV for a batch.
///
/// Each completed assignment becomes one row. A task with no completed
/// assignment still gets a row with empty answer columns so that every
/// input row appears in the file.
pub fn write_results_csv(
    input_fields: &[String],
    tasks: &[ExportTask],
    include_worker_identity: bool,
) -> Result<Vec<u8>, CoreError> {
    let answer_fields: BTreeSet<&str> = tasks
        .iter()
        .flat_map(|t| t.assignments.iter())
        .flat_map(|a| a.answers.keys().map(String::as_str))
        .collect();

    let mut header: Vec<String> = vec!["HITId".to_string(), "AssignmentId".to_string()];
    if include_worker_identity {
        header.extend(
            ["WorkerId", "AcceptTime", "SubmitTime", "WorkTimeInSeconds"]
                .iter()
                .map(|s| s.to_string()),
        );
    }
    header.extend(input_fields.iter().map(|f| format!("{INPUT_PREFIX}{f}")));
    header.extend(answer_fields.iter().map(|f| format!("{ANSWER_PREFIX}{f}")));

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&header).map_err(csv_error)?;

    for task in tasks {
        let inputs: Vec<String> = input_fields
            .iter()
            .map(|f| task.input.get(f).cloned().unwrap_or_default())
            .collect();

        if task.assignments.is_empty() {
            let mut row = vec![task.task_id.to_string(), String::new()];
            if include_worker_identity {
                row.extend(std::iter::repeat(String::new()).take(4));
            }
            row.extend(inputs);
            row.extend(std::iter::repeat(String::new()).take(answer_fields.len()));
            writer.write_record(&row).map_err(csv_error)?;
            continue;
        }

        for assignment in &task.assignments {
            let mut row = vec![task.task_id.to_string(), assignment.assignment_id.to_string()];
            if include_worker_identity {
                row.push(assignment.worker.clone().unwrap_or_default());
                row.push(assignment.accepted_at.to_rfc3339());
                row.push(
                    assignment
                        .submitted_at
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_default(),
                );
                row.push(
                    assignment
                        .submitted_at
                        .map(|t| (t - assignment.accepted_at).num_seconds().to_string())
                        .unwrap_or_default(),
                );
            }
            row.extend(inputs.iter().cloned());
            row.extend(
                answer_fields
                    .iter()
                    .map(|f| assignment.answers.get(*f).cloned().unwrap_or_default()),
            );
            writer.write_record(&row).map_err(csv_error)?;
        }
    }

    writer
        .into_inner()
        .map_err(|e| CoreError::Internal(format!("Failed to finish results CSV: {e}")))
}

fn csv_error(e: csv::Error) -> CoreError {
    CoreError::Internal(format!("Failed to write results CSV: {e}"))
}

/// Download filename for a batch's results, e.g. `Sentiment-Batch_1_results.csv`.
pub fn results_filename(project_name: &str, batch_name: &str) -> String {
    let clean = |s: &str| -> String {
        s.chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    };
    format!("{}-{}_results.csv", clean(project_name), clean(batch_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{Duration, TimeZone, Utc};

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn messages(err: CoreError) -> Vec<String> {
        match err {
            CoreError::InvalidInput(msgs) => msgs,
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn parses_rows_into_field_maps() {
        let parsed = parse_batch_csv(b"a,b\n1,2\n3,4\n", &names(&["b", "a"])).unwrap();
        assert_eq!(parsed.fields, names(&["a", "b"]));
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[1]["a"], "3");
        assert_eq!(parsed.rows[1]["b"], "4");
    }

    #[test]
    fn handles_bom_and_quoted_values() {
        let csv = "\u{FEFF}text,id\n\"hello, world\",7\n\"multi\nline\",8\n";
        let parsed = parse_batch_csv(csv.as_bytes(), &names(&["text", "id"])).unwrap();
        assert_eq!(parsed.fields, names(&["text", "id"]));
        assert_eq!(parsed.rows[0]["text"], "hello, world");
        assert_eq!(parsed.rows[1]["text"], "multi\nline");
    }

    #[test]
    fn mismatched_header_names_both_sides() {
        let err = parse_batch_csv(b"title\nx\n", &names(&["name"])).unwrap_err();
        let msgs = messages(err);
        assert_eq!(msgs.len(), 2);
        assert!(msgs[0].contains("not in the HTML template"));
        assert!(msgs[0].ends_with("These extra fields are: title"));
        assert!(msgs[1].contains("missing fields"));
        assert!(msgs[1].ends_with("These missing fields are: name"));
    }

    #[test]
    fn row_length_errors_are_collected() {
        let err = parse_batch_csv(b"a,b\n1,2\n1\n1,2,3\n", &names(&["a", "b"])).unwrap_err();
        let msgs = messages(err);
        assert_eq!(
            msgs,
            vec![
                "The CSV file header has 2 fields, but line 3 has 1 fields".to_string(),
                "The CSV file header has 2 fields, but line 4 has 3 fields".to_string(),
            ]
        );
    }

    #[test]
    fn header_and_row_errors_reported_together() {
        let err = parse_batch_csv(b"a,c\n1\n", &names(&["a", "b"])).unwrap_err();
        assert_eq!(messages(err).len(), 3);
    }

    #[test]
    fn empty_file_is_rejected() {
        let err = parse_batch_csv(b"", &names(&["a"])).unwrap_err();
        assert_matches!(err, CoreError::InvalidInput(ref m) if m[0] == "The CSV file is empty");
    }

    #[test]
    fn duplicate_header_field_is_rejected() {
        let err = parse_batch_csv(b"a,a\n1,2\n", &names(&["a"])).unwrap_err();
        let msgs = messages(err);
        assert_eq!(msgs.len(), 1);
        assert!(msgs[0].contains("more than once"));
    }

    #[test]
    fn header_only_file_has_no_rows() {
        let parsed = parse_batch_csv(b"a\n", &names(&["a"])).unwrap();
        assert!(parsed.rows.is_empty());
    }

    fn task(id: DbId, a: &str, b: &str, assignments: Vec<ExportAssignment>) -> ExportTask {
        ExportTask {
            task_id: id,
            input: [("a".to_string(), a.to_string()), ("b".to_string(), b.to_string())]
                .into_iter()
                .collect(),
            assignments,
        }
    }

    #[test]
    fn export_appends_answer_columns_after_inputs() {
        let accepted = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let done = ExportAssignment {
            assignment_id: 10,
            worker: Some("ada".to_string()),
            accepted_at: accepted,
            submitted_at: Some(accepted + Duration::seconds(42)),
            answers: [("label".to_string(), "yes".to_string())].into_iter().collect(),
        };
        let tasks = vec![task(1, "1", "2", vec![done]), task(2, "3", "4", vec![])];

        let bytes = write_results_csv(&names(&["a", "b"]), &tasks, false).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "HITId,AssignmentId,Input.a,Input.b,Answer.label");
        assert_eq!(lines[1], "1,10,1,2,yes");
        assert_eq!(lines[2], "2,,3,4,");
    }

    #[test]
    fn export_with_worker_identity_includes_timing() {
        let accepted = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let done = ExportAssignment {
            assignment_id: 10,
            worker: None,
            accepted_at: accepted,
            submitted_at: Some(accepted + Duration::seconds(90)),
            answers: HashMap::new(),
        };
        let bytes =
            write_results_csv(&names(&["a", "b"]), &[task(1, "x", "y", vec![done])], true)
                .unwrap();
        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[2], "WorkerId");
        let row = reader.records().next().unwrap().unwrap();
        assert_eq!(&row[2], "");
        assert_eq!(&row[5], "90");
        assert_eq!(&row[6], "x");
    }

    #[test]
    fn results_filename_replaces_unsafe_characters() {
        assert_eq!(
            results_filename("Sentiment v2", "batch/1"),
            "Sentiment_v2-batch_1_results.csv"
        );
    }
}
