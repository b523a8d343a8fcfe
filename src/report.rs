use crate::error::SummaryError;
use crate::types::{Assembled, ClusterRecord, PctId, Sample, VariantId};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;

const REQUIRED_COLUMNS: [&str; 5] = ["cluster", "ref_name", "assembled", "pct_id", "var_change"];

/// Column positions resolved from the report header
struct ColumnIndex {
    cluster: usize,
    ref_name: usize,
    assembled: usize,
    pct_id: usize,
    var_change: usize,
}

impl ColumnIndex {
    fn from_headers(headers: &csv::StringRecord, path: &Path) -> Result<Self> {
        let names: Vec<&str> = headers.iter().map(|h| h.trim_start_matches('#')).collect();
        let find = |name: &str| -> Result<usize> {
            names.iter().position(|h| *h == name).ok_or_else(|| {
                SummaryError::ReportFormat {
                    path: path.to_path_buf(),
                    message: format!(
                        "missing column '{}' (required: {})",
                        name,
                        REQUIRED_COLUMNS.join(", ")
                    ),
                }
                .into()
            })
        };

        Ok(Self {
            cluster: find("cluster")?,
            ref_name: find("ref_name")?,
            assembled: find("assembled")?,
            pct_id: find("pct_id")?,
            var_change: find("var_change")?,
        })
    }
}

/// One parsed report line
#[derive(Debug, Clone)]
struct ReportRow {
    cluster: String,
    ref_name: String,
    assembled: Assembled,
    pct_id: Option<PctId>,
    variant: Option<String>,
}

fn is_missing(value: &str) -> bool {
    value.is_empty() || value == "." || value == "NA"
}

fn field_at(record: &csv::StringRecord, idx: usize) -> Option<&str> {
    record.get(idx).map(str::trim)
}

fn parse_row(record: &csv::StringRecord, cols: &ColumnIndex, path: &Path, row: usize) -> Result<ReportRow> {
    let format_err = |message: String| -> anyhow::Error {
        SummaryError::ReportFormat {
            path: path.to_path_buf(),
            message: format!("row {}: {}", row, message),
        }
        .into()
    };
    let field = |idx: usize| {
        field_at(record, idx).ok_or_else(|| format_err(format!("expected at least {} fields", idx + 1)))
    };

    let assembled_raw = field(cols.assembled)?;
    let assembled = Assembled::parse(assembled_raw)
        .ok_or_else(|| format_err(format!("unknown assembled value '{}'", assembled_raw)))?;

    let pct_raw = field(cols.pct_id)?;
    let pct_id = if is_missing(pct_raw) {
        None
    } else {
        Some(
            PctId::parse(pct_raw)
                .ok_or_else(|| format_err(format!("bad pct_id '{}'", pct_raw)))?,
        )
    };

    let var_raw = field(cols.var_change)?;

    Ok(ReportRow {
        cluster: field(cols.cluster)?.to_string(),
        ref_name: field(cols.ref_name)?.to_string(),
        assembled,
        pct_id,
        variant: (!is_missing(var_raw)).then(|| var_raw.to_string()),
    })
}

/// Reduce every row of one cluster to its summary record and variant set.
fn summarise_cluster(rows: &[ReportRow], min_pc_id: f64) -> (ClusterRecord, Vec<VariantId>) {
    let assembled = rows
        .iter()
        .map(|r| r.assembled)
        .max()
        .unwrap_or(Assembled::No);

    // Row with the best identity supplies ref_seq and pct_id
    let best = rows
        .iter()
        .filter(|r| r.assembled.is_yes())
        .max_by(|a, b| {
            let score = |r: &ReportRow| r.pct_id.as_ref().map_or(f64::NEG_INFINITY, PctId::value);
            score(a).total_cmp(&score(b))
        });

    let best = match best {
        Some(b) if assembled.is_yes() && b.pct_id.as_ref().map_or(true, |p| p.value() >= min_pc_id) => b,
        _ => return (ClusterRecord::not_assembled(), Vec::new()),
    };

    let variants: Vec<VariantId> = rows
        .iter()
        .filter(|r| r.assembled.is_yes())
        .filter_map(|r| r.variant.as_ref().map(|v| VariantId::new(&r.ref_name, v)))
        .collect();

    let record = ClusterRecord {
        assembled,
        ref_seq: Some(best.ref_name.clone()),
        pct_id: best.pct_id.clone(),
        any_var: Some(!variants.is_empty()),
    };
    (record, variants)
}

/// Load one per-sample report.
///
/// Clusters below `min_pc_id` identity are kept but reported as not assembled,
/// so they still reach the unified cluster list.
pub fn load_sample(path: &Path, min_pc_id: f64) -> Result<Sample> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open report: {}", path.display()))?;

    let headers = rdr.headers()?.clone();
    let cols = ColumnIndex::from_headers(&headers, path)?;

    let mut by_cluster: BTreeMap<String, Vec<ReportRow>> = BTreeMap::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record.with_context(|| format!("Failed to parse {} row {}", path.display(), i + 1))?;
        let row = parse_row(&record, &cols, path, i + 1)?;
        by_cluster.entry(row.cluster.clone()).or_default().push(row);
    }

    let mut sample = Sample::new(path.to_string_lossy());
    for (cluster, rows) in by_cluster {
        let (record, variants) = summarise_cluster(&rows, min_pc_id);
        if !variants.is_empty() {
            sample
                .variants
                .insert(cluster.clone(), variants.into_iter().collect());
        }
        sample.clusters.insert(cluster, record);
    }

    Ok(sample)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;
    use tempfile::tempdir;

    const HEADER: &str = "#cluster\tref_name\tassembled\tpct_id\tvar_change\n";

    fn write_report(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(HEADER.as_bytes()).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_assembled_cluster_with_variants() {
        let dir = tempdir().unwrap();
        let path = write_report(
            dir.path(),
            "s1.tsv",
            "geneA\trefA1\tyes\t98.5\tA42T\n\
             geneA\trefA1\tyes\t98.5\tG10C\n\
             geneB\trefB1\tno\t.\t.\n",
        );

        let sample = load_sample(&path, 90.0).unwrap();
        assert_eq!(sample.name, path.to_string_lossy());

        let a = &sample.clusters["geneA"];
        assert_eq!(a.assembled, Assembled::Yes);
        assert_eq!(a.ref_seq.as_deref(), Some("refA1"));
        assert_relative_eq!(a.pct_id.as_ref().unwrap().value(), 98.5, epsilon = 1e-9);
        assert_eq!(a.any_var, Some(true));
        assert_eq!(sample.variants["geneA"].len(), 2);
        assert!(sample.variants["geneA"].contains(&VariantId::new("refA1", "A42T")));

        assert_eq!(sample.clusters["geneB"], ClusterRecord::not_assembled());
        assert!(!sample.variants.contains_key("geneB"));
    }

    #[test]
    fn test_best_identity_row_wins() {
        let dir = tempdir().unwrap();
        let path = write_report(
            dir.path(),
            "s1.tsv",
            "geneA\trefA1\tyes\t95.0\t.\n\
             geneA\trefA2\tyes\t99.1\t.\n",
        );

        let sample = load_sample(&path, 90.0).unwrap();
        let a = &sample.clusters["geneA"];
        assert_eq!(a.ref_seq.as_deref(), Some("refA2"));
        assert_eq!(a.any_var, Some(false));
    }

    #[test]
    fn test_below_min_identity_is_not_assembled() {
        let dir = tempdir().unwrap();
        let path = write_report(dir.path(), "s1.tsv", "geneA\trefA1\tyes\t85.0\tA42T\n");

        let sample = load_sample(&path, 90.0).unwrap();
        assert_eq!(sample.clusters["geneA"], ClusterRecord::not_assembled());
        assert!(sample.variants.is_empty());

        let lenient = load_sample(&path, 80.0).unwrap();
        assert!(lenient.clusters["geneA"].assembled.is_yes());
    }

    #[test]
    fn test_variants_only_assembly() {
        let dir = tempdir().unwrap();
        let path = write_report(dir.path(), "s1.tsv", "geneA\trefA1\tyes_variants_only\t.\tS83L\n");

        let sample = load_sample(&path, 90.0).unwrap();
        let a = &sample.clusters["geneA"];
        assert_eq!(a.assembled, Assembled::YesVariantsOnly);
        assert_eq!(a.pct_id, None);
        assert_eq!(a.any_var, Some(true));
    }

    #[test]
    fn test_unknown_assembled_value_rejected() {
        let dir = tempdir().unwrap();
        let path = write_report(dir.path(), "s1.tsv", "geneA\trefA1\tperhaps\t99.0\t.\n");

        let err = load_sample(&path, 90.0).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SummaryError>(),
            Some(SummaryError::ReportFormat { .. })
        ));
    }

    #[test]
    fn test_identity_text_kept() {
        let dir = tempdir().unwrap();
        let path = write_report(dir.path(), "s1.tsv", "geneA\trefA1\tyes\t99.0\t.\n");

        let sample = load_sample(&path, 90.0).unwrap();
        assert_eq!(sample.clusters["geneA"].pct_id.as_ref().unwrap().to_string(), "99.0");
    }

    #[test]
    fn test_non_finite_identity_rejected() {
        let dir = tempdir().unwrap();
        for value in ["NaN", "inf", "abc"] {
            let path = write_report(dir.path(), "s1.tsv", &format!("geneA\trefA1\tyes\t{}\t.\n", value));
            let err = load_sample(&path, 90.0).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<SummaryError>(),
                Some(SummaryError::ReportFormat { .. })
            ));
        }
    }

    #[test]
    fn test_missing_column_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.tsv");
        std::fs::write(&path, "#cluster\tref_name\nA\tB\n").unwrap();

        let err = load_sample(&path, 90.0).unwrap_err();
        assert!(err.to_string().contains("missing column 'assembled'"));
    }
}
