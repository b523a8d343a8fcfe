use crate::error::SummaryError;
use crate::rows::SampleRow;
use crate::types::Cell;
use anyhow::{Context, Result};
use std::io::{BufWriter, Write};
use std::path::Path;

const MIN_SAMPLES: usize = 3;
const MIN_FEATURES: usize = 2;

/// Samples reduced to numeric features, 0.0 meaning absent
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub names: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    /// Per cluster: identity (1.0 if assembled without one, 0.0 if not
    /// assembled), then each variant column as 1.0 for yes and 0.0 otherwise.
    pub fn from_rows(rows: &[SampleRow]) -> Self {
        let mut names = Vec::with_capacity(rows.len());
        let mut values = Vec::with_capacity(rows.len());

        for row in rows {
            let mut features = Vec::new();
            for cluster in row.clusters.values() {
                let presence = match (&cluster.pct_id, cluster.is_assembled()) {
                    (Cell::Identity(pct), true) => pct.value(),
                    (_, true) => 1.0,
                    (_, false) => 0.0,
                };
                features.push(presence);
                features.extend(
                    cluster
                        .variants
                        .values()
                        .map(|c| if *c == Cell::Yes { 1.0 } else { 0.0 }),
                );
            }
            names.push(row.name.clone());
            values.push(features);
        }

        Self { names, values }
    }

    pub fn n_features(&self) -> usize {
        self.values.first().map_or(0, Vec::len)
    }
}

/// 1 if exactly one of the two values is absent, else 0.
pub fn distance_between_values(a: f64, b: f64) -> u32 {
    if a != b && (a == 0.0 || b == 0.0) {
        1
    } else {
        0
    }
}

pub fn distance_between(a: &[f64], b: &[f64]) -> u32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .map(|(x, y)| distance_between_values(*x, *y))
        .sum()
}

/// Symmetric sample-by-sample presence/absence distances
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    pub names: Vec<String>,
    pub scores: Vec<Vec<u32>>,
}

impl DistanceMatrix {
    /// Fails with [`SummaryError::InsufficientData`] for fewer than three
    /// samples or fewer than two features.
    pub fn compute(features: &FeatureMatrix) -> Result<Self> {
        let n = features.names.len();
        if n < MIN_SAMPLES {
            return Err(SummaryError::InsufficientData(format!(
                "need at least {} samples, got {}",
                MIN_SAMPLES, n
            ))
            .into());
        }
        if features.n_features() < MIN_FEATURES {
            return Err(SummaryError::InsufficientData(format!(
                "need at least {} feature columns, got {}",
                MIN_FEATURES,
                features.n_features()
            ))
            .into());
        }

        let mut scores = vec![vec![0u32; n]; n];
        for i in 0..n {
            for j in (i + 1)..n {
                let d = distance_between(&features.values[i], &features.values[j]);
                scores[i][j] = d;
                scores[j][i] = d;
            }
        }

        Ok(Self {
            names: features.names.clone(),
            scores,
        })
    }

    /// Tab-separated: header of all sample names, then one labelled line per sample.
    pub fn write(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create distance matrix: {}", path.display()))?;
        let mut w = BufWriter::new(file);

        writeln!(w, "{}", self.names.join("\t"))?;
        for (name, row) in self.names.iter().zip(&self.scores) {
            let scores: Vec<String> = row.iter().map(u32::to_string).collect();
            writeln!(w, "{}\t{}", name, scores.join("\t"))?;
        }

        w.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rows::build_rows;
    use crate::schema::UnifiedSchema;
    use crate::types::{Assembled, ClusterRecord, PctId, Sample};
    use tempfile::tempdir;

    fn features(values: Vec<Vec<f64>>) -> FeatureMatrix {
        FeatureMatrix {
            names: (0..values.len()).map(|i| format!("s{}", i + 1)).collect(),
            values,
        }
    }

    #[test]
    fn test_value_distance() {
        assert_eq!(distance_between_values(0.0, 0.0), 0);
        assert_eq!(distance_between_values(98.0, 99.0), 0);
        assert_eq!(distance_between_values(98.0, 98.0), 0);
        assert_eq!(distance_between_values(0.0, 1.0), 1);
        assert_eq!(distance_between_values(97.5, 0.0), 1);
    }

    #[test]
    fn test_matrix_symmetric_with_zero_diagonal() {
        let m = DistanceMatrix::compute(&features(vec![
            vec![99.0, 1.0, 0.0],
            vec![0.0, 1.0, 1.0],
            vec![98.0, 0.0, 0.0],
        ]))
        .unwrap();

        for i in 0..3 {
            assert_eq!(m.scores[i][i], 0);
            for j in 0..3 {
                assert_eq!(m.scores[i][j], m.scores[j][i]);
            }
        }
        assert_eq!(m.scores[0][1], 2);
        assert_eq!(m.scores[0][2], 1);
        assert_eq!(m.scores[1][2], 3);
    }

    #[test]
    fn test_too_few_samples() {
        let err = DistanceMatrix::compute(&features(vec![vec![1.0, 0.0], vec![0.0, 1.0]])).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SummaryError>(),
            Some(SummaryError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_too_few_features() {
        let err = DistanceMatrix::compute(&features(vec![vec![1.0], vec![0.0], vec![1.0]])).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SummaryError>(),
            Some(SummaryError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_features_from_rows() {
        let mut s1 = Sample::new("s1");
        s1.clusters.insert(
            "geneA".into(),
            ClusterRecord {
                assembled: Assembled::Yes,
                ref_seq: Some("refA".into()),
                pct_id: Some(PctId::from(99.5)),
                any_var: Some(false),
            },
        );
        s1.clusters.insert(
            "geneB".into(),
            ClusterRecord {
                assembled: Assembled::YesVariantsOnly,
                ref_seq: Some("refB".into()),
                pct_id: None,
                any_var: Some(false),
            },
        );
        let s2 = Sample::new("s2");
        let samples = vec![s1, s2];
        let schema = UnifiedSchema::from_samples(&samples);
        let m = FeatureMatrix::from_rows(&build_rows(&schema, &samples, true));

        assert_eq!(m.names, vec!["s1", "s2"]);
        assert_eq!(m.values[0], vec![99.5, 1.0]);
        assert_eq!(m.values[1], vec![0.0, 0.0]);
    }

    #[test]
    fn test_write_matrix_file() {
        let m = DistanceMatrix::compute(&features(vec![
            vec![1.0, 1.0],
            vec![0.0, 1.0],
            vec![0.0, 0.0],
        ]))
        .unwrap();

        let dir = tempdir().unwrap();
        let path = dir.path().join("out.distance_matrix");
        m.write(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "s1\ts2\ts3\ns1\t0\t1\t2\ns2\t1\t0\t1\ns3\t2\t1\t0\n");
    }
}
