use crate::types::{Sample, VariantId};
use std::collections::{BTreeMap, BTreeSet};

/// Every cluster seen in any sample, each with the variants observed in the
/// samples that assembled it. Built once from all samples and never mutated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnifiedSchema {
    clusters: BTreeMap<String, BTreeSet<VariantId>>,
}

impl UnifiedSchema {
    /// Reduce all loaded samples to the shared column space.
    pub fn from_samples(samples: &[Sample]) -> Self {
        let mut clusters: BTreeMap<String, BTreeSet<VariantId>> = BTreeMap::new();

        for sample in samples {
            for cluster in sample.clusters.keys() {
                clusters.entry(cluster.clone()).or_default();
            }

            for (cluster, variants) in &sample.variants {
                if sample.assembled_record(cluster).is_none() {
                    continue;
                }
                clusters
                    .entry(cluster.clone())
                    .or_default()
                    .extend(variants.iter().cloned());
            }
        }

        Self { clusters }
    }

    pub fn cluster_names(&self) -> impl Iterator<Item = &str> {
        self.clusters.keys().map(String::as_str)
    }

    /// Variants registered for `cluster`; empty if none or unknown.
    pub fn variants(&self, cluster: &str) -> impl Iterator<Item = &VariantId> {
        self.clusters.get(cluster).into_iter().flatten()
    }

    pub fn n_clusters(&self) -> usize {
        self.clusters.len()
    }

    pub fn n_variant_columns(&self) -> usize {
        self.clusters.values().map(BTreeSet::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Assembled, ClusterRecord, PctId};

    fn assembled(ref_seq: &str) -> ClusterRecord {
        ClusterRecord {
            assembled: Assembled::Yes,
            ref_seq: Some(ref_seq.to_string()),
            pct_id: Some(PctId::from(99.0)),
            any_var: Some(true),
        }
    }

    #[test]
    fn test_union_of_cluster_names() {
        let mut s1 = Sample::new("s1");
        s1.clusters.insert("geneA".into(), assembled("refA"));
        let mut s2 = Sample::new("s2");
        s2.clusters.insert("geneB".into(), ClusterRecord::not_assembled());

        let schema = UnifiedSchema::from_samples(&[s1, s2]);
        let names: Vec<&str> = schema.cluster_names().collect();
        assert_eq!(names, vec!["geneA", "geneB"]);
        assert_eq!(schema.n_variant_columns(), 0);
    }

    #[test]
    fn test_variants_only_from_assembled_clusters() {
        let mut s1 = Sample::new("s1");
        s1.clusters.insert("geneA".into(), assembled("refA"));
        s1.variants
            .insert("geneA".into(), [VariantId::new("refA", "A1T")].into_iter().collect());

        let mut s2 = Sample::new("s2");
        s2.clusters.insert("geneA".into(), ClusterRecord::not_assembled());
        s2.variants
            .insert("geneA".into(), [VariantId::new("refA", "C9G")].into_iter().collect());

        let mut s3 = Sample::new("s3");
        s3.clusters.insert(
            "geneA".into(),
            ClusterRecord {
                assembled: Assembled::YesVariantsOnly,
                ..assembled("refA")
            },
        );
        s3.variants
            .insert("geneA".into(), [VariantId::new("refA", "G5A")].into_iter().collect());

        let schema = UnifiedSchema::from_samples(&[s1, s2, s3]);
        let variants: Vec<String> = schema.variants("geneA").map(VariantId::key).collect();
        assert_eq!(variants, vec!["refA.A1T", "refA.G5A"]);
    }

    #[test]
    fn test_variants_stay_in_their_cluster() {
        let mut s1 = Sample::new("s1");
        s1.clusters.insert("geneA".into(), assembled("refA"));
        s1.clusters.insert("geneB".into(), assembled("refB"));
        s1.variants
            .insert("geneA".into(), [VariantId::new("refA", "A1T")].into_iter().collect());

        let schema = UnifiedSchema::from_samples(&[s1]);
        assert_eq!(schema.variants("geneA").count(), 1);
        assert_eq!(schema.variants("geneB").count(), 0);
        assert_eq!(schema.variants("unknown").count(), 0);
    }

    #[test]
    fn test_no_samples() {
        let schema = UnifiedSchema::from_samples(&[]);
        assert_eq!(schema.n_clusters(), 0);
    }
}
