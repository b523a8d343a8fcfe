use crate::schema::UnifiedSchema;
use crate::types::{Assembled, Cell, Sample, VariantId};
use std::collections::BTreeMap;

/// The cells of one (sample, cluster) pair
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterRow {
    pub assembled: Cell,
    pub ref_seq: Cell,
    pub pct_id: Cell,
    pub any_var: Cell,
    pub variants: BTreeMap<VariantId, Cell>,
}

impl ClusterRow {
    fn not_assembled() -> Self {
        Self {
            assembled: Cell::Assembled(Assembled::No),
            ref_seq: Cell::NotApplicable,
            pct_id: Cell::NotApplicable,
            any_var: Cell::NotApplicable,
            variants: BTreeMap::new(),
        }
    }

    /// Fixed cells in output order: assembled, ref_seq, pct_id, any_var
    pub fn fixed_cells(&self) -> [&Cell; 4] {
        [&self.assembled, &self.ref_seq, &self.pct_id, &self.any_var]
    }

    pub fn is_assembled(&self) -> bool {
        matches!(self.assembled, Cell::Assembled(a) if a.is_yes())
    }
}

/// One sample projected onto the unified schema
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRow {
    pub name: String,
    pub clusters: BTreeMap<String, ClusterRow>,
}

fn optional<T>(value: Option<T>, cell: impl FnOnce(T) -> Cell) -> Cell {
    value.map_or(Cell::NotApplicable, cell)
}

/// Project `sample` onto `schema`, one [`ClusterRow`] per schema cluster.
///
/// Clusters the sample did not assemble get all-NA cells; with
/// `include_variants`, every variant column of the cluster is filled with
/// yes/no for assembled clusters and NA otherwise.
pub fn build_row(schema: &UnifiedSchema, sample: &Sample, include_variants: bool) -> SampleRow {
    let mut clusters = BTreeMap::new();

    for cluster in schema.cluster_names() {
        let mut row = match sample.assembled_record(cluster) {
            Some(record) => ClusterRow {
                assembled: Cell::Assembled(record.assembled),
                ref_seq: optional(record.ref_seq.clone(), Cell::Reference),
                pct_id: optional(record.pct_id.clone(), Cell::Identity),
                any_var: optional(record.any_var, Cell::yes_no),
                variants: BTreeMap::new(),
            },
            None => ClusterRow::not_assembled(),
        };

        if include_variants {
            let detected = sample.variants.get(cluster);
            for variant in schema.variants(cluster) {
                let cell = if !row.is_assembled() {
                    Cell::NotApplicable
                } else {
                    Cell::yes_no(detected.map_or(false, |set| set.contains(variant)))
                };
                row.variants.insert(variant.clone(), cell);
            }
        }

        clusters.insert(cluster.to_string(), row);
    }

    SampleRow {
        name: sample.name.clone(),
        clusters,
    }
}

/// Build rows for every sample, preserving input order.
pub fn build_rows(schema: &UnifiedSchema, samples: &[Sample], include_variants: bool) -> Vec<SampleRow> {
    samples
        .iter()
        .map(|s| build_row(schema, s, include_variants))
        .collect()
}
