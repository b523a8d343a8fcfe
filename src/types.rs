use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// How much of a cluster's reference was reconstructed in a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Assembled {
    No,
    YesVariantsOnly,
    Yes,
}

impl Assembled {
    /// Both "yes" flavours count as assembled.
    pub fn is_yes(&self) -> bool {
        !matches!(self, Assembled::No)
    }

    pub fn parse(s: &str) -> Option<Assembled> {
        match s {
            "yes" => Some(Assembled::Yes),
            "yes_variants_only" | "yes-variants-only" => Some(Assembled::YesVariantsOnly),
            "no" => Some(Assembled::No),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Assembled::Yes => "yes",
            Assembled::YesVariantsOnly => "yes_variants_only",
            Assembled::No => "no",
        }
    }
}

/// Per-sample summary of one cluster.
///
/// A cluster that was not assembled carries no reference, identity or
/// variant flag; use [`ClusterRecord::not_assembled`] to build one.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterRecord {
    pub assembled: Assembled,
    pub ref_seq: Option<String>,
    pub pct_id: Option<PctId>,
    pub any_var: Option<bool>,
}

impl ClusterRecord {
    pub fn not_assembled() -> Self {
        Self {
            assembled: Assembled::No,
            ref_seq: None,
            pct_id: None,
            any_var: None,
        }
    }
}

/// Percent identity as written in the report; the number drives
/// comparisons, the text is what gets written back out.
#[derive(Debug, Clone, PartialEq)]
pub struct PctId {
    value: f64,
    text: String,
}

impl PctId {
    /// `None` for anything that is not a finite number.
    pub fn parse(s: &str) -> Option<PctId> {
        let value: f64 = s.parse().ok()?;
        value.is_finite().then(|| PctId {
            value,
            text: s.to_string(),
        })
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

impl From<f64> for PctId {
    fn from(value: f64) -> Self {
        Self {
            value,
            text: value.to_string(),
        }
    }
}

impl fmt::Display for PctId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// A detected variant: (reference name, variant label).
///
/// Ordered by column key, then by reference name, so two variants whose keys
/// render the same (`a.b` + `c`, `a` + `b.c`) still sort as distinct entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariantId {
    pub ref_name: String,
    pub label: String,
}

impl VariantId {
    pub fn new(ref_name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            ref_name: ref_name.into(),
            label: label.into(),
        }
    }

    /// Column key used in output headers: `<ref_name>.<label>`
    pub fn key(&self) -> String {
        format!("{}.{}", self.ref_name, self.label)
    }

    fn key_bytes(&self) -> impl Iterator<Item = u8> + '_ {
        self.ref_name
            .bytes()
            .chain(std::iter::once(b'.'))
            .chain(self.label.bytes())
    }
}

impl Ord for VariantId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key_bytes()
            .cmp(other.key_bytes())
            .then_with(|| self.ref_name.cmp(&other.ref_name))
    }
}

impl PartialOrd for VariantId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// One loaded input report, named by its source filename
#[derive(Debug, Clone, Default)]
pub struct Sample {
    pub name: String,
    pub clusters: BTreeMap<String, ClusterRecord>,
    pub variants: BTreeMap<String, BTreeSet<VariantId>>,
}

impl Sample {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// The sample's record for `cluster` if it was assembled (fully or variants only).
    pub fn assembled_record(&self, cluster: &str) -> Option<&ClusterRecord> {
        self.clusters.get(cluster).filter(|r| r.assembled.is_yes())
    }
}

/// A single table cell
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Yes,
    No,
    NotApplicable,
    Assembled(Assembled),
    Identity(PctId),
    Reference(String),
}

impl Cell {
    pub fn yes_no(flag: bool) -> Cell {
        if flag {
            Cell::Yes
        } else {
            Cell::No
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Yes => f.write_str("yes"),
            Cell::No => f.write_str("no"),
            Cell::NotApplicable => f.write_str("NA"),
            Cell::Assembled(a) => f.write_str(a.as_str()),
            Cell::Identity(pct) => write!(f, "{}", pct),
            Cell::Reference(name) => f.write_str(name),
        }
    }
}
