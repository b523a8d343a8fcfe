use crate::error::SummaryError;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Builds a tree file from a distance matrix file.
pub trait TreeBuilder {
    fn build_tree(&self, distance_matrix: &Path, tree_file: &Path) -> Result<()>;
}

/// Removes the listed files when dropped, ignoring ones that never appeared.
pub(crate) struct RemoveOnDrop(pub Vec<PathBuf>);

impl Drop for RemoveOnDrop {
    fn drop(&mut self) {
        for path in &self.0 {
            if path.exists() {
                let _ = std::fs::remove_file(path);
            }
        }
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s = path.as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}

/// Hierarchical clustering through R (`ape` + `hclust`), run as `R CMD BATCH`.
#[derive(Debug, Clone)]
pub struct RTreeBuilder {
    pub executable: String,
}

impl Default for RTreeBuilder {
    fn default() -> Self {
        Self {
            executable: "R".to_string(),
        }
    }
}

impl RTreeBuilder {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    fn write_script(script: &Path, distance_matrix: &Path, tree_file: &Path) -> Result<()> {
        let mut f = std::fs::File::create(script)
            .with_context(|| format!("Failed to create R script: {}", script.display()))?;
        writeln!(f, "library(ape)")?;
        writeln!(
            f,
            "a=read.table(\"{}\", header=TRUE, row.names=1, comment.char=\"\")",
            distance_matrix.display()
        )?;
        writeln!(f, "h=hclust(dist(a))")?;
        writeln!(f, "write.tree(as.phylo(h), file=\"{}\")", tree_file.display())?;
        Ok(())
    }
}

impl TreeBuilder for RTreeBuilder {
    fn build_tree(&self, distance_matrix: &Path, tree_file: &Path) -> Result<()> {
        let script = with_suffix(tree_file, ".tmp.R");
        let log = with_suffix(&script, "out");
        let _cleanup = RemoveOnDrop(vec![script.clone(), log.clone()]);

        Self::write_script(&script, distance_matrix, tree_file)?;
        if tree_file.exists() {
            std::fs::remove_file(tree_file)
                .with_context(|| format!("Failed to remove old tree: {}", tree_file.display()))?;
        }

        let output = Command::new(&self.executable)
            .args(["CMD", "BATCH", "--no-save"])
            .arg(&script)
            .arg(&log)
            .output()
            .map_err(|e| SummaryError::TreeBuild(format!("could not run '{}': {}", self.executable, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let detail = if stderr.is_empty() {
                std::fs::read_to_string(&log).unwrap_or_default()
            } else {
                stderr
            };
            return Err(SummaryError::TreeBuild(format!(
                "'{} CMD BATCH' exited with {}: {}",
                self.executable, output.status, detail
            ))
            .into());
        }

        if !tree_file.exists() {
            return Err(SummaryError::TreeBuild(format!(
                "no tree written to {}",
                tree_file.display()
            ))
            .into());
        }

        Ok(())
    }
}
