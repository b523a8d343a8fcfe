use crate::rows::SampleRow;
use crate::types::Cell;
use anyhow::{Context, Result};
use csv::Writer;
use std::path::Path;

/// Column-type suffixes understood by phandango, in the order of the four
/// fixed cluster columns; variant columns use `:o1`.
const PHANDANGO_FIXED: [&str; 4] = [":o1", ":o2", ":c1", ":o1"];
const PHANDANGO_VARIANT: &str = ":o1";

/// Columns per worksheet in the xlsx format
#[cfg(feature = "spreadsheet")]
const XLSX_MAX_COLUMNS: usize = 16_384;

/// Rendered table: header plus one line per sample, cells kept typed so the
/// spreadsheet writer can store identities as numbers.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub header: Vec<String>,
    pub lines: Vec<(String, Vec<Cell>)>,
}

fn header_for(row: &SampleRow, phandango: bool) -> Vec<String> {
    let mut header = vec!["name".to_string()];

    for (cluster, cells) in &row.clusters {
        let fixed = [
            cluster.clone(),
            format!("{}.ref", cluster),
            format!("{}.idty", cluster),
            format!("{}.any_var", cluster),
        ];
        for (name, suffix) in fixed.into_iter().zip(PHANDANGO_FIXED) {
            header.push(if phandango { name + suffix } else { name });
        }

        for variant in cells.variants.keys() {
            let name = format!("{}.{}", cluster, variant.key());
            header.push(if phandango { name + PHANDANGO_VARIANT } else { name });
        }
    }

    header
}

/// Lay rows out as a table. `rows` is in input order, which is kept.
///
/// The header comes from the first row; all rows were built against the same
/// schema so they share its columns.
pub fn build_table(rows: &[SampleRow], phandango: bool) -> Table {
    let header = rows
        .first()
        .map(|r| header_for(r, phandango))
        .unwrap_or_else(|| vec!["name".to_string()]);

    let lines = rows
        .iter()
        .map(|row| {
            let mut cells = Vec::with_capacity(header.len() - 1);
            for cluster in row.clusters.values() {
                cells.extend(cluster.fixed_cells().into_iter().cloned());
                cells.extend(cluster.variants.values().cloned());
            }
            (row.name.clone(), cells)
        })
        .collect();

    Table { header, lines }
}

pub fn write_csv(table: &Table, path: &Path) -> Result<()> {
    let mut wtr = Writer::from_path(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;

    wtr.write_record(&table.header)?;
    for (name, cells) in &table.lines {
        let mut record = Vec::with_capacity(cells.len() + 1);
        record.push(name.clone());
        record.extend(cells.iter().map(Cell::to_string));
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(feature = "spreadsheet")]
pub fn write_spreadsheet(table: &Table, path: &Path) -> Result<()> {
    use rust_xlsxwriter::Workbook;

    if table.header.len() > XLSX_MAX_COLUMNS {
        anyhow::bail!(
            "Cannot write {}: {} columns exceed the spreadsheet limit of {}; use a .csv output",
            path.display(),
            table.header.len(),
            XLSX_MAX_COLUMNS
        );
    }

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    for (col, name) in table.header.iter().enumerate() {
        sheet.write_string(0, u16::try_from(col)?, name.as_str())?;
    }

    for (i, (name, cells)) in table.lines.iter().enumerate() {
        let row = u32::try_from(i + 1)?;
        sheet.write_string(row, 0, name.as_str())?;
        for (j, cell) in cells.iter().enumerate() {
            let col = u16::try_from(j + 1)?;
            match cell {
                Cell::Identity(pct) => sheet.write_number(row, col, pct.value())?,
                other => sheet.write_string(row, col, other.to_string())?,
            };
        }
    }

    workbook
        .save(path)
        .with_context(|| format!("Failed to write spreadsheet: {}", path.display()))?;
    Ok(())
}

#[cfg(not(feature = "spreadsheet"))]
pub fn write_spreadsheet(_table: &Table, path: &Path) -> Result<()> {
    anyhow::bail!(
        "Cannot write {}: spreadsheet feature not enabled. Rebuild with default features or use a .csv output",
        path.display()
    )
}

/// True when `path` asks for a spreadsheet rather than plain CSV.
pub fn is_spreadsheet(path: &Path) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case("xls") || e.eq_ignore_ascii_case("xlsx"))
        .unwrap_or(false)
}

/// Write the plain (un-annotated) table, choosing the container by extension.
pub fn write_table(rows: &[SampleRow], path: &Path) -> Result<()> {
    let table = build_table(rows, false);
    if is_spreadsheet(path) {
        write_spreadsheet(&table, path)
    } else {
        write_csv(&table, path)
    }
}

/// Write the phandango-annotated CSV.
pub fn write_phandango_csv(rows: &[SampleRow], path: &Path) -> Result<()> {
    write_csv(&build_table(rows, true), path)
}
