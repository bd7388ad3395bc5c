//! Dataset loading and writing for the CLI.
//!
//! A dataset is described by a small JSON metadata file (typed columns,
//! class index, separator, and the data file it points at); the data
//! itself is a headerless delimiter-separated file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing::{debug, info};

use banyan_data::{Attribute, Dataset, Row, Schema, Value};

/// One column description from the metadata file.
#[derive(Debug, Deserialize)]
struct ColumnMeta {
    #[serde(rename = "Name")]
    name: String,
    /// `"int"`, `"real"`, or `"nominal"`.
    #[serde(rename = "Kind")]
    kind: String,
    /// Value space, required for nominal columns.
    #[serde(rename = "Values", default)]
    values: Vec<String>,
}

/// The dataset metadata file.
#[derive(Debug, Deserialize)]
struct DatasetMeta {
    #[serde(rename = "DataFile")]
    data_file: PathBuf,
    #[serde(rename = "Separator", default = "default_separator")]
    separator: String,
    #[serde(rename = "ClassIndex")]
    class_index: usize,
    #[serde(rename = "Columns")]
    columns: Vec<ColumnMeta>,
}

fn default_separator() -> String {
    ",".to_string()
}

/// Load a dataset from its metadata file.
///
/// The data file path is resolved relative to the metadata file's
/// directory. Every cell is parsed and validated against its column.
pub fn load_dataset(meta_path: &Path) -> Result<Dataset> {
    let meta_text = std::fs::read_to_string(meta_path)
        .with_context(|| format!("reading metadata {}", meta_path.display()))?;
    let meta: DatasetMeta = serde_json::from_str(&meta_text)
        .with_context(|| format!("parsing metadata {}", meta_path.display()))?;

    let attributes = meta
        .columns
        .iter()
        .map(|col| match col.kind.as_str() {
            "int" => Ok(Attribute::int(col.name.clone())),
            "real" => Ok(Attribute::real(col.name.clone())),
            "nominal" => Ok(Attribute::nominal(col.name.clone(), col.values.clone())),
            other => bail!("column {:?} has unknown kind {:?}", col.name, other),
        })
        .collect::<Result<Vec<_>>>()?;
    let schema = Schema::new(attributes, meta.class_index)
        .context("building schema from metadata")?;

    let data_path = meta_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(&meta.data_file);
    debug!(path = %data_path.display(), "reading data file");

    let separator = separator_byte(&meta.separator)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(separator)
        .from_path(&data_path)
        .with_context(|| format!("opening data file {}", data_path.display()))?;

    let mut dataset = Dataset::new(schema);
    for (row_index, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("reading record {row_index}"))?;
        let mut cells = Vec::with_capacity(meta.columns.len());
        for (col_index, raw) in record.iter().enumerate() {
            let col = meta.columns.get(col_index).with_context(|| {
                format!("record {row_index} has more cells than columns")
            })?;
            let cell = parse_cell(raw, &col.kind).with_context(|| {
                format!("record {row_index}, column {:?}", col.name)
            })?;
            cells.push(cell);
        }
        dataset
            .push_row(Row::new(cells))
            .with_context(|| format!("record {row_index} violates the schema"))?;
    }

    info!(
        n_rows = dataset.len(),
        n_columns = dataset.column_count(),
        "dataset loaded"
    );
    Ok(dataset)
}

fn parse_cell(raw: &str, kind: &str) -> Result<Value> {
    match kind {
        "int" => Ok(Value::Int(raw.trim().parse().context("parsing integer cell")?)),
        "real" => Ok(Value::Real(raw.trim().parse().context("parsing real cell")?)),
        _ => Ok(Value::Str(raw.trim().to_string())),
    }
}

fn separator_byte(separator: &str) -> Result<u8> {
    match separator.as_bytes() {
        [b] => Ok(*b),
        _ => bail!("separator must be a single byte, got {separator:?}"),
    }
}

/// Write dataset rows as delimiter-separated values.
///
/// Returns the number of rows written. With `append` set the rows are
/// added to the end of an existing file (the merge flow).
pub fn write_rows(path: &Path, dataset: &Dataset, separator: &str, append: bool) -> Result<usize> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .append(append)
        .truncate(!append)
        .open(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let mut writer = csv::WriterBuilder::new()
        .delimiter(separator_byte(separator)?)
        .from_writer(file);

    for row in dataset.rows() {
        let record: Vec<String> = row.cells().map(ToString::to_string).collect();
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(dataset.len())
}
