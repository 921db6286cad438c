//! Historical sale-record CSV loading.
//!
//! Cells are typed per column: a column is numeric when every present cell
//! parses as a finite number, categorical otherwise.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use thiserror::Error;

pub const TARGET_COLUMN: &str = "SalePrice";

/// Cell spellings read as missing.
const NA_TOKENS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "None", "#N/A", "<NA>",
];

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("dataset file not found: {0}")]
    NotFound(String),
    #[error("failed to read dataset: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse dataset csv: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Categorical(Vec<Option<String>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn is_numeric(&self) -> bool { matches!(self.data, ColumnData::Numeric(_)) }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaleTable {
    columns: Vec<Column>,
    rows: usize,
}

impl SaleTable {
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        if !path.exists() {
            return Err(DatasetError::NotFound(path.display().to_string()));
        }
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DatasetError> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        let mut raw: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
        let mut rows = 0usize;
        for record in rdr.records() {
            let record = record?;
            for (col, cells) in raw.iter_mut().enumerate() {
                cells.push(record.get(col).filter(|c| !is_missing(c)).map(str::to_string));
            }
            rows += 1;
        }
        let columns = headers
            .into_iter()
            .zip(raw)
            .map(|(name, cells)| Column { name, data: type_column(cells) })
            .collect();
        Ok(Self { columns, rows })
    }

    pub fn rows(&self) -> usize { self.rows }
    pub fn columns(&self) -> &[Column] { &self.columns }
    pub fn column(&self, name: &str) -> Option<&Column> { self.columns.iter().find(|c| c.name == name) }
}

fn is_missing(cell: &str) -> bool { NA_TOKENS.contains(&cell) }

fn parse_number(cell: &str) -> Option<f64> { cell.parse::<f64>().ok().filter(|v| v.is_finite()) }

fn type_column(cells: Vec<Option<String>>) -> ColumnData {
    let numeric = cells.iter().flatten().all(|c| parse_number(c).is_some());
    if numeric {
        ColumnData::Numeric(cells.iter().map(|c| c.as_deref().and_then(parse_number)).collect())
    } else {
        ColumnData::Categorical(cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "LotArea,Street,Alley,SalePrice\n8450,Pave,NA,208500\n9600,Pave,Grvl,181500\n,Grvl,,223500\n";

    #[test]
    fn types_columns_and_marks_missing() {
        let table = SaleTable::from_reader(CSV.as_bytes()).unwrap();
        assert_eq!(table.rows(), 3);
        let lot = table.column("LotArea").unwrap();
        assert_eq!(lot.data, ColumnData::Numeric(vec![Some(8450.0), Some(9600.0), None]));
        let alley = table.column("Alley").unwrap();
        assert_eq!(alley.data, ColumnData::Categorical(vec![None, Some("Grvl".into()), None]));
        assert!(table.column(TARGET_COLUMN).unwrap().is_numeric());
    }

    #[test]
    fn short_rows_pad_with_missing() {
        let table = SaleTable::from_reader("a,b\n1\n2,3\n".as_bytes()).unwrap();
        assert_eq!(table.column("b").unwrap().data, ColumnData::Numeric(vec![None, Some(3.0)]));
    }

    #[test]
    fn absent_file_is_reported() {
        let err = SaleTable::load(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, DatasetError::NotFound(_)));
    }
}
