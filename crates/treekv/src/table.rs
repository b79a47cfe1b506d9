//! Row-per-record tables.
//!
//! [`Table::project`] flattens each record's key into metadata columns and
//! appends caller-defined columns computed from the record.

use std::fmt;

use serde_json::{Map, Value};

use crate::record::Record;

/// One table cell.
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Value(Value),
    /// The row's key has no field for this column.
    Absent,
}

impl Cell {
    pub fn is_absent(&self) -> bool {
        matches!(self, Cell::Absent)
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Cell::Value(v) => Some(v),
            Cell::Absent => None,
        }
    }

    /// The cell as a string slice, if it holds a JSON string.
    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(Value::as_str)
    }
}

impl From<Value> for Cell {
    fn from(value: Value) -> Self {
        Cell::Value(value)
    }
}

impl From<Option<Value>> for Cell {
    fn from(value: Option<Value>) -> Self {
        value.map_or(Cell::Absent, Cell::Value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Value(Value::String(value.to_string()))
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Value(Value::String(value))
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Value(Value::String(s)) => f.write_str(s),
            Cell::Value(v) => write!(f, "{v}"),
            Cell::Absent => f.write_str("-"),
        }
    }
}

type Extractor<P> = Box<dyn Fn(&Record<P>) -> Cell>;

/// Named columns computed from records.
pub struct Projection<P> {
    columns: Vec<(String, Extractor<P>)>,
}

impl<P> Projection<P> {
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
        }
    }

    /// Add a column. A column of the same name is replaced in place.
    pub fn column<F, C>(mut self, name: impl Into<String>, extract: F) -> Self
    where
        F: Fn(&Record<P>) -> C + 'static,
        C: Into<Cell>,
    {
        let name = name.into();
        let extract: Extractor<P> = Box::new(move |record| extract(record).into());
        match self.columns.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = extract,
            None => self.columns.push((name, extract)),
        }
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }
}

impl<P> Default for Projection<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> fmt::Debug for Projection<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Rows of cells under named columns.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// One row per record.
    ///
    /// Key fields come first, in the order they are first seen across the
    /// records; the projection's columns follow in declared order. A
    /// projection column hides a key field of the same name.
    pub fn project<'a, P: 'a>(
        records: impl IntoIterator<Item = &'a Record<P>>,
        projection: &Projection<P>,
    ) -> Self {
        let mut columns: Vec<String> = Vec::new();
        let mut pending = Vec::new();

        for record in records {
            let metadata = record.key().metadata();
            for name in metadata.names() {
                let taken = projection.names().any(|n| n == name)
                    || columns.iter().any(|c| c == name);
                if !taken {
                    columns.push(name.to_string());
                }
            }
            let extracted: Vec<Cell> = projection
                .columns
                .iter()
                .map(|(_, extract)| extract(record))
                .collect();
            pending.push((metadata, extracted));
        }

        let key_columns = columns.len();
        columns.extend(projection.names().map(str::to_string));

        let rows = pending
            .into_iter()
            .map(|(metadata, extracted)| {
                let mut row: Vec<Cell> = columns[..key_columns]
                    .iter()
                    .map(|name| metadata.get(name).map_or(Cell::Absent, Cell::from))
                    .collect();
                row.extend(extracted);
                row
            })
            .collect();

        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&Cell> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index)
    }

    /// Every cell of one column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&Cell>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[index]).collect())
    }

    /// The rows as an array of JSON objects. Absent cells are left out.
    pub fn to_json(&self) -> Value {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let object: Map<String, Value> = self
                    .columns
                    .iter()
                    .zip(row)
                    .filter_map(|(name, cell)| Some((name.clone(), cell.as_value()?.clone())))
                    .collect();
                Value::Object(object)
            })
            .collect();
        Value::Array(rows)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(Cell::to_string).collect())
            .collect();
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, name)| {
                rendered
                    .iter()
                    .map(|row| row[i].chars().count())
                    .chain(std::iter::once(name.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        write_row(f, &self.columns, &widths)?;
        for row in &rendered {
            write_row(f, row, &widths)?;
        }
        Ok(())
    }
}

fn write_row(f: &mut fmt::Formatter<'_>, cells: &[String], widths: &[usize]) -> fmt::Result {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect();
    writeln!(f, "{}", padded.join("  ").trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use treekv_key::{KeyPath, Level};
    use treekv_store::{BlobStore, InMemoryBlobStore};

    fn payment(
        store: &Arc<dyn BlobStore>,
        borrower: &str,
        payment: &str,
        text: &str,
    ) -> Record<String> {
        let key = KeyPath::with_prefix(
            "loan",
            Level::from_pairs([("borrower", borrower), ("lender", "L1")]).unwrap(),
        )
        .unwrap()
        .then(Level::from_pairs([("loan", "LN1")]).unwrap())
        .then(Level::from_pairs([("payment", payment)]).unwrap());
        Record::with_payload(key, text.to_string(), store.clone())
    }

    fn payments() -> Vec<Record<String>> {
        let store: Arc<dyn BlobStore> = Arc::new(InMemoryBlobStore::new());
        vec![
            payment(&store, "B1", "P1", "paid"),
            payment(&store, "B2", "P1", "late"),
        ]
    }

    fn content() -> Projection<String> {
        Projection::new()
            .column("content", |r: &Record<String>| r.payload().clone())
            .column("type", |_: &Record<String>| "payment")
    }

    #[test]
    fn key_columns_then_projection() {
        let records = payments();
        let table = Table::project(&records, &content());

        assert_eq!(
            table.columns(),
            ["borrower", "lender", "loan", "payment", "content", "type"]
        );
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0, "borrower").and_then(Cell::as_str), Some("B1"));
        assert_eq!(table.get(1, "borrower").and_then(Cell::as_str), Some("B2"));
        assert_eq!(table.get(1, "content").and_then(Cell::as_str), Some("late"));
        let types: Vec<Cell> = table.column("type").unwrap().into_iter().cloned().collect();
        assert_eq!(types, vec![Cell::from("payment"), Cell::from("payment")]);
        assert!(table.get(2, "borrower").is_none());
        assert!(table.column("amount").is_none());
    }

    #[test]
    fn missing_fields_are_absent() {
        let store: Arc<dyn BlobStore> = Arc::new(InMemoryBlobStore::new());
        let identity = Record::with_payload(
            KeyPath::with_prefix("identity", Level::from_pairs([("ssn", "123")]).unwrap())
                .unwrap(),
            "id-1".to_string(),
            store.clone(),
        );
        let records = vec![payment(&store, "B1", "P1", "paid"), identity];
        let table = Table::project(&records, &Projection::new());

        assert_eq!(table.columns(), ["borrower", "lender", "loan", "payment", "ssn"]);
        assert!(table.get(0, "ssn").unwrap().is_absent());
        assert!(table.get(1, "borrower").unwrap().is_absent());
        assert_eq!(table.get(1, "ssn").and_then(Cell::as_str), Some("123"));
    }

    #[test]
    fn projection_hides_key_field() {
        let records = payments();
        let projection = Projection::new()
            .column("payment", |r: &Record<String>| r.payload().to_uppercase())
            .column("payment", |r: &Record<String>| r.payload().clone());
        let table = Table::project(&records, &projection);

        assert_eq!(table.columns(), ["borrower", "lender", "loan", "payment"]);
        assert_eq!(table.get(0, "payment").and_then(Cell::as_str), Some("paid"));
    }

    #[test]
    fn json_rows_skip_absent() {
        let records = payments();
        let projection = Projection::new().column("amount", |r: &Record<String>| {
            (r.payload() == "paid").then(|| serde_json::json!(250))
        });
        let json = Table::project(&records, &projection).to_json();

        assert_eq!(json[0]["amount"], 250);
        assert_eq!(json[0]["borrower"], "B1");
        assert!(json[1].get("amount").is_none());
    }

    #[test]
    fn renders_aligned_text() {
        let records = payments();
        let projection =
            Projection::new().column("content", |r: &Record<String>| r.payload().clone());
        let text = Table::project(&records[..1], &projection).to_string();
        assert_eq!(
            text,
            "borrower  lender  loan  payment  content\n\
             B1        L1      LN1   P1       paid\n"
        );
    }

    #[test]
    fn empty_input() {
        let records: Vec<Record<String>> = Vec::new();
        let table = Table::project(&records, &content());
        assert!(table.is_empty());
        assert_eq!(table.columns(), ["content", "type"]);
        assert_eq!(table.to_json(), Value::Array(vec![]));
    }
}
