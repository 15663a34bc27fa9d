// output.rs
// Row tables and their space / CSV / TSV / JSON renderings

use serde::ser::{Serialize, Serializer};
use serde_json::{json, Map, Value as JsonValue};
use std::fmt;
use std::io::Write;

use crate::error::{AnalysisError, Result};

/// One cell of an output row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            // shortest round-trip form, always with a fractional part ("2.0")
            Value::Float(v) => write!(f, "{v:?}"),
            Value::Text(v) => f.write_str(v),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        match self {
            Value::Int(v) => serializer.serialize_i64(*v),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Text(v) => serializer.serialize_str(v),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Int(v as i64)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    Values(Vec<Value>),
    /// Blank separator line; only rendered in the space format.
    Break,
}

/// The result of one experiment: named columns, rows and summary notes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub notes: Vec<String>,
}

impl Table {
    pub fn new(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn with_columns(columns: Vec<String>) -> Self {
        Self {
            columns,
            ..Self::default()
        }
    }

    pub fn push(&mut self, values: Vec<Value>) {
        self.rows.push(Row::Values(values));
    }

    pub fn push_break(&mut self) {
        self.rows.push(Row::Break);
    }

    pub fn note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    /// Rows with values, separators skipped.
    pub fn records(&self) -> impl Iterator<Item = &[Value]> {
        self.rows.iter().filter_map(|row| match row {
            Row::Values(values) => Some(values.as_slice()),
            Row::Break => None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Space-separated rows, the plotting input format
    #[default]
    Space,
    Csv,
    Tsv,
    Json,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OutputOptions {
    pub format: OutputFormat,
    /// Prefix space-separated output with a `#` column line.
    pub header: bool,
    /// Append the summary notes.
    pub summary: bool,
}

pub fn write_table(table: &Table, options: &OutputOptions, out: &mut dyn Write) -> Result<()> {
    match options.format {
        OutputFormat::Space => write_space(table, options, out),
        OutputFormat::Csv => write_delimited(table, options, ',', out),
        OutputFormat::Tsv => write_delimited(table, options, '\t', out),
        OutputFormat::Json => write_json(table, options, out),
    }
    .map_err(AnalysisError::Output)?;
    Ok(())
}

fn join(values: &[Value], separator: char) -> String {
    let mut line = String::new();
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            line.push(separator);
        }
        let text = value.to_string();
        if separator == ',' && (text.contains(',') || text.contains('"')) {
            line.push('"');
            line.push_str(&text.replace('"', "\"\""));
            line.push('"');
        } else {
            line.push_str(&text);
        }
    }
    line
}

fn write_notes(table: &Table, out: &mut dyn Write) -> std::io::Result<()> {
    for note in &table.notes {
        writeln!(out, "# {note}")?;
    }
    Ok(())
}

fn write_space(table: &Table, options: &OutputOptions, out: &mut dyn Write) -> std::io::Result<()> {
    if options.header {
        writeln!(out, "# {}", table.columns.join(" "))?;
    }
    for row in &table.rows {
        match row {
            Row::Values(values) => writeln!(out, "{}", join(values, ' '))?,
            Row::Break => writeln!(out)?,
        }
    }
    if options.summary {
        write_notes(table, out)?;
    }
    Ok(())
}

fn write_delimited(
    table: &Table,
    options: &OutputOptions,
    separator: char,
    out: &mut dyn Write,
) -> std::io::Result<()> {
    let header: Vec<Value> = table.columns.iter().map(|c| Value::from(c.as_str())).collect();
    writeln!(out, "{}", join(&header, separator))?;
    for values in table.records() {
        writeln!(out, "{}", join(values, separator))?;
    }
    if options.summary {
        write_notes(table, out)?;
    }
    Ok(())
}

fn write_json(table: &Table, options: &OutputOptions, out: &mut dyn Write) -> std::io::Result<()> {
    let records: Vec<JsonValue> = table
        .records()
        .map(|values| {
            let object: Map<String, JsonValue> = table
                .columns
                .iter()
                .zip(values)
                .map(|(column, value)| (column.clone(), json!(value)))
                .collect();
            JsonValue::Object(object)
        })
        .collect();
    let document = if options.summary {
        json!({ "rows": records, "notes": table.notes })
    } else {
        JsonValue::Array(records)
    };
    serde_json::to_writer_pretty(&mut *out, &document)?;
    writeln!(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let mut table = Table::new(&["dpe", "noise", "label"]);
        table.push(vec![Value::Float(0.05), Value::Int(3), "a,b".into()]);
        table.push_break();
        table.push(vec![Value::Float(0.1), Value::Int(4), "c".into()]);
        table.note("peak at 3");
        table
    }

    fn render(table: &Table, format: OutputFormat, header: bool, summary: bool) -> String {
        let mut out = Vec::new();
        let options = OutputOptions {
            format,
            header,
            summary,
        };
        write_table(table, &options, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn floats_keep_a_fractional_part() {
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
        assert_eq!(Value::Float(0.25).to_string(), "0.25");
        assert_eq!(Value::Int(2).to_string(), "2");
    }

    #[test]
    fn space_output_is_bare_by_default() {
        let text = render(&sample(), OutputFormat::Space, false, false);
        assert_eq!(text, "0.05 3 a,b\n\n0.1 4 c\n");
        let text = render(&sample(), OutputFormat::Space, true, true);
        assert_eq!(text, "# dpe noise label\n0.05 3 a,b\n\n0.1 4 c\n# peak at 3\n");
    }

    #[test]
    fn csv_quotes_and_skips_breaks() {
        let text = render(&sample(), OutputFormat::Csv, false, false);
        assert_eq!(text, "dpe,noise,label\n0.05,3,\"a,b\"\n0.1,4,c\n");
        let text = render(&sample(), OutputFormat::Tsv, false, false);
        assert_eq!(text, "dpe\tnoise\tlabel\n0.05\t3\ta,b\n0.1\t4\tc\n");
    }

    #[test]
    fn json_is_an_array_of_objects() {
        let text = render(&sample(), OutputFormat::Json, false, false);
        let parsed: JsonValue = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed[0]["noise"], json!(3));
        assert_eq!(parsed[1]["dpe"], json!(0.1));
        assert_eq!(parsed.as_array().unwrap().len(), 2);

        let text = render(&sample(), OutputFormat::Json, false, true);
        let parsed: JsonValue = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["notes"][0], json!("peak at 3"));
        assert_eq!(parsed["rows"][0]["label"], json!("a,b"));
    }
}
