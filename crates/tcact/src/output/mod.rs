//! Text and JSON report output.
//!
//! Codecs describe each field once through [`ReportWriter`]; the writer keeps
//! the text rendering and the JSON object side by side so both formats stay
//! in step.

use std::io::Write;

use serde_json::{Map, Value};

/// Output format options.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputOptions {
    /// Show timestamps and counters.
    pub stats: bool,
    /// Pretty print (for JSON).
    pub pretty: bool,
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Plain text output.
    #[default]
    Text,
    /// JSON output.
    Json,
}

/// Trait for types that can be printed.
pub trait Printable {
    /// Print as plain text.
    fn print_text<W: Write>(&self, w: &mut W, opts: &OutputOptions) -> std::io::Result<()>;

    /// Convert to JSON value.
    fn to_json(&self) -> Value;

    /// Print in the specified format.
    fn print<W: Write>(
        &self,
        w: &mut W,
        format: OutputFormat,
        opts: &OutputOptions,
    ) -> std::io::Result<()> {
        match format {
            OutputFormat::Text => self.print_text(w, opts),
            OutputFormat::Json => write_json(w, &self.to_json(), opts),
        }
    }
}

/// Trait for collections of printable items.
pub trait PrintableList {
    /// The item type.
    type Item: Printable;

    /// Get the items.
    fn items(&self) -> &[Self::Item];

    /// Print all items as text.
    fn print_text<W: Write>(&self, w: &mut W, opts: &OutputOptions) -> std::io::Result<()> {
        for item in self.items() {
            item.print_text(w, opts)?;
        }
        Ok(())
    }

    /// Convert to JSON array.
    fn to_json(&self) -> Value {
        Value::Array(self.items().iter().map(|item| item.to_json()).collect())
    }

    /// Print in the specified format.
    fn print<W: Write>(
        &self,
        w: &mut W,
        format: OutputFormat,
        opts: &OutputOptions,
    ) -> std::io::Result<()> {
        match format {
            OutputFormat::Text => self.print_text(w, opts),
            OutputFormat::Json => write_json(w, &self.to_json(), opts),
        }
    }
}

fn write_json<W: Write>(w: &mut W, json: &Value, opts: &OutputOptions) -> std::io::Result<()> {
    if opts.pretty {
        serde_json::to_writer_pretty(&mut *w, json)?;
    } else {
        serde_json::to_writer(&mut *w, json)?;
    }
    writeln!(w)
}

/// Accumulates one action's report in both output formats.
#[derive(Debug, Clone, Default)]
pub struct ReportWriter {
    text: String,
    json: Map<String, Value>,
}

impl ReportWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a field: `text` goes to the text report, `value` under `key`.
    pub fn field(&mut self, key: &str, text: impl AsRef<str>, value: impl Into<Value>) {
        self.text.push_str(text.as_ref());
        self.json.insert(key.to_string(), value.into());
    }

    /// Write a text-only fragment.
    pub fn text(&mut self, text: impl AsRef<str>) {
        self.text.push_str(text.as_ref());
    }

    /// Write a JSON-only member.
    pub fn json(&mut self, key: &str, value: impl Into<Value>) {
        self.json.insert(key.to_string(), value.into());
    }

    /// Text rendered so far.
    pub fn as_text(&self) -> &str {
        &self.text
    }

    /// JSON member previously written under `key`.
    pub fn get_json(&self, key: &str) -> Option<&Value> {
        self.json.get(key)
    }

    /// Turn the accumulated output into a report.
    pub fn finish(self, failed: bool) -> ActionReport {
        ActionReport {
            text: self.text,
            json: self.json,
            failed,
        }
    }
}

/// Rendered report of one action instance.
#[derive(Debug, Clone)]
pub struct ActionReport {
    text: String,
    json: Map<String, Value>,
    failed: bool,
}

impl ActionReport {
    /// Text rendering.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// JSON object rendering.
    pub fn json(&self) -> &Map<String, Value> {
        &self.json
    }

    /// Whether decoding this instance failed.
    ///
    /// A failed report still carries whatever was rendered, including the
    /// placeholder that explains the failure.
    pub fn failed(&self) -> bool {
        self.failed
    }
}

impl Printable for ActionReport {
    fn print_text<W: Write>(&self, w: &mut W, _opts: &OutputOptions) -> std::io::Result<()> {
        w.write_all(self.text.as_bytes())
    }

    fn to_json(&self) -> Value {
        Value::Object(self.json.clone())
    }
}
