//! XML property-dump source.
//!
//! Property dumps are flat lists of elements like:
//!
//! ```xml
//! <property>
//!   <name>item_id</name>
//!   <value><key>P-1001</key></value>
//! </property>
//! ```
//!
//! For every configured attribute name, the source collects the value text of every property
//! whose name matches, producing one column per attribute.

use std::path::Path;

use roxmltree::{Document, Node};

use crate::config::SourceConfig;
use crate::error::{TableError, TableResult};
use crate::types::{DataType, Schema, Table, Value};

use super::{read_text, FromMeta, SourceFormat, SourceMeta, TableSource};

const DEFAULT_ATTRIBUTES: [&str; 4] = ["item_id", "item_revision_id", "object_name", "rb6_regulation_long_title"];

/// Options read from a [`SourceConfig`].
///
/// | key | default |
/// |---|---|
/// | `property` | `property` |
/// | `name_element` | `name` |
/// | `value_path` | `value/key` |
/// | `attributes` | `item_id,item_revision_id,object_name,rb6_regulation_long_title` |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlOptions {
    pub property: String,
    pub name_element: String,
    pub value_path: Vec<String>,
    pub attributes: Vec<String>,
}

impl Default for XmlOptions {
    fn default() -> Self {
        Self {
            property: "property".to_string(),
            name_element: "name".to_string(),
            value_path: vec!["value".to_string(), "key".to_string()],
            attributes: DEFAULT_ATTRIBUTES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl XmlOptions {
    pub fn from_config(config: Option<&SourceConfig>) -> TableResult<Self> {
        let mut opts = Self::default();
        let Some(config) = config else {
            return Ok(opts);
        };

        if let Some(p) = config.get("property") {
            opts.property = non_empty("property", p)?;
        }
        if let Some(n) = config.get("name_element") {
            opts.name_element = non_empty("name_element", n)?;
        }
        if let Some(raw) = config.get("value_path") {
            let path: Vec<String> = raw
                .split('/')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            if path.is_empty() {
                return Err(TableError::invalid_config("value_path", "path is empty"));
            }
            opts.value_path = path;
        }
        if let Some(attrs) = config.list("attributes") {
            opts.attributes = attrs;
        }
        Ok(opts)
    }
}

fn non_empty(key: &str, raw: &str) -> TableResult<String> {
    let v = raw.trim();
    if v.is_empty() {
        return Err(TableError::invalid_config(key, "value is empty"));
    }
    Ok(v.to_string())
}

/// Table source over an XML property dump.
#[derive(Debug, Clone)]
pub struct XmlSource {
    meta: SourceMeta,
}

impl FromMeta for XmlSource {
    fn from_meta(meta: SourceMeta) -> Self {
        Self { meta }
    }
}

impl TableSource for XmlSource {
    fn meta(&self) -> &SourceMeta {
        &self.meta
    }

    fn format(&self) -> SourceFormat {
        SourceFormat::Xml
    }

    fn extract_table(&self) -> TableResult<Table> {
        let path = self.meta.path();
        let text = read_text(path)?;
        let opts = XmlOptions::from_config(self.meta.config())?;
        read_properties(&text, &opts, path)
    }
}

/// Extract attribute columns from XML text.
///
/// A matching property without the value element contributes [`Value::Null`]; a property
/// without a name element is skipped. All columns must end up the same length.
pub fn read_properties(input: &str, opts: &XmlOptions, origin: &Path) -> TableResult<Table> {
    let doc = Document::parse(input).map_err(|e| TableError::parse(origin, format!("invalid xml: {e}")))?;

    let properties: Vec<Node<'_, '_>> = doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == opts.property)
        .collect();

    let mut columns: Vec<Vec<Value>> = Vec::with_capacity(opts.attributes.len());
    for attr in &opts.attributes {
        let values: Vec<Value> = properties
            .iter()
            .filter(|p| {
                child_element(**p, &opts.name_element)
                    .and_then(|n| n.text())
                    .is_some_and(|t| t.trim() == attr)
            })
            .map(|p| value_at(*p, &opts.value_path))
            .collect();
        columns.push(values);
    }

    let height = columns.first().map(Vec::len).unwrap_or(0);
    for (attr, values) in opts.attributes.iter().zip(&columns) {
        if values.len() != height {
            return Err(TableError::parse(
                origin,
                format!(
                    "attribute '{attr}' has {} values, expected {height} (attribute '{}')",
                    values.len(),
                    opts.attributes[0]
                ),
            ));
        }
    }

    let mut rows: Vec<Vec<Value>> = vec![Vec::with_capacity(columns.len()); height];
    for values in columns {
        for (row, v) in rows.iter_mut().zip(values) {
            row.push(v);
        }
    }

    Ok(Table::new(Schema::uniform(opts.attributes.clone(), DataType::Utf8), rows))
}

fn child_element<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|c| c.is_element() && c.tag_name().name() == name)
}

fn value_at(property: Node<'_, '_>, path: &[String]) -> Value {
    let mut cur = property;
    for segment in path {
        match child_element(cur, segment) {
            Some(next) => cur = next,
            None => return Value::Null,
        }
    }
    match cur.text() {
        Some(t) => Value::Utf8(t.trim().to_string()),
        None => Value::Null,
    }
}
