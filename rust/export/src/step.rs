// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ISO 10303-21 writer
//!
//! An append-only list of entity instances plus a header. Instances are
//! numbered in creation order starting at #1.

use std::fmt::{self, Write as _};
use std::io::{self, Write};

use geomark_core::{encode_step_string, SchemaVersion};

/// Instance name (`#n`) of an entity in a [`StepModel`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Attribute value of an entity instance
#[derive(Debug, Clone, PartialEq)]
pub enum StepValue {
    /// `$`
    Null,
    /// `*`
    Derived,
    Ref(EntityId),
    Integer(i64),
    Real(f64),
    String(String),
    /// Enumeration literal without dots, e.g. `ELEMENT`
    Enum(&'static str),
    Bool(bool),
    List(Vec<StepValue>),
    /// Typed value such as `IFCREAL(1.5)`
    Typed(&'static str, Box<StepValue>),
}

impl StepValue {
    pub fn string(value: impl Into<String>) -> Self {
        StepValue::String(value.into())
    }

    /// String, or `$` when absent
    pub fn opt_string(value: Option<&str>) -> Self {
        value.map_or(StepValue::Null, StepValue::string)
    }

    /// Real number; non-finite values are written as `$`
    pub fn real(value: f64) -> Self {
        if value.is_finite() {
            StepValue::Real(value)
        } else {
            StepValue::Null
        }
    }

    pub fn refs(ids: impl IntoIterator<Item = EntityId>) -> Self {
        StepValue::List(ids.into_iter().map(StepValue::Ref).collect())
    }

    pub fn reals(values: impl IntoIterator<Item = f64>) -> Self {
        StepValue::List(values.into_iter().map(StepValue::real).collect())
    }

    pub fn typed(type_name: &'static str, value: StepValue) -> Self {
        StepValue::Typed(type_name, Box::new(value))
    }

    fn write_to(&self, out: &mut String) {
        match self {
            StepValue::Null => out.push('$'),
            StepValue::Derived => out.push('*'),
            StepValue::Ref(id) => {
                let _ = write!(out, "{}", id);
            }
            StepValue::Integer(v) => {
                let _ = write!(out, "{}", v);
            }
            StepValue::Real(v) => out.push_str(&format_real(*v)),
            StepValue::String(s) => {
                out.push('\'');
                out.push_str(&encode_step_string(s));
                out.push('\'');
            }
            StepValue::Enum(e) => {
                out.push('.');
                out.push_str(e);
                out.push('.');
            }
            StepValue::Bool(b) => out.push_str(if *b { ".T." } else { ".F." }),
            StepValue::List(items) => {
                out.push('(');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    item.write_to(out);
                }
                out.push(')');
            }
            StepValue::Typed(name, inner) => {
                out.push_str(name);
                out.push('(');
                inner.write_to(out);
                out.push(')');
            }
        }
    }
}

impl From<EntityId> for StepValue {
    fn from(id: EntityId) -> Self {
        StepValue::Ref(id)
    }
}

impl From<Option<EntityId>> for StepValue {
    fn from(id: Option<EntityId>) -> Self {
        id.map_or(StepValue::Null, StepValue::Ref)
    }
}

/// STEP REAL: always carries a decimal point, never an exponent-only form
pub fn format_real(value: f64) -> String {
    let mut s = format!("{}", value);
    if !s.contains('.') {
        s.push('.');
    }
    s
}

/// FILE_DESCRIPTION / FILE_NAME contents
#[derive(Debug, Clone, PartialEq)]
pub struct StepHeaderInfo {
    pub description: String,
    pub file_name: String,
    /// ISO 8601 timestamp
    pub time_stamp: String,
    pub author: String,
    pub organization: String,
    pub preprocessor: String,
    pub originating_system: String,
}

/// A STEP file being assembled in memory
#[derive(Debug, Clone)]
pub struct StepModel {
    schema: SchemaVersion,
    entities: Vec<(&'static str, Vec<StepValue>)>,
}

impl StepModel {
    pub fn new(schema: SchemaVersion) -> Self {
        Self {
            schema,
            entities: Vec::new(),
        }
    }

    pub fn schema(&self) -> SchemaVersion {
        self.schema
    }

    /// Append an entity instance; `type_name` is the upper-case entity name
    pub fn create(&mut self, type_name: &'static str, attributes: Vec<StepValue>) -> EntityId {
        self.entities.push((type_name, attributes));
        EntityId(self.entities.len() as u32)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Number of instances of one entity type
    pub fn count_of(&self, type_name: &str) -> usize {
        self.entities
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case(type_name))
            .count()
    }

    /// Serialize header, data section and trailer
    pub fn write<W>(&self, out: &mut W, header: &StepHeaderInfo) -> io::Result<()>
    where
        W: Write + ?Sized,
    {
        let text = |s: &str| format!("'{}'", encode_step_string(s));

        writeln!(out, "ISO-10303-21;")?;
        writeln!(out, "HEADER;")?;
        writeln!(out, "FILE_DESCRIPTION(({}),'2;1');", text(&header.description))?;
        writeln!(
            out,
            "FILE_NAME({},{},({}),({}),{},{},'');",
            text(&header.file_name),
            text(&header.time_stamp),
            text(&header.author),
            text(&header.organization),
            text(&header.preprocessor),
            text(&header.originating_system),
        )?;
        writeln!(out, "FILE_SCHEMA(('{}'));", self.schema.identifier())?;
        writeln!(out, "ENDSEC;")?;
        writeln!(out, "DATA;")?;

        let mut line = String::with_capacity(256);
        for (index, (type_name, attributes)) in self.entities.iter().enumerate() {
            line.clear();
            let _ = write!(line, "#{}={}(", index + 1, type_name);
            for (i, attribute) in attributes.iter().enumerate() {
                if i > 0 {
                    line.push(',');
                }
                attribute.write_to(&mut line);
            }
            line.push_str(");");
            writeln!(out, "{}", line)?;
        }

        writeln!(out, "ENDSEC;")?;
        writeln!(out, "END-ISO-10303-21;")?;
        Ok(())
    }

    pub fn to_step_string(&self, header: &StepHeaderInfo) -> String {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail
        let _ = self.write(&mut buf, header);
        String::from_utf8_lossy(&buf).into_owned()
    }
}
