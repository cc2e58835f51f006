//! Normalization of raw API items into flat [`Record`]s.

use std::borrow::Cow;

use crate::io::json::{self, JsonItem};
use crate::io::xml::XmlItem;
use crate::model::{FieldSpec, Record};

/// Anything that can answer "what is the text of field `name`".
pub trait FieldSource {
    /// Returns the field text, or `None` when the source has no such field.
    fn field_text(&self, name: &str) -> Option<Cow<'_, str>>;
}

impl FieldSource for XmlItem {
    fn field_text(&self, name: &str) -> Option<Cow<'_, str>> {
        self.child_text(name).map(Cow::Borrowed)
    }
}

impl FieldSource for JsonItem {
    fn field_text(&self, name: &str) -> Option<Cow<'_, str>> {
        self.get(name).map(|value| match value {
            serde_json::Value::String(text) => Cow::Borrowed(text.as_str()),
            other => Cow::Owned(json::value_text(other)),
        })
    }
}

/// One item as delivered by either endpoint family.
#[derive(Debug, Clone, PartialEq)]
pub enum RawItem {
    Xml(XmlItem),
    Json(JsonItem),
}

impl FieldSource for RawItem {
    fn field_text(&self, name: &str) -> Option<Cow<'_, str>> {
        match self {
            RawItem::Xml(item) => item.field_text(name),
            RawItem::Json(item) => item.field_text(name),
        }
    }
}

/// How a schema field missing from the source item is represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingField {
    /// Insert the field with an empty value.
    BlankFill,
    /// Leave the field out of the record.
    Omit,
}

impl RawItem {
    /// The missing-field policy the item's endpoint family uses.
    pub fn missing_field_policy(&self) -> MissingField {
        match self {
            RawItem::Xml(_) => MissingField::BlankFill,
            RawItem::Json(_) => MissingField::Omit,
        }
    }

    /// Normalizes the item with its family's policy.
    pub fn normalize(&self, fields: &[FieldSpec]) -> Record {
        normalize(self, fields, self.missing_field_policy())
    }
}

/// Builds a record holding `fields` read from `source`.
///
/// Values are copied as literal text. A field that is present but empty is
/// always kept as `""`.
pub fn normalize<S: FieldSource + ?Sized>(
    source: &S,
    fields: &[FieldSpec],
    missing: MissingField,
) -> Record {
    let mut record = Record::new();
    for spec in fields {
        match source.field_text(spec.key) {
            Some(text) => record.insert(spec.key, text.into_owned()),
            None if missing == MissingField::BlankFill => record.insert(spec.key, ""),
            None => {}
        }
    }
    record
}
