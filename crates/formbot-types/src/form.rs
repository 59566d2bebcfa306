//! Persisted wizard state: forms, fields, and field values.
//!
//! Everything in this module is plain data that round-trips through the
//! state storage. Behaviour attached to a form (extraction functions, field
//! descriptors, the completion action) lives in `formbot-core` and is
//! re-derived after every restore from `Field::field_type` and
//! `Form::wizard_type`.

use std::fmt;
use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::event::TextEntity;

// ---------------------------------------------------------------------------
// Field types
// ---------------------------------------------------------------------------

/// The kind of answer a field accepts.
///
/// `Auto` is a sentinel: the concrete type is detected from the first
/// message that answers the field and then fixed for good.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    #[serde(rename = "<auto>")]
    Auto,
    Text,
    Sticker,
    Image,
    Voice,
    Audio,
    Video,
    VideoNote,
    Gif,
    Document,
    Location,
}

impl FieldType {
    /// Stable string form, also used as the translation key of the type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Auto => "<auto>",
            FieldType::Text => "text",
            FieldType::Sticker => "sticker",
            FieldType::Image => "image",
            FieldType::Voice => "voice",
            FieldType::Audio => "audio",
            FieldType::Video => "video",
            FieldType::VideoNote => "video_note",
            FieldType::Gif => "gif",
            FieldType::Document => "document",
            FieldType::Location => "location",
        }
    }

    /// Whether the type still has to be detected from an incoming message.
    pub fn is_auto(&self) -> bool {
        matches!(self, FieldType::Auto)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Field values
// ---------------------------------------------------------------------------

/// Text with its formatting spans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattedText {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<TextEntity>,
}

impl FormattedText {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            entities: Vec::new(),
        }
    }
}

/// Reference to a file already stored by the messaging platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRef {
    /// Identifier usable to re-send the file.
    pub id: String,
    /// Content-addressed identifier, stable across bots and re-uploads.
    pub unique_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub caption_entities: Vec<TextEntity>,
}

/// A point on the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// The value collected for a field.
///
/// A closed set of shapes: consumers pattern-match instead of inspecting an
/// opaque payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldValue {
    Text(FormattedText),
    File(FileRef),
    Location(GeoPoint),
}

impl FieldValue {
    /// Plain text value without formatting.
    pub fn text(text: impl Into<String>) -> Self {
        FieldValue::Text(FormattedText::plain(text))
    }

    /// The text of a text value; `None` for files and locations.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(t) => Some(&t.text),
            _ => None,
        }
    }

    pub fn as_file(&self) -> Option<&FileRef> {
        match self {
            FieldValue::File(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_location(&self) -> Option<GeoPoint> {
        match self {
            FieldValue::Location(p) => Some(*p),
            _ => None,
        }
    }

    /// The field type a value of this shape implies, if it is unambiguous.
    ///
    /// File references do not record which kind of media they point to, so
    /// they map to `Auto`.
    pub fn implied_type(&self) -> FieldType {
        match self {
            FieldValue::Text(_) => FieldType::Text,
            FieldValue::File(_) => FieldType::Auto,
            FieldValue::Location(_) => FieldType::Location,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::text(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::text(value)
    }
}

impl From<GeoPoint> for FieldValue {
    fn from(value: GeoPoint) -> Self {
        FieldValue::Location(value)
    }
}

impl From<FileRef> for FieldValue {
    fn from(value: FileRef) -> Self {
        FieldValue::File(value)
    }
}

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

/// One collectible unit of a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<FieldValue>,
    pub was_requested: bool,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl Field {
    /// A field waiting to be asked.
    pub fn empty(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            value: None,
            was_requested: false,
            field_type,
        }
    }

    /// A field whose value is known upfront.
    pub fn prefilled(name: impl Into<String>, value: FieldValue) -> Self {
        Self {
            name: name.into(),
            field_type: value.implied_type(),
            value: Some(value),
            was_requested: false,
        }
    }

    pub fn is_filled(&self) -> bool {
        self.value.is_some()
    }

    /// Shortcut for the text of a text-valued field.
    pub fn text(&self) -> Option<&str> {
        self.value.as_ref().and_then(FieldValue::as_text)
    }
}

/// Ordered list of form fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fields(Vec<Field>);

impl Fields {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    pub fn push(&mut self, field: Field) {
        self.0.push(field);
    }

    /// First field with the given name.
    pub fn find(&self, name: &str) -> Option<&Field> {
        self.0.iter().find(|f| f.name == name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.0.iter_mut().find(|f| f.name == name)
    }

    /// Position of the first field with the given name.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|f| f.name == name)
    }

    /// Number of fields sharing the given name.
    pub fn count_named(&self, name: &str) -> usize {
        self.0.iter().filter(|f| f.name == name).count()
    }

    pub fn into_inner(self) -> Vec<Field> {
        self.0
    }
}

impl Deref for Fields {
    type Target = [Field];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Fields {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Vec<Field>> for Fields {
    fn from(fields: Vec<Field>) -> Self {
        Self(fields)
    }
}

impl IntoIterator for Fields {
    type Item = Field;
    type IntoIter = std::vec::IntoIter<Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Fields {
    type Item = &'a Field;
    type IntoIter = std::slice::Iter<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ---------------------------------------------------------------------------
// Form
// ---------------------------------------------------------------------------

/// A wizard instance in progress for one user.
///
/// `index` points at the first unresolved field, or equals `fields.len()`
/// once every field is filled or skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Form {
    pub fields: Fields,
    pub index: usize,
    pub wizard_type: String,
}

impl Form {
    pub fn new(wizard_type: impl Into<String>, capacity: usize) -> Self {
        Self {
            fields: Fields::with_capacity(capacity),
            index: 0,
            wizard_type: wizard_type.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.index >= self.fields.len()
    }

    /// The field under the cursor, if the form is not complete.
    pub fn current_field(&self) -> Option<&Field> {
        self.fields.get(self.index)
    }
}
