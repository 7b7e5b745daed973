use chrono::NaiveDateTime;
use gridform_model::{serial_to_datetime, DateSystem};

use crate::error::ConvertError;

/// A value crossing the field-binding boundary, in either direction.
///
/// `Empty` models an absent bound value: the `opt_*` accessors unwrap it to
/// `None` before coercing, so optional record fields never fail conversion
/// merely for being blank.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Empty,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    DateTime(NaiveDateTime),
}

impl FieldValue {
    /// Raw display of the carried value, used for conversion error context.
    fn raw(&self) -> String {
        match self {
            FieldValue::Empty => String::new(),
            FieldValue::Bool(v) => v.to_string(),
            FieldValue::Int(v) => v.to_string(),
            FieldValue::Float(v) => v.to_string(),
            FieldValue::Text(v) => v.clone(),
            FieldValue::DateTime(v) => v.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, FieldValue::Empty)
    }

    pub fn to_bool(&self) -> Result<bool, ConvertError> {
        match self {
            FieldValue::Bool(v) => Ok(*v),
            FieldValue::Int(v) => Ok(*v != 0),
            FieldValue::Float(v) => Ok(*v != 0.0),
            FieldValue::Text(t) => match t.trim() {
                "0" | "false" | "FALSE" => Ok(false),
                "1" | "true" | "TRUE" => Ok(true),
                _ => Err(ConvertError::new(self.raw(), "bool")),
            },
            _ => Err(ConvertError::new(self.raw(), "bool")),
        }
    }

    pub fn to_i64(&self) -> Result<i64, ConvertError> {
        match self {
            FieldValue::Int(v) => Ok(*v),
            FieldValue::Float(v) if v.fract() == 0.0 => Ok(*v as i64),
            FieldValue::Bool(v) => Ok(i64::from(*v)),
            FieldValue::Text(t) => t
                .trim()
                .parse()
                .map_err(|_| ConvertError::new(self.raw(), "integer")),
            _ => Err(ConvertError::new(self.raw(), "integer")),
        }
    }

    pub fn to_f64(&self) -> Result<f64, ConvertError> {
        match self {
            FieldValue::Float(v) => Ok(*v),
            FieldValue::Int(v) => Ok(*v as f64),
            FieldValue::Bool(v) => Ok(f64::from(u8::from(*v))),
            FieldValue::Text(t) => t
                .trim()
                .parse()
                .map_err(|_| ConvertError::new(self.raw(), "number")),
            _ => Err(ConvertError::new(self.raw(), "number")),
        }
    }

    pub fn to_text(&self) -> Result<String, ConvertError> {
        match self {
            FieldValue::Empty => Err(ConvertError::new("", "text")),
            other => Ok(other.raw()),
        }
    }

    /// Coerce to a date-time.
    ///
    /// Numeric values are interpreted as serial day counts in the 1900
    /// system, the interpretation hosts apply when binding an untyped
    /// numeric cell to a date field.
    pub fn to_datetime(&self) -> Result<NaiveDateTime, ConvertError> {
        match self {
            FieldValue::DateTime(v) => Ok(*v),
            FieldValue::Int(v) => serial_to_datetime(*v as f64, DateSystem::Excel1900)
                .ok_or_else(|| ConvertError::new(self.raw(), "date")),
            FieldValue::Float(v) => serial_to_datetime(*v, DateSystem::Excel1900)
                .ok_or_else(|| ConvertError::new(self.raw(), "date")),
            FieldValue::Text(t) => t
                .trim()
                .parse()
                .map_err(|_| ConvertError::new(self.raw(), "date")),
            _ => Err(ConvertError::new(self.raw(), "date")),
        }
    }

    pub fn opt_bool(&self) -> Result<Option<bool>, ConvertError> {
        self.unwrap_empty(Self::to_bool)
    }

    pub fn opt_i64(&self) -> Result<Option<i64>, ConvertError> {
        self.unwrap_empty(Self::to_i64)
    }

    pub fn opt_f64(&self) -> Result<Option<f64>, ConvertError> {
        self.unwrap_empty(Self::to_f64)
    }

    pub fn opt_text(&self) -> Result<Option<String>, ConvertError> {
        self.unwrap_empty(Self::to_text)
    }

    pub fn opt_datetime(&self) -> Result<Option<NaiveDateTime>, ConvertError> {
        self.unwrap_empty(Self::to_datetime)
    }

    fn unwrap_empty<T>(
        &self,
        convert: impl Fn(&Self) -> Result<T, ConvertError>,
    ) -> Result<Option<T>, ConvertError> {
        if self.is_empty() {
            Ok(None)
        } else {
            convert(self).map(Some)
        }
    }
}

impl From<Option<FieldValue>> for FieldValue {
    fn from(value: Option<FieldValue>) -> Self {
        value.unwrap_or(FieldValue::Empty)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<NaiveDateTime> for FieldValue {
    fn from(value: NaiveDateTime) -> Self {
        FieldValue::DateTime(value)
    }
}
