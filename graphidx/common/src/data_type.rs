use serde::{Deserialize, Serialize};

use crate::value::ScalarValue;

/// Declared data type of a property key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum DataType {
    Boolean,
    Int32,
    Int64,
    Float32,
    Float64,
    String,
    Date,
}

impl DataType {
    #[inline]
    pub fn is_number(&self) -> bool {
        matches!(
            self,
            DataType::Int32 | DataType::Int64 | DataType::Float32 | DataType::Float64
        )
    }

    /// Numbers and dates: the types a range or shard index can encode.
    #[inline]
    pub fn is_numeric(&self) -> bool {
        self.is_number() || matches!(self, DataType::Date)
    }

    /// Converts `value` into this type, allowing lossless numeric widening.
    ///
    /// Returns `None` if the value does not conform to this type.
    pub fn convert(&self, value: &ScalarValue) -> Option<ScalarValue> {
        if value.data_type() == *self {
            return Some(value.clone());
        }
        match (self, value) {
            (DataType::Int64, ScalarValue::Int32(v)) => Some(ScalarValue::Int64(i64::from(*v))),
            (DataType::Float64, ScalarValue::Float32(v)) => Some(ScalarValue::from(f64::from(v.0))),
            (DataType::Float64, ScalarValue::Int32(v)) => Some(ScalarValue::from(f64::from(*v))),
            (DataType::Float32 | DataType::Float64, ScalarValue::Int64(v)) => {
                // Accept integers that the float type represents exactly.
                let converted = *v as f64;
                if converted as i64 != *v {
                    return None;
                }
                if matches!(self, DataType::Float32) {
                    let narrowed = converted as f32;
                    (f64::from(narrowed) == converted).then(|| ScalarValue::from(narrowed))
                } else {
                    Some(ScalarValue::from(converted))
                }
            }
            (DataType::Float32, ScalarValue::Int32(v)) => {
                let narrowed = *v as f32;
                (narrowed as i32 == *v).then(|| ScalarValue::from(narrowed))
            }
            _ => None,
        }
    }

    #[inline]
    pub fn check_value(&self, value: &ScalarValue) -> bool {
        self.convert(value).is_some()
    }
}
