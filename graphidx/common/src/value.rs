use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::data_type::DataType;

/// A single property value.
///
/// Floats are wrapped in [`OrderedFloat`] so that values can be hashed and used as map keys,
/// which the index write path relies on when it deduplicates field values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarValue {
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Float32(OrderedFloat<f32>),
    Float64(OrderedFloat<f64>),
    String(String),
    Date(DateTime<Utc>),
}

impl ScalarValue {
    #[inline]
    pub fn data_type(&self) -> DataType {
        match self {
            ScalarValue::Boolean(_) => DataType::Boolean,
            ScalarValue::Int32(_) => DataType::Int32,
            ScalarValue::Int64(_) => DataType::Int64,
            ScalarValue::Float32(_) => DataType::Float32,
            ScalarValue::Float64(_) => DataType::Float64,
            ScalarValue::String(_) => DataType::String,
            ScalarValue::Date(_) => DataType::Date,
        }
    }

    /// Returns `true` for integer and floating point values.
    #[inline]
    pub fn is_number(&self) -> bool {
        self.data_type().is_number()
    }

    /// Returns `true` for values that have a sortable numeric form (numbers and dates).
    #[inline]
    pub fn is_numeric(&self) -> bool {
        self.data_type().is_numeric()
    }

    /// Integral view of the value. Dates are viewed as milliseconds since the epoch.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ScalarValue::Int32(v) => Some(i64::from(*v)),
            ScalarValue::Int64(v) => Some(*v),
            ScalarValue::Date(v) => Some(v.timestamp_millis()),
            _ => None,
        }
    }

    /// Floating point view of any numeric value.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ScalarValue::Float32(v) => Some(f64::from(v.0)),
            ScalarValue::Float64(v) => Some(v.0),
            ScalarValue::Int32(v) => Some(f64::from(*v)),
            ScalarValue::Int64(v) => Some(*v as f64),
            ScalarValue::Date(v) => Some(v.timestamp_millis() as f64),
            _ => None,
        }
    }

    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ScalarValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Compares two values of compatible types.
    ///
    /// Integers (and dates) compare exactly, mixed integer/float pairs compare as `f64`.
    /// Returns `None` for incomparable pairs such as a string and a number.
    pub fn compare(&self, other: &ScalarValue) -> Option<Ordering> {
        match (self, other) {
            (ScalarValue::Boolean(a), ScalarValue::Boolean(b)) => Some(a.cmp(b)),
            (ScalarValue::String(a), ScalarValue::String(b)) => Some(a.cmp(b)),
            (ScalarValue::Date(a), ScalarValue::Date(b)) => Some(a.cmp(b)),
            (ScalarValue::Int32(_) | ScalarValue::Int64(_), _)
                if matches!(other, ScalarValue::Int32(_) | ScalarValue::Int64(_)) =>
            {
                Some(self.as_i64()?.cmp(&other.as_i64()?))
            }
            _ if self.is_number() && other.is_number() => {
                Some(self.as_f64()?.total_cmp(&other.as_f64()?))
            }
            _ => None,
        }
    }

    /// Equality that treats numerically equal values of different widths as equal.
    pub fn loose_eq(&self, other: &ScalarValue) -> bool {
        self == other || self.compare(other) == Some(Ordering::Equal)
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Boolean(v) => write!(f, "{v}"),
            ScalarValue::Int32(v) => write!(f, "{v}"),
            ScalarValue::Int64(v) => write!(f, "{v}"),
            ScalarValue::Float32(v) => write!(f, "{v}"),
            ScalarValue::Float64(v) => write!(f, "{v}"),
            ScalarValue::String(v) => f.write_str(v),
            ScalarValue::Date(v) => f.write_str(&v.to_rfc3339()),
        }
    }
}

macro_rules! for_each_variant {
    ($m:ident) => {
        $m!(boolean, bool, bool, Boolean);
        $m!(int32, i32, i32, Int32);
        $m!(int64, i64, i64, Int64);
        $m!(float32, f32, OrderedFloat<f32>, Float32);
        $m!(float64, f64, OrderedFloat<f64>, Float64);
        $m!(string, String, String, String);
        $m!(date, DateTime<Utc>, DateTime<Utc>, Date);
    };
}

macro_rules! impl_from_for_variant {
    ($_:ident, $ty:ty, $_stored:ty, $variant:ident) => {
        impl From<$ty> for ScalarValue {
            #[inline]
            fn from(value: $ty) -> Self {
                ScalarValue::$variant(value.into())
            }
        }
    };
}

for_each_variant!(impl_from_for_variant);

impl From<&str> for ScalarValue {
    #[inline]
    fn from(value: &str) -> Self {
        ScalarValue::String(value.to_string())
    }
}

macro_rules! impl_as_for_variant {
    ($name:ident, $_:ty, $stored:ty, $variant:ident) => {
        impl ScalarValue {
            pastey::paste! {
                #[doc = concat!(" Attempts to downcast `self` to borrowed `", stringify!($stored), "`, returning `None` if not possible.")]
                #[inline]
                pub fn [<try_as_$name>](&self) -> Option<&$stored> {
                    match self {
                        ScalarValue::$variant(value) => Some(value),
                        _ => None
                    }
                }
            }
        }
    };
}

for_each_variant!(impl_as_for_variant);
