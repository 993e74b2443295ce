//! Encodings of property values as stored in the field values of index entries.
//!
//! Numbers are encoded as fixed-width strings over a sortable alphabet, so that comparing two
//! encoded strings gives the same result as comparing the numbers. Composite values are
//! joined with [`SEPARATOR`], which sorts below every sortable character.

use graphidx_catalog::index_label::IndexType;
use graphidx_common::data_type::DataType;
use graphidx_common::types::LabelId;
use graphidx_common::value::ScalarValue;
use thiserror::Error;

/// Stored in place of an empty field value.
pub const EMPTY_SYM: &str = "\u{0}";
/// Stored in place of an absent field of a unique index.
pub const NULL_SYM: &str = "\u{1}";
/// Chars up to this one are reserved and never accepted in user values.
const MAX_SYM: char = '\u{3}';

pub const SEPARATOR: char = '!';
const ESCAPE: char = '`';

/// 64 chars in ascending order.
const ALPHABET: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz~";
const NUMBER_WIDTH: u32 = 11;

pub type CodecResult<T> = Result<T, CodecError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("value {0} has no sortable numeric form")]
    NotNumeric(String),
    #[error("index type {0} has no range encoding")]
    NotRangeIndex(IndexType),
    #[error("illegal char U+{code:04X} in index value {value:?}")]
    IllegalChar { code: u32, value: String },
    #[error("invalid character {0:?} for string index")]
    InvalidLastChar(char),
    #[error("can't increase an empty string")]
    EmptyString,
}

#[inline]
pub fn is_sortable_char(c: char) -> bool {
    c.is_ascii() && ALPHABET.contains(&(c as u8))
}

/// Encodes an integer. The sign bit is flipped so that negative numbers sort first.
pub fn encode_long(value: i64) -> String {
    let bits = (value as u64) ^ (1 << 63);
    (0..NUMBER_WIDTH)
        .rev()
        .map(|i| char::from(ALPHABET[((bits >> (i * 6)) & 0x3f) as usize]))
        .collect()
}

/// Encodes a float through its sortable bit pattern.
pub fn encode_double(value: f64) -> String {
    let bits = value.to_bits() as i64;
    encode_long(bits ^ ((bits >> 63) & i64::MAX))
}

/// Encodes a number or a date (as epoch milliseconds).
pub fn encode_number(value: &ScalarValue) -> CodecResult<String> {
    match value {
        ScalarValue::Int32(_) | ScalarValue::Int64(_) | ScalarValue::Date(_) => value
            .as_i64()
            .map(encode_long)
            .ok_or_else(|| CodecError::NotNumeric(value.to_string())),
        ScalarValue::Float32(_) | ScalarValue::Float64(_) => value
            .as_f64()
            .map(encode_double)
            .ok_or_else(|| CodecError::NotNumeric(value.to_string())),
        _ => Err(CodecError::NotNumeric(value.to_string())),
    }
}

/// Encodes `value` the way a range index of `index_type` stores it.
pub fn encode_range_value(index_type: IndexType, value: &ScalarValue) -> CodecResult<String> {
    let not_numeric = || CodecError::NotNumeric(value.to_string());
    match index_type {
        IndexType::RangeInt | IndexType::RangeLong => {
            value.as_i64().map(encode_long).ok_or_else(not_numeric)
        }
        IndexType::RangeFloat | IndexType::RangeDouble => {
            value.as_f64().map(encode_double).ok_or_else(not_numeric)
        }
        _ => Err(CodecError::NotRangeIndex(index_type)),
    }
}

/// Numbers and dates are encoded, every other value is used as text.
pub fn encode_if_numeric(value: &ScalarValue) -> CodecResult<String> {
    if value.is_numeric() {
        encode_number(value)
    } else {
        Ok(value.to_string())
    }
}

/// Encoded lower bound of all values of a numeric type.
pub fn min_value_of(data_type: DataType) -> CodecResult<String> {
    match data_type {
        DataType::Int32 => Ok(encode_long(i64::from(i32::MIN))),
        DataType::Int64 | DataType::Date => Ok(encode_long(i64::MIN)),
        DataType::Float32 => Ok(encode_double(f64::from(f32::MIN))),
        DataType::Float64 => Ok(encode_double(f64::MIN)),
        _ => Err(CodecError::NotNumeric(data_type.to_string())),
    }
}

/// Encoded upper bound of all values of a numeric type.
pub fn max_value_of(data_type: DataType) -> CodecResult<String> {
    match data_type {
        DataType::Int32 => Ok(encode_long(i64::from(i32::MAX))),
        DataType::Int64 | DataType::Date => Ok(encode_long(i64::MAX)),
        DataType::Float32 => Ok(encode_double(f64::from(f32::MAX))),
        DataType::Float64 => Ok(encode_double(f64::MAX)),
        _ => Err(CodecError::NotNumeric(data_type.to_string())),
    }
}

/// Joins values with [`SEPARATOR`], escaping separators and escapes inside the values.
pub fn concat_values<S: AsRef<str>>(values: &[S]) -> String {
    let mut joined = String::new();
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            joined.push(SEPARATOR);
        }
        for c in value.as_ref().chars() {
            if c == SEPARATOR || c == ESCAPE {
                joined.push(ESCAPE);
            }
            joined.push(c);
        }
    }
    joined
}

/// Joins user values into the field values of an index entry.
///
/// Values containing reserved chars are rejected. An empty result is replaced by
/// [`EMPTY_SYM`].
pub fn concat<S: AsRef<str>>(values: &[S]) -> CodecResult<String> {
    for value in values {
        check_user_value(value.as_ref())?;
    }
    Ok(non_empty(concat_values(values)))
}

/// Like [`concat`], with [`NULL_SYM`] standing for each absent value.
pub fn concat_nullable<S: AsRef<str>>(values: &[Option<S>]) -> CodecResult<String> {
    let mut texts = Vec::with_capacity(values.len());
    for value in values {
        match value {
            Some(value) => {
                check_user_value(value.as_ref())?;
                texts.push(value.as_ref());
            }
            None => texts.push(NULL_SYM),
        }
    }
    Ok(non_empty(concat_values(&texts)))
}

fn check_user_value(value: &str) -> CodecResult<()> {
    match value.chars().find(|c| *c <= MAX_SYM) {
        Some(c) => Err(CodecError::IllegalChar {
            code: u32::from(c),
            value: value.to_string(),
        }),
        None => Ok(()),
    }
}

fn non_empty(joined: String) -> String {
    if joined.is_empty() {
        EMPTY_SYM.to_string()
    } else {
        joined
    }
}

/// Splits field values produced by [`concat`].
pub fn split_values(joined: &str) -> Vec<String> {
    if joined == EMPTY_SYM {
        return Vec::new();
    }
    let mut values = Vec::new();
    let mut current = String::new();
    let mut escaped = false;
    for c in joined.chars() {
        if escaped {
            current.push(c);
            escaped = false;
        } else if c == ESCAPE {
            escaped = true;
        } else if c == SEPARATOR {
            values.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    values.push(current);
    values
}

/// Returns the string of equal length following `value` by incrementing its last char.
///
/// The last char must be the separator or a sortable char.
pub fn increment_last_char(value: &str) -> CodecResult<String> {
    let last = value.chars().last().ok_or(CodecError::EmptyString)?;
    if last != SEPARATOR && !is_sortable_char(last) {
        return Err(CodecError::InvalidLastChar(last));
    }
    let mut increased = value[..value.len() - last.len_utf8()].to_string();
    increased.push(char::from(last as u8 + 1));
    Ok(increased)
}

/// Field values of the label index entry of an element with `label`.
#[inline]
pub fn label_value(label: LabelId) -> String {
    label.to_string()
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use super::*;

    #[test]
    fn test_concat_and_split() {
        let joined = concat(&["a", "b"]).unwrap();
        assert_eq!(joined, "a!b");
        assert_eq!(split_values(&joined), vec!["a", "b"]);

        let empty: [&str; 0] = [];
        assert_eq!(concat(&empty).unwrap(), EMPTY_SYM);
        assert!(split_values(EMPTY_SYM).is_empty());
        assert_eq!(concat(&[""]).unwrap(), EMPTY_SYM);

        let tricky = ["x!y", "`", ""];
        assert_eq!(split_values(&concat(&tricky).unwrap()), tricky);
    }

    #[test]
    fn test_concat_rejects_reserved_chars() {
        assert!(matches!(
            concat(&["ok", EMPTY_SYM]),
            Err(CodecError::IllegalChar { code: 0, .. })
        ));
        assert!(concat(&[NULL_SYM]).is_err());
        assert_eq!(concat_values(&["a", NULL_SYM]), "a!\u{1}");
    }

    #[test]
    fn test_concat_nullable() {
        assert_eq!(concat_nullable(&[None, Some("a")]).unwrap(), "\u{1}!a");
        assert_eq!(concat_nullable(&[Some("")]).unwrap(), EMPTY_SYM);
        assert!(matches!(
            concat_nullable(&[None, Some(EMPTY_SYM)]),
            Err(CodecError::IllegalChar { code: 0, .. })
        ));
        assert!(concat_nullable(&[Some("\u{2}")]).is_err());
    }

    #[test]
    fn test_increment_last_char() {
        assert_eq!(increment_last_char("abc").unwrap(), "abd");
        let once = increment_last_char("ab!").unwrap();
        assert_eq!(once, "ab\"");
        assert_eq!(
            increment_last_char(&once),
            Err(CodecError::InvalidLastChar('"'))
        );
        assert_eq!(increment_last_char(""), Err(CodecError::EmptyString));
        assert_eq!(increment_last_char("a~").unwrap(), "a\u{7f}");
    }

    #[test]
    fn test_increment_is_next_number() {
        assert_eq!(
            increment_last_char(&encode_long(18)).unwrap(),
            encode_long(19)
        );
        // Across a carry the incremented string still sorts between both numbers.
        let inc = increment_last_char(&encode_long(63)).unwrap();
        assert!(encode_long(63) < inc && inc < encode_long(64));
    }

    #[test]
    fn test_long_encoding_is_sortable() {
        let mut rng = rand::rng();
        let mut numbers: Vec<i64> = (0..1000).map(|_| rng.random()).collect();
        numbers.extend([i64::MIN, -1, 0, 1, i64::MAX]);
        let mut by_encoding = numbers.clone();
        by_encoding.sort_by_key(|n| encode_long(*n));
        numbers.sort();
        assert_eq!(numbers, by_encoding);
        assert!(encode_long(i64::MIN).chars().all(is_sortable_char));
        assert_eq!(encode_long(7).len(), NUMBER_WIDTH as usize);
    }

    #[test]
    fn test_double_encoding_is_sortable() {
        let mut rng = rand::rng();
        let mut numbers: Vec<f64> = (0..1000)
            .map(|_| rng.random_range(-1.0e12..1.0e12))
            .collect();
        numbers.extend([f64::MIN, -0.5, 0.0, 0.25, f64::MAX]);
        let mut by_encoding = numbers.clone();
        by_encoding.sort_by_key(|n| encode_double(*n));
        numbers.sort_by(f64::total_cmp);
        assert_eq!(numbers, by_encoding);
    }

    #[test]
    fn test_encode_by_type() {
        assert_eq!(
            encode_number(&ScalarValue::from(5i32)).unwrap(),
            encode_number(&ScalarValue::from(5i64)).unwrap()
        );
        assert!(encode_number(&ScalarValue::from("5")).is_err());
        assert_eq!(
            encode_range_value(IndexType::RangeDouble, &ScalarValue::from(2i32)).unwrap(),
            encode_double(2.0)
        );
        assert!(encode_range_value(IndexType::Secondary, &ScalarValue::from(2i32)).is_err());
        assert!(min_value_of(DataType::Int32).unwrap() < encode_long(-5));
        assert!(max_value_of(DataType::Float64).unwrap() > encode_double(1.0e300));
        assert_eq!(encode_if_numeric(&ScalarValue::from("tom")).unwrap(), "tom");
    }
}
