use graphidx_common::data_type::DataType;
use graphidx_common::types::PropertyId;
use graphidx_common::value::ScalarValue;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyKey {
    id: PropertyId,
    name: String,
    data_type: DataType,
}

impl PropertyKey {
    #[inline]
    pub fn new(id: PropertyId, name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            id,
            name: name.into(),
            data_type,
        }
    }

    #[inline]
    pub fn id(&self) -> PropertyId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Returns `true` if `value` conforms to the declared data type of this key.
    #[inline]
    pub fn check_value(&self, value: &ScalarValue) -> bool {
        self.data_type.check_value(value)
    }

    /// Converts `value` into the declared data type, see [`DataType::convert`].
    #[inline]
    pub fn convert(&self, value: &ScalarValue) -> Option<ScalarValue> {
        self.data_type.convert(value)
    }
}
