//! The write path: deriving index entries from elements and buffering them in a transaction.

use graphidx_catalog::index_label::{IndexLabel, IndexType};
use graphidx_common::id::Id;
use graphidx_common::types::{ElementType, IndexLabelId};
use graphidx_common::value::ScalarValue;
use graphidx_storage::model::element::Element;
use graphidx_storage::query::{ConditionQuery, RelationType};
use graphidx_storage::store::{Action, BackendEntry};
use tracing::{debug, warn};

use crate::codec::{self, NULL_SYM};
use crate::engine::IndexEngine;
use crate::error::{IndexError, IndexResult};
use crate::record::IndexRecord;
use crate::schema;
use crate::transaction::IndexTransaction;

impl IndexEngine {
    /// Field values `element` is indexed under by `index_label`.
    ///
    /// Absent fields must be nullable. Every index type except UNIQUE only indexes the fields
    /// before the first absent one, and nothing at all if the first field is absent.
    pub fn index_values(
        &self,
        index_label: &IndexLabel,
        element: &Element,
    ) -> IndexResult<Vec<String>> {
        let schema = self.schema().as_ref();
        let label = schema::schema_label(schema, element.element_type(), element.label())?;
        let fields = index_label.fields();
        let mut values = Vec::with_capacity(fields.len());
        let mut first_null = None;
        for (i, field) in fields.iter().enumerate() {
            match element.property(*field) {
                Some(value) => {
                    if value.as_text() == Some(NULL_SYM) {
                        return Err(IndexError::MalformedIndexValue(format!(
                            "illegal value {NULL_SYM:?} of index property {field}"
                        )));
                    }
                    values.push(Some(schema::convert_value(schema, *field, value)?));
                }
                None => {
                    if !label.is_nullable(*field) {
                        return Err(IndexError::MalformedIndexValue(format!(
                            "non-null property {field} is absent from {} {}",
                            element.element_type(),
                            element.id()
                        )));
                    }
                    first_null.get_or_insert(i);
                    values.push(None);
                }
            }
        }

        let index_type = index_label.index_type();
        let present = first_null.unwrap_or(fields.len());
        if present == 0 && !index_type.is_unique() {
            return Ok(Vec::new());
        }
        let prefix: Vec<&ScalarValue> = values[..present].iter().flatten().collect();
        match index_type {
            IndexType::RangeInt
            | IndexType::RangeLong
            | IndexType::RangeFloat
            | IndexType::RangeDouble => {
                let value = single_value(index_label, &prefix)?;
                Ok(vec![codec::encode_range_value(index_type, value)?])
            }
            IndexType::Search => {
                let value = single_value(index_label, &prefix)?;
                let text = value.as_text().ok_or_else(|| {
                    IndexError::MalformedIndexValue(format!(
                        "search index '{}' expects a text value, got {value}",
                        index_label.name()
                    ))
                })?;
                Ok(self.segment(text).into_iter().collect())
            }
            IndexType::Secondary => {
                let texts: Vec<String> = prefix.iter().map(ToString::to_string).collect();
                (1..=texts.len())
                    .map(|n| codec::concat(&texts[..n]).map_err(IndexError::from))
                    .collect()
            }
            IndexType::Shard => {
                let encoded = prefix
                    .iter()
                    .map(|value| codec::encode_if_numeric(value))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(vec![codec::concat(&encoded)?])
            }
            IndexType::Unique => {
                let texts: Vec<Option<String>> = values
                    .iter()
                    .map(|value| value.as_ref().map(ToString::to_string))
                    .collect();
                Ok(vec![codec::concat_nullable(&texts)?])
            }
        }
    }
}

fn single_value<'a>(
    index_label: &IndexLabel,
    prefix: &[&'a ScalarValue],
) -> IndexResult<&'a ScalarValue> {
    match prefix {
        [value] => Ok(value),
        _ => Err(IndexError::InvariantViolation(format!(
            "{} index '{}' indexes exactly one field",
            index_label.index_type(),
            index_label.name()
        ))),
    }
}

impl IndexTransaction {
    /// Adds or removes the label index entry of `element`.
    ///
    /// Nothing is written if the store answers label queries natively or the label of the
    /// element disables its label index.
    pub fn update_label_index(&mut self, element: &Element, removed: bool) -> IndexResult<()> {
        if self.engine().store().features().supports_query_by_label {
            return Ok(());
        }
        let label = schema::schema_label(
            self.engine().schema().as_ref(),
            element.element_type(),
            element.label(),
        )?;
        if !label.enable_label_index() {
            return Ok(());
        }
        let index_label = IndexLabel::label_index(element.element_type());
        let record = IndexRecord::new(&index_label, codec::label_value(element.label()))
            .with_element_id(element.id().clone());
        self.update_record(&record, removed);
        Ok(())
    }

    /// Adds or removes the entries of every index label of the vertex label of `vertex`.
    pub fn update_vertex_index(&mut self, vertex: &Element, removed: bool) -> IndexResult<()> {
        self.update_element_index(ElementType::Vertex, vertex, removed)
    }

    /// Adds or removes the entries of every index label of the edge label of `edge`.
    pub fn update_edge_index(&mut self, edge: &Element, removed: bool) -> IndexResult<()> {
        self.update_element_index(ElementType::Edge, edge, removed)
    }

    fn update_element_index(
        &mut self,
        expected: ElementType,
        element: &Element,
        removed: bool,
    ) -> IndexResult<()> {
        if element.element_type() != expected {
            return Err(IndexError::InvariantViolation(format!(
                "expect {expected}, but got {} {}",
                element.element_type(),
                element.id()
            )));
        }
        let label = schema::schema_label(
            self.engine().schema().as_ref(),
            element.element_type(),
            element.label(),
        )?;
        for index_label in label.index_labels() {
            self.update_index(*index_label, element, removed)?;
        }
        Ok(())
    }

    /// Adds or removes the entries of `element` for one index label.
    ///
    /// Adding a UNIQUE entry fails if the value is already taken in the store and the
    /// transaction does not eliminate it.
    pub fn update_index(
        &mut self,
        index_label: IndexLabelId,
        element: &Element,
        removed: bool,
    ) -> IndexResult<()> {
        let index_label = schema::index_label(self.engine().schema().as_ref(), index_label)?;
        let values = self.engine().index_values(&index_label, element)?;
        for value in values {
            if index_label.index_type().is_unique()
                && !removed
                && self.exist_unique_value(&index_label, &value, element.id())?
            {
                return Err(IndexError::UniqueConstraintViolation {
                    index_label: index_label.name().to_string(),
                    element: format!("{} {}", element.element_type(), element.id()),
                });
            }
            let record =
                IndexRecord::new(&index_label, value).with_element_id(element.id().clone());
            self.update_record(&record, removed);
        }
        Ok(())
    }

    /// Buffers removing every entry of `index_label`.
    pub fn remove_index(&mut self, index_label: &IndexLabel) {
        self.do_remove(&IndexRecord::new(index_label, ""));
    }

    fn update_record(&mut self, record: &IndexRecord, removed: bool) {
        if removed {
            self.do_eliminate(record);
        } else {
            self.do_append(record);
        }
    }

    fn exist_unique_value(
        &self,
        index_label: &IndexLabel,
        value: &str,
        element_id: &Id,
    ) -> IndexResult<bool> {
        let entry = BackendEntry::new(
            index_label.table(),
            index_label.id(),
            value,
            vec![element_id.clone()],
        );
        if self.mutation().contains(&entry, Action::Eliminate) {
            return Ok(false);
        }
        self.exist_unique_value_in_store(index_label, value)
    }

    fn exist_unique_value_in_store(
        &self,
        index_label: &IndexLabel,
        value: &str,
    ) -> IndexResult<bool> {
        let query = ConditionQuery::index(index_label.table(), index_label.id())
            .with_field_values(RelationType::Eq, value);
        let mut exists = false;
        for entry in self.query(&query)? {
            let entry = entry?;
            if exists {
                warn!(
                    index_label = index_label.name(),
                    ?entry,
                    "unique constraint conflict found by record"
                );
            } else {
                debug!(
                    index_label = index_label.name(),
                    ?entry,
                    "already has existed unique index record"
                );
                exists = true;
            }
        }
        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use graphidx_catalog::index_label::IndexBase;
    use graphidx_catalog::memory::MemorySchema;
    use graphidx_catalog::property::PropertyKey;
    use graphidx_catalog::schema_label::SchemaLabel;
    use graphidx_common::data_type::DataType;
    use graphidx_common::types::LabelId;
    use graphidx_storage::memory::{MemoryElements, MemoryStore};

    use super::*;
    use crate::config::IndexConfig;

    const NAME: u32 = 1;
    const AGE: u32 = 2;
    const CITY: u32 = 3;

    fn person() -> LabelId {
        LabelId::new(1).unwrap()
    }

    fn il_id(id: u32) -> IndexLabelId {
        IndexLabelId::new(id).unwrap()
    }

    fn engine(index_type: IndexType, fields: &[u32]) -> Arc<IndexEngine> {
        let mut schema = MemorySchema::new();
        schema.add_property_key(PropertyKey::new(NAME, "name", DataType::String)).unwrap();
        schema.add_property_key(PropertyKey::new(AGE, "age", DataType::Int32)).unwrap();
        schema.add_property_key(PropertyKey::new(CITY, "city", DataType::String)).unwrap();
        schema
            .add_schema_label(
                SchemaLabel::vertex(person(), "person")
                    .with_properties([NAME, AGE, CITY])
                    .with_nullable_keys([AGE, CITY]),
            )
            .unwrap();
        schema
            .add_index_label(
                IndexLabel::new(
                    il_id(1),
                    "personIndex",
                    IndexBase::VertexLabel(person()),
                    index_type,
                    fields.iter().copied(),
                )
                .unwrap(),
            )
            .unwrap();
        IndexEngine::new(
            Arc::new(MemoryStore::new()),
            Arc::new(schema),
            Arc::new(MemoryElements::new()),
            IndexConfig::default(),
        )
        .unwrap()
    }

    fn values(engine: &IndexEngine, element: &Element) -> IndexResult<Vec<String>> {
        let index_label = schema::index_label(engine.schema().as_ref(), il_id(1))?;
        engine.index_values(&index_label, element)
    }

    #[test]
    fn test_secondary_values_are_prefixes() {
        let engine = engine(IndexType::Secondary, &[CITY, NAME]);
        let element = Element::vertex(1, person())
            .with_property(NAME, "tom")
            .with_property(CITY, "Beijing");
        assert_eq!(
            values(&engine, &element).unwrap(),
            vec!["Beijing".to_string(), "Beijing!tom".to_string()]
        );

        let homeless = Element::vertex(2, person()).with_property(NAME, "tom");
        assert!(values(&engine, &homeless).unwrap().is_empty());
    }

    #[test]
    fn test_absent_non_null_field() {
        let engine = engine(IndexType::Secondary, &[NAME]);
        let element = Element::vertex(1, person()).with_property(CITY, "Beijing");
        assert!(matches!(
            values(&engine, &element),
            Err(IndexError::MalformedIndexValue(_))
        ));
        let element = Element::vertex(1, person()).with_property(NAME, NULL_SYM);
        assert!(matches!(
            values(&engine, &element),
            Err(IndexError::MalformedIndexValue(_))
        ));
    }

    #[test]
    fn test_range_search_shard_unique_values() {
        let element = Element::vertex(1, person())
            .with_property(NAME, "Tom Hanks")
            .with_property(AGE, 29);

        let range = engine(IndexType::RangeInt, &[AGE]);
        assert_eq!(values(&range, &element).unwrap(), vec![codec::encode_long(29)]);

        let search = engine(IndexType::Search, &[NAME]);
        assert_eq!(
            values(&search, &element).unwrap(),
            vec!["hanks".to_string(), "tom".to_string()]
        );

        let shard = engine(IndexType::Shard, &[NAME, AGE]);
        assert_eq!(
            values(&shard, &element).unwrap(),
            vec![format!("Tom Hanks!{}", codec::encode_long(29))]
        );

        let unique = engine(IndexType::Unique, &[CITY, NAME]);
        assert_eq!(
            values(&unique, &element).unwrap(),
            vec![format!("{NULL_SYM}!Tom Hanks")]
        );
    }

    #[test]
    fn test_unique_constraint() {
        let engine = engine(IndexType::Unique, &[NAME]);
        let tom = Element::vertex(1, person()).with_property(NAME, "tom");
        let other = Element::vertex(2, person()).with_property(NAME, "tom");

        let mut tx = engine.begin_transaction();
        tx.update_vertex_index(&tom, false).unwrap();
        tx.commit().unwrap();

        let mut tx = engine.begin_transaction();
        assert!(matches!(
            tx.update_vertex_index(&other, false),
            Err(IndexError::UniqueConstraintViolation { .. })
        ));

        // The value becomes free once the transaction eliminates it.
        let mut tx = engine.begin_transaction();
        tx.update_vertex_index(&tom, true).unwrap();
        tx.update_vertex_index(&other, false).unwrap();
        tx.commit().unwrap();
        let index_label = schema::index_label(engine.schema().as_ref(), il_id(1)).unwrap();
        assert!(engine.index_entry_exists(&index_label, "tom", &Id::from(2)).unwrap());
        assert!(!engine.index_entry_exists(&index_label, "tom", &Id::from(1)).unwrap());
    }

    #[test]
    fn test_label_index_and_element_type() {
        let engine = engine(IndexType::Secondary, &[NAME]);
        let tom = Element::vertex(1, person()).with_property(NAME, "tom");
        let mut tx = engine.begin_transaction();
        tx.update_label_index(&tom, false).unwrap();
        assert_eq!(tx.mutation().len(), 1);
        assert!(matches!(
            tx.update_edge_index(&tom, false),
            Err(IndexError::InvariantViolation(_))
        ));
        tx.remove_index(&IndexLabel::label_index(ElementType::Vertex));
        assert_eq!(tx.mutation().len(), 2);
        tx.rollback();
        assert!(!tx.has_updates());
    }
}
