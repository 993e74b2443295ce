use std::sync::Arc;

use graphidx_catalog::index_label::{IndexBase, IndexLabel, IndexType};
use graphidx_catalog::memory::MemorySchema;
use graphidx_catalog::property::PropertyKey;
use graphidx_catalog::schema_label::SchemaLabel;
use graphidx_common::data_type::DataType;
use graphidx_common::id::Id;
use graphidx_common::types::{IndexLabelId, LabelId, PropertyId};
use graphidx_index::{IndexConfig, IndexEngine};
use graphidx_storage::memory::{MemoryElements, MemoryStore};
use graphidx_storage::model::element::Element;

pub const PERSON_LABEL_ID: LabelId = LabelId::new(1).unwrap();
pub const SOFTWARE_LABEL_ID: LabelId = LabelId::new(2).unwrap();

pub const NAME: PropertyId = 1;
pub const AGE: PropertyId = 2;
pub const CITY: PropertyId = 3;
pub const BIO: PropertyId = 4;

pub struct TestGraph {
    pub engine: Arc<IndexEngine>,
    pub store: Arc<MemoryStore>,
    pub elements: Arc<MemoryElements>,
}

impl TestGraph {
    /// A graph of persons indexed by `index_labels`, on a store needing label indexes.
    pub fn new(index_labels: Vec<IndexLabel>) -> Self {
        Self::with_store(MemoryStore::new(), index_labels)
    }

    pub fn with_store(store: MemoryStore, index_labels: Vec<IndexLabel>) -> Self {
        let mut schema = MemorySchema::new();
        for key in [
            PropertyKey::new(NAME, "name", DataType::String),
            PropertyKey::new(AGE, "age", DataType::Int32),
            PropertyKey::new(CITY, "city", DataType::String),
            PropertyKey::new(BIO, "bio", DataType::String),
        ] {
            schema.add_property_key(key).unwrap();
        }
        schema
            .add_schema_label(
                SchemaLabel::vertex(PERSON_LABEL_ID, "person")
                    .with_properties([NAME, AGE, CITY, BIO])
                    .with_nullable_keys([AGE, CITY, BIO]),
            )
            .unwrap();
        schema
            .add_schema_label(
                SchemaLabel::vertex(SOFTWARE_LABEL_ID, "software")
                    .with_properties([NAME])
                    .with_label_index(false),
            )
            .unwrap();
        for index_label in index_labels {
            schema.add_index_label(index_label).unwrap();
        }

        let store = Arc::new(store);
        let elements = Arc::new(MemoryElements::new());
        let engine = IndexEngine::new(
            store.clone(),
            Arc::new(schema),
            elements.clone(),
            IndexConfig::default(),
        )
        .unwrap();
        Self {
            engine,
            store,
            elements,
        }
    }

    /// Stores `vertex` and commits all its index entries.
    pub fn add_vertex(&self, vertex: Element) {
        let mut tx = self.engine.begin_transaction();
        tx.update_label_index(&vertex, false).unwrap();
        tx.update_vertex_index(&vertex, false).unwrap();
        tx.commit().unwrap();
        self.elements.put(vertex);
    }

    /// Replaces the stored state of a vertex without touching its index entries, as an
    /// interrupted update would.
    #[allow(dead_code)]
    pub fn overwrite_vertex(&self, vertex: Element) {
        self.elements.put(vertex);
    }
}

pub fn person_index(
    id: u32,
    name: &str,
    index_type: IndexType,
    fields: &[PropertyId],
) -> IndexLabel {
    IndexLabel::new(
        IndexLabelId::new(id).unwrap(),
        name,
        IndexBase::VertexLabel(PERSON_LABEL_ID),
        index_type,
        fields.iter().copied(),
    )
    .unwrap()
}

pub fn create_test_person(id: i64, name: &str, age: i32, city: &str) -> Element {
    Element::vertex(id, PERSON_LABEL_ID)
        .with_property(NAME, name)
        .with_property(AGE, age)
        .with_property(CITY, city)
}

#[allow(dead_code)]
pub fn ids(values: &[i64]) -> Vec<Id> {
    values.iter().copied().map(Id::from).collect()
}
