mod common;

use common::*;
use graphidx_catalog::index_label::IndexType;
use graphidx_common::id::Id;
use graphidx_index::builder::construct_index_queries;
use graphidx_index::holder::IdHolder;
use graphidx_index::matcher::collect_matched_indexes;
use graphidx_index::{IndexError, IndexResult};
use graphidx_storage::memory::MemoryStore;
use graphidx_storage::model::element::Element;
use graphidx_storage::query::{
    Condition, ConditionKey, ConditionQuery, ConditionValue, RelationType, SysKey,
};
use graphidx_storage::store::StoreFeatures;

fn sorted(ids: impl IntoIterator<Item = Id>) -> Vec<Id> {
    let mut ids: Vec<Id> = ids.into_iter().collect();
    ids.sort();
    ids
}

#[test]
fn test_query_by_label() -> IndexResult<()> {
    let graph = TestGraph::new(vec![]);
    graph.add_vertex(create_test_person(1, "tom", 29, "Beijing"));
    graph.add_vertex(create_test_person(2, "bob", 30, "Shanghai"));
    graph.add_vertex(Element::vertex(3, SOFTWARE_LABEL_ID).with_property(NAME, "graphidx"));

    let tx = graph.engine.begin_transaction();
    let persons = ConditionQuery::vertices().has_label(PERSON_LABEL_ID);
    assert_eq!(sorted(tx.query_ids(&persons)?), ids(&[1, 2]));

    let software = ConditionQuery::vertices().has_label(SOFTWARE_LABEL_ID);
    assert!(matches!(
        tx.query_index(&software),
        Err(IndexError::NoIndexPath(msg)) if msg.contains("software")
    ));
    Ok(())
}

#[test]
fn test_query_by_label_on_store_with_label_scans() {
    let store = MemoryStore::with_features(StoreFeatures {
        supports_query_by_label: true,
        supports_paging: true,
    });
    let graph = TestGraph::with_store(store, vec![]);
    graph.add_vertex(create_test_person(1, "tom", 29, "Beijing"));
    assert!(graph.store.is_empty());

    let tx = graph.engine.begin_transaction();
    let persons = ConditionQuery::vertices().has_label(PERSON_LABEL_ID);
    assert!(matches!(
        tx.query_index(&persons),
        Err(IndexError::UnsupportedQueryShape(_))
    ));
}

#[test]
fn test_range_query_bounds() -> IndexResult<()> {
    let graph = TestGraph::new(vec![person_index(
        1,
        "personByAge",
        IndexType::RangeInt,
        &[AGE],
    )]);
    for (id, age) in [(1, 17), (2, 18), (3, 19), (4, 29), (5, 30)] {
        graph.add_vertex(create_test_person(id, "tom", age, "Beijing"));
    }
    let query = ConditionQuery::vertices()
        .with_condition(Condition::gt(AGE, 18))
        .with_condition(Condition::lt(AGE, 30));

    // Both bounds go into a single index query.
    let schema = graph.engine.schema().as_ref();
    let matched = collect_matched_indexes(schema, &query)?;
    assert_eq!(matched.len(), 1);
    let queries = construct_index_queries(schema, &matched[0], &query)?;
    assert_eq!(queries.len(), 1);
    let field_values: Vec<RelationType> = queries[0]
        .1
        .relations()
        .filter(|r| r.key() == ConditionKey::Sys(SysKey::FieldValues))
        .map(|r| r.relation())
        .collect();
    assert_eq!(field_values, vec![RelationType::Gt, RelationType::Lt]);

    let tx = graph.engine.begin_transaction();
    assert_eq!(sorted(tx.query_ids(&query)?), ids(&[3, 4]));

    let inclusive = ConditionQuery::vertices()
        .with_condition(Condition::gte(AGE, 18))
        .with_condition(Condition::lte(AGE, 30));
    assert_eq!(sorted(tx.query_ids(&inclusive)?), ids(&[2, 3, 4, 5]));
    Ok(())
}

#[test]
fn test_joint_index_intersection() -> IndexResult<()> {
    let graph = TestGraph::new(vec![
        person_index(1, "personByName", IndexType::Secondary, &[NAME]),
        person_index(2, "personByCity", IndexType::Secondary, &[CITY]),
    ]);
    graph.add_vertex(create_test_person(1, "tom", 20, "Shanghai"));
    graph.add_vertex(create_test_person(2, "tom", 21, "Beijing"));
    graph.add_vertex(create_test_person(3, "tom", 22, "Beijing"));
    graph.add_vertex(create_test_person(4, "bob", 23, "Beijing"));

    let tx = graph.engine.begin_transaction();
    let by_name = ConditionQuery::vertices().with_condition(Condition::eq(NAME, "tom"));
    assert_eq!(sorted(tx.query_ids(&by_name)?), ids(&[1, 2, 3]));
    let by_city = ConditionQuery::vertices().with_condition(Condition::eq(CITY, "Beijing"));
    assert_eq!(sorted(tx.query_ids(&by_city)?), ids(&[2, 3, 4]));

    let query = by_name.with_condition(Condition::eq(CITY, "Beijing"));
    let holders = tx.query_index(&query)?;
    assert_eq!(holders.len(), 1);
    assert_eq!(sorted(holders.batch_ids()), ids(&[2, 3]));

    let nobody = ConditionQuery::vertices()
        .with_condition(Condition::eq(NAME, "alice"))
        .with_condition(Condition::eq(CITY, "Beijing"));
    assert!(tx.query_ids(&nobody)?.is_empty());

    let paged = query.with_page(Some(String::new()));
    assert!(matches!(
        tx.query_index(&paged),
        Err(IndexError::UnsupportedQueryShape(_))
    ));
    Ok(())
}

#[test]
fn test_joint_query_picks_smallest_combination() -> IndexResult<()> {
    let graph = TestGraph::new(vec![
        person_index(1, "personByName", IndexType::Secondary, &[NAME]),
        person_index(2, "personByCity", IndexType::Secondary, &[CITY]),
        person_index(3, "personByAge", IndexType::RangeInt, &[AGE]),
        person_index(4, "personByBio", IndexType::Search, &[BIO]),
    ]);
    graph.add_vertex(create_test_person(1, "tom", 17, "Beijing"));
    graph.add_vertex(create_test_person(2, "tom", 25, "Beijing"));
    graph.add_vertex(create_test_person(3, "tom", 25, "Shanghai"));
    graph.add_vertex(create_test_person(4, "bob", 25, "Beijing"));

    let query = ConditionQuery::vertices()
        .with_condition(Condition::eq(NAME, "tom"))
        .with_condition(Condition::eq(CITY, "Beijing"))
        .with_condition(Condition::gt(AGE, 18));
    let schema = graph.engine.schema().as_ref();
    let matched = collect_matched_indexes(schema, &query)?;
    assert_eq!(matched.len(), 1);
    let queries = construct_index_queries(schema, &matched[0], &query)?;
    let names: Vec<&str> = queries.iter().map(|(il, _)| il.name()).collect();
    assert_eq!(names, vec!["personByAge", "personByName", "personByCity"]);

    let tx = graph.engine.begin_transaction();
    assert_eq!(sorted(tx.query_ids(&query)?), ids(&[2]));
    Ok(())
}

#[test]
fn test_joint_query_prefers_fewer_index_labels() -> IndexResult<()> {
    let graph = TestGraph::new(vec![
        person_index(1, "personByName", IndexType::Secondary, &[NAME]),
        person_index(2, "personByCity", IndexType::Secondary, &[CITY]),
        person_index(3, "personByAge", IndexType::Secondary, &[AGE]),
        person_index(4, "personByCityAge", IndexType::Secondary, &[CITY, AGE]),
    ]);
    graph.add_vertex(create_test_person(1, "tom", 25, "Beijing"));
    graph.add_vertex(create_test_person(2, "tom", 30, "Beijing"));
    graph.add_vertex(create_test_person(3, "bob", 25, "Beijing"));

    let query = ConditionQuery::vertices()
        .with_condition(Condition::eq(NAME, "tom"))
        .with_condition(Condition::eq(CITY, "Beijing"))
        .with_condition(Condition::eq(AGE, 25));
    let schema = graph.engine.schema().as_ref();
    let matched = collect_matched_indexes(schema, &query)?;
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].index_labels().len(), 4);
    let queries = construct_index_queries(schema, &matched[0], &query)?;
    let names: Vec<&str> = queries.iter().map(|(il, _)| il.name()).collect();
    assert_eq!(names, vec!["personByName", "personByCityAge"]);

    let tx = graph.engine.begin_transaction();
    assert_eq!(sorted(tx.query_ids(&query)?), ids(&[1]));
    Ok(())
}

#[test]
fn test_composite_index_prefix() -> IndexResult<()> {
    let graph = TestGraph::new(vec![person_index(
        1,
        "personByCityName",
        IndexType::Secondary,
        &[CITY, NAME],
    )]);
    graph.add_vertex(create_test_person(1, "tom", 20, "Beijing"));
    graph.add_vertex(create_test_person(2, "bob", 21, "Beijing"));

    let tx = graph.engine.begin_transaction();
    let by_city = ConditionQuery::vertices().with_condition(Condition::eq(CITY, "Beijing"));
    assert_eq!(sorted(tx.query_ids(&by_city)?), ids(&[1, 2]));
    let both = by_city.with_condition(Condition::eq(NAME, "tom"));
    assert_eq!(sorted(tx.query_ids(&both)?), ids(&[1]));

    let by_name = ConditionQuery::vertices()
        .has_label(PERSON_LABEL_ID)
        .with_condition(Condition::eq(NAME, "tom"));
    match tx.query_index(&by_name) {
        Err(IndexError::NoIndexPath(msg)) => {
            assert!(msg.contains("label 'person'"), "{msg}");
            assert!(msg.contains("secondary"), "{msg}");
        }
        other => panic!("unexpected {other:?}"),
    }
    Ok(())
}

#[test]
fn test_shard_index() -> IndexResult<()> {
    let graph = TestGraph::new(vec![person_index(
        1,
        "personByCityAge",
        IndexType::Shard,
        &[CITY, AGE],
    )]);
    graph.add_vertex(create_test_person(1, "tom", 18, "Beijing"));
    graph.add_vertex(create_test_person(2, "bob", 25, "Beijing"));
    graph.add_vertex(create_test_person(3, "amy", 40, "Beijing"));
    graph.add_vertex(create_test_person(4, "joe", 25, "Shanghai"));

    let tx = graph.engine.begin_transaction();
    let in_beijing = ConditionQuery::vertices().with_condition(Condition::eq(CITY, "Beijing"));
    assert_eq!(sorted(tx.query_ids(&in_beijing)?), ids(&[1, 2, 3]));

    let adults = in_beijing.clone().with_condition(Condition::gt(AGE, 18));
    assert_eq!(sorted(tx.query_ids(&adults)?), ids(&[2, 3]));
    let young = in_beijing.clone().with_condition(Condition::lte(AGE, 25));
    assert_eq!(sorted(tx.query_ids(&young)?), ids(&[1, 2]));
    let exact = in_beijing.with_condition(Condition::eq(AGE, 25));
    assert_eq!(sorted(tx.query_ids(&exact)?), ids(&[2]));
    Ok(())
}

#[test]
fn test_search_query_filters_results() -> IndexResult<()> {
    let graph = TestGraph::new(vec![person_index(
        1,
        "personByBio",
        IndexType::Search,
        &[BIO],
    )]);
    let rustacean = create_test_person(1, "tom", 20, "Beijing").with_property(BIO, "Rust and Go");
    let gopher = create_test_person(2, "bob", 21, "Beijing").with_property(BIO, "Go player");
    let javaist = create_test_person(3, "amy", 22, "Beijing").with_property(BIO, "Java");
    for vertex in [&rustacean, &gopher, &javaist] {
        graph.add_vertex(vertex.clone());
    }

    let tx = graph.engine.begin_transaction();
    let query = ConditionQuery::vertices().with_condition(Condition::text_contains(BIO, "RUST go"));
    let holders = tx.query_index(&query)?;
    assert_eq!(sorted(holders.batch_ids()), ids(&[1, 2]));
    assert!(holders.filter_result(&rustacean));
    assert!(holders.filter_result(&gopher));
    assert!(!holders.filter_result(&javaist));
    Ok(())
}

#[test]
fn test_paged_query() -> IndexResult<()> {
    let graph = TestGraph::new(vec![person_index(
        1,
        "personByName",
        IndexType::Secondary,
        &[NAME],
    )]);
    for id in 1..=5 {
        graph.add_vertex(create_test_person(id, "tom", 20, "Beijing"));
    }

    let tx = graph.engine.begin_transaction();
    let query = ConditionQuery::vertices()
        .with_condition(Condition::eq(NAME, "tom"))
        .with_page(Some(String::new()));
    let mut holders = tx.query_index(&query)?;
    assert!(holders.paging());
    assert_eq!(holders.len(), 1);
    let holder = &mut holders.holders_mut()[0];
    assert!(matches!(holder, IdHolder::Paged(_)));

    let first = holder.fetch_next(2)?;
    assert_eq!(first.ids().len(), 2);
    assert!(first.page().is_some());
    let rest = holder.fetch_all(2)?;
    assert_eq!(rest.len(), 3);
    assert!(holder.fetch_next(2)?.is_empty());

    let limited = ConditionQuery::vertices()
        .with_condition(Condition::eq(NAME, "tom"))
        .with_limit(2);
    assert_eq!(tx.query_ids(&limited)?.len(), 2);
    Ok(())
}

#[test]
fn test_rejected_queries() {
    let graph = TestGraph::new(vec![
        person_index(1, "personByName", IndexType::Secondary, &[NAME]),
        person_index(2, "personByCityUnique", IndexType::Unique, &[CITY]),
    ]);
    let tx = graph.engine.begin_transaction();

    let by_id = ConditionQuery::vertices().with_condition(Condition::sys(
        SysKey::Id,
        RelationType::Eq,
        ConditionValue::Id(Id::from(1)),
    ));
    assert!(matches!(
        tx.query_index(&by_id),
        Err(IndexError::UnsupportedQueryShape(_))
    ));

    // Unique indexes only enforce uniqueness.
    let by_city = ConditionQuery::vertices().with_condition(Condition::eq(CITY, "Beijing"));
    assert!(matches!(
        tx.query_index(&by_city),
        Err(IndexError::NoIndexPath(_))
    ));

    let mistyped = ConditionQuery::vertices().with_condition(Condition::eq(NAME, 1));
    assert!(tx.query_index(&mistyped).unwrap().is_empty());

    let too_many = ConditionQuery::vertices()
        .with_condition(Condition::gt(AGE, 1))
        .with_condition(Condition::gt(AGE, 2))
        .with_condition(Condition::lt(AGE, 9));
    let range = TestGraph::new(vec![person_index(
        1,
        "personByAge",
        IndexType::RangeInt,
        &[AGE],
    )]);
    assert!(matches!(
        range.engine.begin_transaction().query_index(&too_many),
        Err(IndexError::UnsupportedQueryShape(_))
    ));
}

#[test]
fn test_paged_query_on_store_without_page_metadata() {
    let store = MemoryStore::with_features(StoreFeatures {
        supports_query_by_label: false,
        supports_paging: false,
    });
    let graph = TestGraph::with_store(
        store,
        vec![person_index(1, "personByName", IndexType::Secondary, &[NAME])],
    );
    graph.add_vertex(create_test_person(1, "tom", 29, "Beijing"));
    let tx = graph.engine.begin_transaction();

    // Nothing found, so there is no page to continue from.
    let nobody = ConditionQuery::vertices()
        .with_condition(Condition::eq(NAME, "alice"))
        .with_page(Some(String::new()));
    let mut holders = tx.query_index(&nobody).unwrap();
    let page = holders.holders_mut()[0].fetch_next(10).unwrap();
    assert!(page.is_empty());
    assert_eq!(page.page(), None);

    let tom = ConditionQuery::vertices()
        .with_condition(Condition::eq(NAME, "tom"))
        .with_page(Some(String::new()));
    let mut holders = tx.query_index(&tom).unwrap();
    assert!(matches!(
        holders.holders_mut()[0].fetch_next(10),
        Err(IndexError::InvariantViolation(_))
    ));

    // Unpaged queries don't need page metadata.
    let unpaged = ConditionQuery::vertices().with_condition(Condition::eq(NAME, "tom"));
    assert_eq!(sorted(tx.query_ids(&unpaged).unwrap()), ids(&[1]));
}
