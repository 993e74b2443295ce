mod common;

use std::time::Duration;

use common::*;
use graphidx_catalog::index_label::IndexType;
use graphidx_common::id::Id;
use graphidx_common::table::IndexTable;
use graphidx_common::types::IndexLabelId;
use graphidx_index::codec;
use graphidx_index::job::JobStatus;
use graphidx_storage::model::element::Element;
use graphidx_storage::query::{Condition, ConditionQuery};

const TIMEOUT: Duration = Duration::from_secs(10);

fn il(id: u32) -> IndexLabelId {
    IndexLabelId::new(id).unwrap()
}

fn repair(graph: &TestGraph, query: &ConditionQuery, element: &Element) -> Option<JobStatus> {
    let job = graph
        .engine
        .schedule_left_index_repair(query.clone(), element.clone());
    graph.engine.wait_for_job(job, TIMEOUT)
}

#[test]
fn test_repair_composite_secondary_index() {
    let graph = TestGraph::new(vec![person_index(
        1,
        "personByCityName",
        IndexType::Secondary,
        &[CITY, NAME],
    )]);
    graph.add_vertex(create_test_person(1, "x", 29, "Beijing"));
    let renamed = create_test_person(1, "y", 29, "Beijing");
    graph.overwrite_vertex(renamed.clone());

    let query = ConditionQuery::vertices()
        .with_condition(Condition::eq(CITY, "Beijing"))
        .with_condition(Condition::eq(NAME, "x"));
    assert_eq!(repair(&graph, &query, &renamed), Some(JobStatus::Succeeded(1)));

    let id = Id::from(1);
    let store = &graph.store;
    assert!(store.contains(IndexTable::SecondaryIndex, il(1), "Beijing", &id));
    assert!(!store.contains(IndexTable::SecondaryIndex, il(1), "Beijing!x", &id));
    assert!(store.contains(IndexTable::SecondaryIndex, il(1), "Beijing!y", &id));

    assert_eq!(repair(&graph, &query, &renamed), Some(JobStatus::Succeeded(0)));
    assert!(store.contains(IndexTable::SecondaryIndex, il(1), "Beijing!y", &id));
}

#[test]
fn test_repair_range_index() {
    let graph = TestGraph::new(vec![person_index(
        1,
        "personByAge",
        IndexType::RangeInt,
        &[AGE],
    )]);
    graph.add_vertex(create_test_person(1, "tom", 25, "Beijing"));
    graph.add_vertex(create_test_person(2, "bob", 30, "Beijing"));
    let younger = create_test_person(1, "tom", 10, "Beijing");
    graph.overwrite_vertex(younger.clone());

    let query = ConditionQuery::vertices().with_condition(Condition::gt(AGE, 20));
    assert_eq!(repair(&graph, &query, &younger), Some(JobStatus::Succeeded(1)));

    let store = &graph.store;
    let stale = codec::encode_long(25);
    assert!(!store.contains(IndexTable::RangeIntIndex, il(1), &stale, &Id::from(1)));
    let other = codec::encode_long(30);
    assert!(store.contains(IndexTable::RangeIntIndex, il(1), &other, &Id::from(2)));

    assert_eq!(repair(&graph, &query, &younger), Some(JobStatus::Succeeded(0)));
    let tx = graph.engine.begin_transaction();
    assert_eq!(tx.query_ids(&query).unwrap().into_iter().collect::<Vec<_>>(), ids(&[2]));
}

#[test]
fn test_repair_restores_entries_of_matching_element() {
    let graph = TestGraph::new(vec![person_index(
        1,
        "personByAge",
        IndexType::RangeInt,
        &[AGE],
    )]);
    graph.add_vertex(create_test_person(1, "tom", 25, "Beijing"));
    let stale = create_test_person(1, "tom", 10, "Beijing");
    // The element was updated again before the job read it.
    graph.overwrite_vertex(create_test_person(1, "tom", 25, "Beijing"));

    let query = ConditionQuery::vertices().with_condition(Condition::gt(AGE, 20));
    assert_eq!(repair(&graph, &query, &stale), Some(JobStatus::Succeeded(0)));
    let age = codec::encode_long(25);
    assert!(graph.store.contains(IndexTable::RangeIntIndex, il(1), &age, &Id::from(1)));
}

#[test]
fn test_repair_search_index() {
    let graph = TestGraph::new(vec![person_index(
        1,
        "personByBio",
        IndexType::Search,
        &[BIO],
    )]);
    graph.add_vertex(create_test_person(1, "tom", 25, "Beijing").with_property(BIO, "rust"));
    let rewritten = create_test_person(1, "tom", 25, "Beijing").with_property(BIO, "java");
    graph.overwrite_vertex(rewritten.clone());

    let query = ConditionQuery::vertices().with_condition(Condition::text_contains(BIO, "rust"));
    assert_eq!(repair(&graph, &query, &rewritten), Some(JobStatus::Succeeded(1)));
    assert!(!graph.store.contains(IndexTable::SearchIndex, il(1), "rust", &Id::from(1)));

    // Text still sharing a word with the condition keeps its entries.
    let both = create_test_person(2, "bob", 25, "Beijing").with_property(BIO, "rust go");
    graph.add_vertex(both.clone());
    let go = ConditionQuery::vertices().with_condition(Condition::text_contains(BIO, "rust go"));
    assert_eq!(repair(&graph, &go, &both), Some(JobStatus::Succeeded(0)));
    assert!(graph.store.contains(IndexTable::SearchIndex, il(1), "rust", &Id::from(2)));
}
