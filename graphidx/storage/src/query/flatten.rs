use graphidx_common::value::ScalarValue;
use itertools::Itertools;

use super::condition::{Condition, ConditionValue, Relation, RelationType};
use super::condition_query::ConditionQuery;

/// Expands a query into a list of pure conjunctions.
///
/// `OR` branches become separate queries, an `IN` relation becomes one equality per value and
/// a `TEXT_CONTAINS_ANY` relation becomes one `TEXT_CONTAINS` per word. Paging state and the
/// results filter are carried to every produced query. A query whose conditions can never be
/// satisfied (e.g. `IN` over an empty list) flattens to nothing.
pub fn flatten(query: &ConditionQuery) -> Vec<ConditionQuery> {
    if query.is_flattened() {
        return vec![query.clone()];
    }
    query
        .conditions()
        .iter()
        .map(|c| disjunctive_normal_form(c).into_iter())
        .multi_cartesian_product()
        .map(|branches| {
            let conditions = branches
                .into_iter()
                .flatten()
                .map(Condition::Relation)
                .collect();
            query.clone().with_conditions_replaced(conditions)
        })
        .collect()
}

/// Returns the condition as a disjunction of conjunctions of flattened relations.
fn disjunctive_normal_form(condition: &Condition) -> Vec<Vec<Relation>> {
    match condition {
        Condition::Relation(relation) => expand_relation(relation)
            .into_iter()
            .map(|r| vec![r])
            .collect(),
        Condition::Or(left, right) => {
            let mut branches = disjunctive_normal_form(left);
            branches.extend(disjunctive_normal_form(right));
            branches
        }
        Condition::And(left, right) => {
            let right = disjunctive_normal_form(right);
            disjunctive_normal_form(left)
                .into_iter()
                .cartesian_product(right)
                .map(|(mut l, r)| {
                    l.extend(r);
                    l
                })
                .collect()
        }
    }
}

fn expand_relation(relation: &Relation) -> Vec<Relation> {
    match (relation.relation(), relation.value()) {
        (RelationType::In, ConditionValue::List(values)) => values
            .iter()
            .map(|v| Relation::new(relation.key(), RelationType::Eq, v.clone()))
            .collect(),
        (RelationType::TextContainsAny, ConditionValue::Words(words)) => words
            .iter()
            .map(|w| {
                Relation::new(
                    relation.key(),
                    RelationType::TextContains,
                    ScalarValue::from(w.as_str()),
                )
            })
            .collect(),
        _ => vec![relation.clone()],
    }
}
