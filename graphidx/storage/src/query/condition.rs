use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use graphidx_common::id::Id;
use graphidx_common::types::{IndexLabelId, LabelId, PropertyId};
use graphidx_common::value::ScalarValue;

use crate::model::element::Element;

/// System keys. The first two apply to elements, the last two to index entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SysKey {
    Label,
    Id,
    IndexLabelId,
    FieldValues,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConditionKey {
    Sys(SysKey),
    User(PropertyId),
}

impl ConditionKey {
    #[inline]
    pub fn is_sysprop(&self) -> bool {
        matches!(self, ConditionKey::Sys(_))
    }

    #[inline]
    pub fn user(&self) -> Option<PropertyId> {
        match self {
            ConditionKey::User(key) => Some(*key),
            ConditionKey::Sys(_) => None,
        }
    }
}

impl fmt::Display for ConditionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionKey::Sys(key) => write!(f, "{key}"),
            ConditionKey::User(key) => write!(f, "#{key}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum RelationType {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    TextContains,
    TextContainsAny,
}

impl RelationType {
    #[inline]
    pub fn is_range_type(&self) -> bool {
        matches!(
            self,
            RelationType::Gt | RelationType::Gte | RelationType::Lt | RelationType::Lte
        )
    }

    #[inline]
    pub fn is_search_type(&self) -> bool {
        matches!(self, RelationType::TextContains | RelationType::TextContainsAny)
    }

    #[inline]
    pub fn is_secondary_type(&self) -> bool {
        matches!(self, RelationType::Eq | RelationType::In)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConditionValue {
    Scalar(ScalarValue),
    List(Vec<ScalarValue>),
    Words(BTreeSet<String>),
    Label(LabelId),
    IndexLabel(IndexLabelId),
    Id(Id),
}

impl ConditionValue {
    #[inline]
    pub fn as_scalar(&self) -> Option<&ScalarValue> {
        match self {
            ConditionValue::Scalar(value) => Some(value),
            _ => None,
        }
    }

    /// Scalar values carried by this condition value.
    pub fn scalars(&self) -> Vec<ScalarValue> {
        match self {
            ConditionValue::Scalar(value) => vec![value.clone()],
            ConditionValue::List(values) => values.clone(),
            ConditionValue::Words(words) => {
                words.iter().map(|w| ScalarValue::from(w.as_str())).collect()
            }
            _ => Vec::new(),
        }
    }
}

impl From<ScalarValue> for ConditionValue {
    #[inline]
    fn from(value: ScalarValue) -> Self {
        ConditionValue::Scalar(value)
    }
}

impl fmt::Display for ConditionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionValue::Scalar(v) => write!(f, "{v:?}"),
            ConditionValue::List(values) => write!(f, "{values:?}"),
            ConditionValue::Words(words) => write!(f, "{words:?}"),
            ConditionValue::Label(label) => write!(f, "{label}"),
            ConditionValue::IndexLabel(il) => write!(f, "{il}"),
            ConditionValue::Id(id) => write!(f, "{id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Relation {
    key: ConditionKey,
    relation: RelationType,
    value: ConditionValue,
}

impl Relation {
    #[inline]
    pub fn new(
        key: ConditionKey,
        relation: RelationType,
        value: impl Into<ConditionValue>,
    ) -> Self {
        Self {
            key,
            relation,
            value: value.into(),
        }
    }

    #[inline]
    pub fn key(&self) -> ConditionKey {
        self.key
    }

    #[inline]
    pub fn relation(&self) -> RelationType {
        self.relation
    }

    #[inline]
    pub fn value(&self) -> &ConditionValue {
        &self.value
    }

    #[inline]
    pub fn is_sysprop(&self) -> bool {
        self.key.is_sysprop()
    }

    /// Tests an element against this relation.
    ///
    /// A relation over an absent property never matches. Relations over index-entry keys
    /// never match an element.
    pub fn test(&self, element: &Element) -> bool {
        match self.key {
            ConditionKey::Sys(SysKey::Label) => match &self.value {
                ConditionValue::Label(label) => self.test_eq(element.label() == *label),
                _ => false,
            },
            ConditionKey::Sys(SysKey::Id) => match &self.value {
                ConditionValue::Id(id) => self.test_eq(element.id() == id),
                _ => false,
            },
            ConditionKey::Sys(_) => false,
            ConditionKey::User(key) => element
                .property(key)
                .is_some_and(|actual| self.test_value(actual)),
        }
    }

    fn test_eq(&self, equal: bool) -> bool {
        match self.relation {
            RelationType::Eq => equal,
            RelationType::Neq => !equal,
            _ => false,
        }
    }

    fn test_value(&self, actual: &ScalarValue) -> bool {
        let expected = self.value.as_scalar();
        let ordering = || expected.and_then(|e| actual.compare(e));
        match self.relation {
            RelationType::Eq => expected.is_some_and(|e| actual.loose_eq(e)),
            RelationType::Neq => expected.is_some_and(|e| !actual.loose_eq(e)),
            RelationType::Gt => ordering() == Some(Ordering::Greater),
            RelationType::Gte => matches!(ordering(), Some(Ordering::Greater | Ordering::Equal)),
            RelationType::Lt => ordering() == Some(Ordering::Less),
            RelationType::Lte => matches!(ordering(), Some(Ordering::Less | Ordering::Equal)),
            RelationType::In => match &self.value {
                ConditionValue::List(values) => values.iter().any(|v| actual.loose_eq(v)),
                _ => false,
            },
            RelationType::TextContains => {
                match (actual.as_text(), expected.and_then(ScalarValue::as_text)) {
                    (Some(text), Some(word)) => text.contains(word),
                    _ => false,
                }
            }
            RelationType::TextContainsAny => match (actual.as_text(), &self.value) {
                (Some(text), ConditionValue::Words(words)) => {
                    words.iter().any(|w| text.contains(w.as_str()))
                }
                _ => false,
            },
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.key, self.relation, self.value)
    }
}

/// A boolean tree of relations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Condition {
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Relation(Relation),
}

impl Condition {
    #[inline]
    pub fn and(left: Condition, right: Condition) -> Self {
        Condition::And(Box::new(left), Box::new(right))
    }

    #[inline]
    pub fn or(left: Condition, right: Condition) -> Self {
        Condition::Or(Box::new(left), Box::new(right))
    }

    #[inline]
    pub fn user(
        key: PropertyId,
        relation: RelationType,
        value: impl Into<ConditionValue>,
    ) -> Self {
        Condition::Relation(Relation::new(ConditionKey::User(key), relation, value))
    }

    #[inline]
    pub fn sys(key: SysKey, relation: RelationType, value: impl Into<ConditionValue>) -> Self {
        Condition::Relation(Relation::new(ConditionKey::Sys(key), relation, value))
    }

    #[inline]
    pub fn eq(key: PropertyId, value: impl Into<ScalarValue>) -> Self {
        Self::user(key, RelationType::Eq, value.into())
    }

    #[inline]
    pub fn gt(key: PropertyId, value: impl Into<ScalarValue>) -> Self {
        Self::user(key, RelationType::Gt, value.into())
    }

    #[inline]
    pub fn gte(key: PropertyId, value: impl Into<ScalarValue>) -> Self {
        Self::user(key, RelationType::Gte, value.into())
    }

    #[inline]
    pub fn lt(key: PropertyId, value: impl Into<ScalarValue>) -> Self {
        Self::user(key, RelationType::Lt, value.into())
    }

    #[inline]
    pub fn lte(key: PropertyId, value: impl Into<ScalarValue>) -> Self {
        Self::user(key, RelationType::Lte, value.into())
    }

    pub fn within(key: PropertyId, values: impl IntoIterator<Item = ScalarValue>) -> Self {
        Self::user(
            key,
            RelationType::In,
            ConditionValue::List(values.into_iter().collect()),
        )
    }

    #[inline]
    pub fn text_contains(key: PropertyId, text: impl Into<String>) -> Self {
        Self::user(key, RelationType::TextContains, ScalarValue::String(text.into()))
    }

    pub fn text_contains_any(key: PropertyId, words: impl IntoIterator<Item = String>) -> Self {
        Self::user(
            key,
            RelationType::TextContainsAny,
            ConditionValue::Words(words.into_iter().collect()),
        )
    }

    #[inline]
    pub fn label(label: LabelId) -> Self {
        Self::sys(SysKey::Label, RelationType::Eq, ConditionValue::Label(label))
    }

    #[inline]
    pub fn as_relation(&self) -> Option<&Relation> {
        match self {
            Condition::Relation(r) => Some(r),
            _ => None,
        }
    }

    /// Returns `true` if this condition is a single relation that needs no further expansion.
    pub fn is_flattened(&self) -> bool {
        match self {
            Condition::Relation(r) => {
                !matches!(r.relation, RelationType::In | RelationType::TextContainsAny)
            }
            _ => false,
        }
    }

    /// Returns `true` if every relation in this condition is over a system key.
    pub fn is_sysprop(&self) -> bool {
        match self {
            Condition::And(l, r) | Condition::Or(l, r) => l.is_sysprop() && r.is_sysprop(),
            Condition::Relation(r) => r.is_sysprop(),
        }
    }

    /// Collects all relations of this condition, ignoring the boolean structure.
    pub fn relations(&self) -> Vec<&Relation> {
        let mut relations = Vec::new();
        self.collect_relations(&mut relations);
        relations
    }

    fn collect_relations<'a>(&'a self, out: &mut Vec<&'a Relation>) {
        match self {
            Condition::And(l, r) | Condition::Or(l, r) => {
                l.collect_relations(out);
                r.collect_relations(out);
            }
            Condition::Relation(r) => out.push(r),
        }
    }

    pub fn test(&self, element: &Element) -> bool {
        match self {
            Condition::And(l, r) => l.test(element) && r.test(element),
            Condition::Or(l, r) => l.test(element) || r.test(element),
            Condition::Relation(r) => r.test(element),
        }
    }
}

impl From<Relation> for Condition {
    #[inline]
    fn from(relation: Relation) -> Self {
        Condition::Relation(relation)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::And(l, r) => write!(f, "({l} and {r})"),
            Condition::Or(l, r) => write!(f, "({l} or {r})"),
            Condition::Relation(r) => write!(f, "{r}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAME: PropertyId = 1;
    const AGE: PropertyId = 2;

    fn person() -> Element {
        Element::vertex(1, LabelId::new(1).unwrap())
            .with_property(NAME, "Marko Rodriguez")
            .with_property(AGE, 29)
    }

    #[test]
    fn test_relation_on_user_property() {
        let p = person();
        assert!(Condition::eq(AGE, 29).test(&p));
        assert!(Condition::eq(AGE, 29i64).test(&p));
        assert!(Condition::gt(AGE, 18).test(&p));
        assert!(!Condition::gt(AGE, 29).test(&p));
        assert!(Condition::lte(AGE, 29).test(&p));
        assert!(Condition::within(AGE, [ScalarValue::from(1), ScalarValue::from(29)]).test(&p));
        assert!(Condition::text_contains(NAME, "Rodri").test(&p));
        let any = Condition::text_contains_any(NAME, ["x".to_string(), "Marko".to_string()]);
        assert!(any.test(&p));
        assert!(!Condition::eq(99, 1).test(&p));
    }

    #[test]
    fn test_boolean_tree() {
        let p = person();
        let c = Condition::or(Condition::eq(AGE, 1), Condition::eq(NAME, "Marko Rodriguez"));
        assert!(c.test(&p));
        assert!(!c.is_flattened());
        assert_eq!(c.relations().len(), 2);
        let c = Condition::and(c, Condition::label(LabelId::new(2).unwrap()));
        assert!(!c.test(&p));
        assert!(Condition::label(LabelId::new(1).unwrap()).is_sysprop());
    }
}
