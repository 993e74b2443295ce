pub mod condition;
pub mod condition_query;
pub mod flatten;

pub use condition::{Condition, ConditionKey, ConditionValue, Relation, RelationType, SysKey};
pub use condition_query::{ConditionQuery, NO_LIMIT, QueryType, ResultsFilter};
pub use flatten::flatten;
