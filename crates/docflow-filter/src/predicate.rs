use crate::error::FilterError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Operators of a comparison leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOperator {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "not in")]
    NotIn,
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            ComparisonOperator::Eq => "==",
            ComparisonOperator::Ne => "!=",
            ComparisonOperator::Gt => ">",
            ComparisonOperator::Ge => ">=",
            ComparisonOperator::Lt => "<",
            ComparisonOperator::Le => "<=",
            ComparisonOperator::In => "in",
            ComparisonOperator::NotIn => "not in",
        };
        f.write_str(symbol)
    }
}

/// Operators of a logical node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalOperator {
    #[serde(rename = "AND", alias = "and")]
    And,
    #[serde(rename = "OR", alias = "or")]
    Or,
    #[serde(rename = "NOT", alias = "not")]
    Not,
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalOperator::And => f.write_str("AND"),
            LogicalOperator::Or => f.write_str("OR"),
            LogicalOperator::Not => f.write_str("NOT"),
        }
    }
}

/// A filter predicate tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterPredicate {
    /// `{operator: AND|OR|NOT, conditions: [...]}`
    Logical {
        operator: LogicalOperator,
        conditions: Vec<FilterPredicate>,
    },

    /// `{field, operator, value}`
    Comparison {
        field: String,
        operator: ComparisonOperator,
        value: Value,
    },
}

impl FilterPredicate {
    /// Parse a predicate from its JSON form
    pub fn from_value(value: &Value) -> Result<Self, FilterError> {
        if !value.is_object() {
            return Err(FilterError::Malformed(format!(
                "expected a mapping, got {}",
                value
            )));
        }
        serde_json::from_value(value.clone()).map_err(|_| {
            FilterError::Malformed(format!(
                "expected {{field, operator, value}} or {{operator: AND|OR|NOT, conditions}}, got {}",
                value
            ))
        })
    }

    /// Serialize to the JSON form
    pub fn to_value(&self) -> Value {
        // Only strings, enums and JSON values inside; cannot fail
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Comparison leaf
    pub fn compare(field: impl Into<String>, operator: ComparisonOperator, value: Value) -> Self {
        FilterPredicate::Comparison {
            field: field.into(),
            operator,
            value,
        }
    }

    /// Conjunction of `conditions`
    pub fn and(conditions: Vec<FilterPredicate>) -> Self {
        FilterPredicate::Logical {
            operator: LogicalOperator::And,
            conditions,
        }
    }

    /// Disjunction of `conditions`
    pub fn or(conditions: Vec<FilterPredicate>) -> Self {
        FilterPredicate::Logical {
            operator: LogicalOperator::Or,
            conditions,
        }
    }

    /// Negation of `condition`
    pub fn not(condition: FilterPredicate) -> Self {
        FilterPredicate::Logical {
            operator: LogicalOperator::Not,
            conditions: vec![condition],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parse_comparison() {
        let predicate =
            FilterPredicate::from_value(&json!({"field": "meta.version", "operator": ">", "value": 1.21}))
                .unwrap();
        assert_eq!(
            predicate,
            FilterPredicate::compare("meta.version", ComparisonOperator::Gt, json!(1.21))
        );
    }

    #[test]
    fn test_parse_nested_logical() {
        let raw = json!({
            "operator": "AND",
            "conditions": [
                {"field": "meta.type", "operator": "==", "value": "article"},
                {"operator": "NOT", "conditions": [
                    {"field": "meta.lang", "operator": "in", "value": ["de", "fr"]}
                ]}
            ]
        });
        let predicate = FilterPredicate::from_value(&raw).unwrap();

        assert_eq!(
            predicate,
            FilterPredicate::and(vec![
                FilterPredicate::compare("meta.type", ComparisonOperator::Eq, json!("article")),
                FilterPredicate::not(FilterPredicate::compare(
                    "meta.lang",
                    ComparisonOperator::In,
                    json!(["de", "fr"])
                )),
            ])
        );
        assert_eq!(predicate.to_value(), raw);
    }

    #[test]
    fn test_parse_rejects_unknown_shapes() {
        for raw in [
            json!({"field": "meta.a", "operator": "~=", "value": 1}),
            json!({"operator": "XOR", "conditions": []}),
            json!({"field": "meta.a"}),
            json!([1, 2]),
        ] {
            assert!(matches!(
                FilterPredicate::from_value(&raw),
                Err(FilterError::Malformed(_))
            ));
        }
    }

    #[test]
    fn test_lowercase_logical_operators() {
        let predicate =
            FilterPredicate::from_value(&json!({"operator": "or", "conditions": []})).unwrap();
        assert_eq!(predicate, FilterPredicate::or(vec![]));
    }
}
