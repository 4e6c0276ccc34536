//! Domain models for Clausewise
//!
//! The structured answer schema the model is asked to produce. Keys are
//! snake_case on the wire. Any field may be missing or `null`; unknown keys are
//! ignored, but a value of the wrong type fails the whole parse.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Treat `null` like a missing field
fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A structured decision about the query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredAnalysis {
    /// e.g. APPROVED, REJECTED, PENDING
    #[serde(default, deserialize_with = "nullable")]
    pub decision: String,
    /// Monetary amount, if the decision involves one
    #[serde(default)]
    pub amount: Option<f64>,
    /// e.g. HIGH, MEDIUM, LOW
    #[serde(default, deserialize_with = "nullable")]
    pub confidence: String,
    #[serde(default, deserialize_with = "nullable")]
    pub justification: Justification,
    #[serde(default, deserialize_with = "nullable")]
    pub recommendations: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub flags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Justification {
    #[serde(default, deserialize_with = "nullable")]
    pub primary_reasoning: String,
    #[serde(default, deserialize_with = "nullable")]
    pub supporting_clauses: Vec<SupportingClause>,
    #[serde(default, deserialize_with = "nullable")]
    pub key_factors: KeyFactors,
}

/// A document clause the decision relies on
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupportingClause {
    #[serde(default, deserialize_with = "nullable")]
    pub clause_reference: String,
    #[serde(default, deserialize_with = "nullable")]
    pub clause_text: String,
    #[serde(default, deserialize_with = "nullable")]
    pub application: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyFactors {
    #[serde(default, deserialize_with = "nullable")]
    pub entity_analysis: EntityAnalysis,
    #[serde(default, deserialize_with = "nullable")]
    pub rule_application: String,
    #[serde(default, deserialize_with = "nullable")]
    pub calculation_method: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityAnalysis {
    #[serde(default, deserialize_with = "nullable")]
    pub extracted_entities: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub missing_information: Vec<String>,
}

impl StructuredAnalysis {
    /// Parse a model answer
    ///
    /// Surrounding whitespace is tolerated; anything else that is not a JSON
    /// object of the expected shape is an `InvalidShape` error.
    pub fn parse(answer: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(answer.trim()).map_err(|e| Error::InvalidShape(e.to_string()))?;
        check_objects(&value)?;
        serde_json::from_value(value).map_err(|e| Error::InvalidShape(e.to_string()))
    }
}

/// Require a JSON object at every position that maps to a struct
///
/// serde also fills structs from arrays by position, which would let
/// `["REJECTED", 99.5]` through as a decision.
fn check_objects(value: &Value) -> Result<()> {
    let root = expect_object(value, "answer")?;

    let Some(justification) = nested(root, "justification")? else {
        return Ok(());
    };
    if let Some(Value::Array(clauses)) = justification.get("supporting_clauses") {
        for clause in clauses {
            expect_object(clause, "supporting clause")?;
        }
    }

    let Some(key_factors) = nested(justification, "key_factors")? else {
        return Ok(());
    };
    nested(key_factors, "entity_analysis")?;
    Ok(())
}

/// The object under `key`, or None when missing or `null`
fn nested<'a>(
    parent: &'a serde_json::Map<String, Value>,
    key: &str,
) -> Result<Option<&'a serde_json::Map<String, Value>>> {
    match parent.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => expect_object(value, key).map(Some),
    }
}

fn expect_object<'a>(value: &'a Value, what: &str) -> Result<&'a serde_json::Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| Error::InvalidShape(format!("{} must be a JSON object", what)))
}
