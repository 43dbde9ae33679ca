//! Structural argument schemas
//!
//! An [`ArgSchema`] describes the named fields a capability accepts. The same
//! description drives validation at dispatch time and the JSON Schema handed
//! to the completion engine, so the two can never drift apart.

use super::result::ValidationError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Primitive kind of an argument field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Number,
    Integer,
    Boolean,
}

impl FieldKind {
    fn json_type(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Number => "number",
            FieldKind::Integer => "integer",
            FieldKind::Boolean => "boolean",
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            FieldKind::String => value.is_string(),
            FieldKind::Number => value.is_number(),
            FieldKind::Integer => {
                value.is_i64()
                    || value.is_u64()
                    || value.as_f64().is_some_and(|n| n.fract() == 0.0)
            }
            FieldKind::Boolean => value.is_boolean(),
        }
    }
}

/// Value constraint applied after the kind check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Constraint {
    /// Number strictly greater than zero
    Positive,
    /// String with at least one non-whitespace character
    NonEmpty,
    Min { value: f64 },
    Max { value: f64 },
    /// String must be one of the listed values
    OneOf { values: Vec<String> },
}

impl Constraint {
    fn check(&self, field: &str, value: &Value) -> Option<ValidationError> {
        match self {
            Constraint::Positive => match value.as_f64() {
                Some(n) if n > 0.0 => None,
                _ => Some(ValidationError::new(
                    field,
                    "not_positive",
                    "must be greater than 0",
                )),
            },
            Constraint::NonEmpty => match value.as_str() {
                Some(s) if !s.trim().is_empty() => None,
                _ => Some(ValidationError::new(field, "empty", "must not be empty")),
            },
            Constraint::Min { value: min } => match value.as_f64() {
                Some(n) if n >= *min => None,
                _ => Some(ValidationError::new(
                    field,
                    "too_small",
                    format!("must be at least {}", min),
                )),
            },
            Constraint::Max { value: max } => match value.as_f64() {
                Some(n) if n <= *max => None,
                _ => Some(ValidationError::new(
                    field,
                    "too_large",
                    format!("must be at most {}", max),
                )),
            },
            Constraint::OneOf { values } => match value.as_str() {
                Some(s) if values.iter().any(|v| v == s) => None,
                _ => Some(ValidationError::new(
                    field,
                    "invalid_value",
                    format!("must be one of: {}", values.join(", ")),
                )),
            },
        }
    }

    fn annotate(&self, property: &mut Map<String, Value>) {
        match self {
            Constraint::Positive => {
                property.insert("exclusiveMinimum".to_string(), json!(0));
            }
            Constraint::NonEmpty => {
                property.insert("minLength".to_string(), json!(1));
            }
            Constraint::Min { value } => {
                property.insert("minimum".to_string(), json!(value));
            }
            Constraint::Max { value } => {
                property.insert("maximum".to_string(), json!(value));
            }
            Constraint::OneOf { values } => {
                property.insert("enum".to_string(), json!(values));
            }
        }
    }
}

/// Description of one named argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,

    /// Applied when the field is absent or null; implies optional
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub constraints: Vec<Constraint>,
}

impl FieldSpec {
    fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            default: None,
            description: String::new(),
            constraints: Vec::new(),
        }
    }

    /// Required string field
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::String)
    }

    /// Required number field
    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Number)
    }

    /// Required integer field
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    /// Required boolean field
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self.required = false;
        self
    }

    pub fn positive(self) -> Self {
        self.constrain(Constraint::Positive)
    }

    pub fn non_empty(self) -> Self {
        self.constrain(Constraint::NonEmpty)
    }

    pub fn min(self, value: f64) -> Self {
        self.constrain(Constraint::Min { value })
    }

    pub fn max(self, value: f64) -> Self {
        self.constrain(Constraint::Max { value })
    }

    pub fn one_of<I, S>(self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.constrain(Constraint::OneOf {
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    pub fn constrain(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    fn check(&self, value: &Value, violations: &mut Vec<ValidationError>) {
        if !self.kind.matches(value) {
            violations.push(ValidationError::new(
                &self.name,
                "invalid_type",
                format!("expected {}, got {}", self.kind.json_type(), type_name(value)),
            ));
            return;
        }
        violations.extend(
            self.constraints
                .iter()
                .filter_map(|c| c.check(&self.name, value)),
        );
    }

    fn to_json_schema(&self) -> Value {
        let mut property = Map::new();
        property.insert("type".to_string(), json!(self.kind.json_type()));
        if !self.description.is_empty() {
            property.insert("description".to_string(), json!(self.description));
        }
        if let Some(default) = &self.default {
            property.insert("default".to_string(), default.clone());
        }
        for constraint in &self.constraints {
            constraint.annotate(&mut property);
        }
        Value::Object(property)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Schema for a capability's arguments
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArgSchema {
    fields: Vec<FieldSpec>,
}

impl ArgSchema {
    /// Schema with no fields
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Validate a raw argument payload.
    ///
    /// Every violation is collected before returning. Defaults are applied
    /// to absent optional fields and unknown fields are dropped.
    pub fn validate(&self, raw: &Value) -> Result<ValidatedArgs, Vec<ValidationError>> {
        let empty = Map::new();
        let object = match raw {
            Value::Object(map) => map,
            Value::Null if self.fields.iter().all(|f| !f.required) => &empty,
            other => {
                return Err(vec![ValidationError::new(
                    "$",
                    "invalid_payload",
                    format!("expected an object, got {}", type_name(other)),
                )]);
            }
        };

        let mut violations = Vec::new();
        let mut validated = Map::new();

        for spec in &self.fields {
            match object.get(&spec.name).filter(|v| !v.is_null()) {
                Some(value) => {
                    let before = violations.len();
                    spec.check(value, &mut violations);
                    if violations.len() == before {
                        validated.insert(spec.name.clone(), value.clone());
                    }
                }
                None => {
                    if let Some(default) = &spec.default {
                        validated.insert(spec.name.clone(), default.clone());
                    } else if spec.required {
                        violations.push(ValidationError::new(
                            &spec.name,
                            "required",
                            "field is required",
                        ));
                    }
                }
            }
        }

        if violations.is_empty() {
            Ok(ValidatedArgs(validated))
        } else {
            Err(violations)
        }
    }

    /// JSON Schema object describing the arguments
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.name.clone(), f.to_json_schema()))
            .collect();
        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }
}

/// Arguments that passed schema validation, with defaults applied
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedArgs(Map<String, Value>);

impl ValidatedArgs {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    pub fn f64(&self, name: &str) -> Option<f64> {
        self.0.get(name).and_then(Value::as_f64)
    }

    /// Deserialize into a typed argument struct
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.0.clone()))
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn swap_like() -> ArgSchema {
        ArgSchema::new()
            .field(FieldSpec::string("tokenIn").non_empty())
            .field(FieldSpec::number("amount").positive())
            .field(FieldSpec::string("chain").with_default("solana"))
            .field(FieldSpec::string("protocol").optional())
    }

    #[test]
    fn test_defaults_applied_and_unknown_fields_dropped() {
        let args = swap_like()
            .validate(&json!({"tokenIn": "SOL", "amount": 2, "memo": "hi"}))
            .unwrap();

        assert_eq!(args.str("chain"), Some("solana"));
        assert_eq!(args.f64("amount"), Some(2.0));
        assert!(args.get("protocol").is_none());
        assert!(args.get("memo").is_none());
    }

    #[test]
    fn test_reports_all_violations() {
        let errors = swap_like()
            .validate(&json!({"amount": -1, "chain": 7}))
            .unwrap_err();

        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["tokenIn", "amount", "chain"]);
        assert_eq!(errors[0].code, "required");
        assert_eq!(errors[1].code, "not_positive");
        assert_eq!(errors[2].code, "invalid_type");
    }

    #[test]
    fn test_non_object_payload_rejected() {
        let errors = swap_like().validate(&json!("swap everything")).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "$");
        assert_eq!(errors[0].code, "invalid_payload");
    }

    #[test]
    fn test_null_payload_accepted_when_nothing_required() {
        let schema = ArgSchema::new().field(FieldSpec::boolean("verbose").with_default(false));
        let args = schema.validate(&Value::Null).unwrap();
        assert_eq!(args.get("verbose"), Some(&json!(false)));
    }

    #[test]
    fn test_blank_string_fails_non_empty() {
        let errors = swap_like()
            .validate(&json!({"tokenIn": "   ", "amount": 1}))
            .unwrap_err();
        assert_eq!(errors[0].code, "empty");
    }

    #[test]
    fn test_integer_and_range_constraints() {
        let schema = ArgSchema::new().field(FieldSpec::integer("limit").min(1.0).max(10.0));

        assert!(schema.validate(&json!({"limit": 3})).is_ok());
        assert_eq!(
            schema.validate(&json!({"limit": 2.5})).unwrap_err()[0].code,
            "invalid_type"
        );
        assert_eq!(
            schema.validate(&json!({"limit": 11})).unwrap_err()[0].code,
            "too_large"
        );
    }

    #[test]
    fn test_one_of() {
        let schema =
            ArgSchema::new().field(FieldSpec::string("side").one_of(["buy", "sell"]));
        assert!(schema.validate(&json!({"side": "buy"})).is_ok());
        assert_eq!(
            schema.validate(&json!({"side": "hold"})).unwrap_err()[0].code,
            "invalid_value"
        );
    }

    #[test]
    fn test_json_schema_rendering() {
        let schema = swap_like().to_json_schema();

        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["tokenIn", "amount"]));
        assert_eq!(schema["properties"]["amount"]["exclusiveMinimum"], 0);
        assert_eq!(schema["properties"]["chain"]["default"], "solana");
        assert_eq!(schema["properties"]["tokenIn"]["minLength"], 1);
    }

    #[test]
    fn test_parse_typed_args() {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Args {
            token_in: String,
            amount: f64,
            chain: String,
        }

        let args: Args = swap_like()
            .validate(&json!({"tokenIn": "SOL", "amount": 1.5}))
            .unwrap()
            .parse()
            .unwrap();

        assert_eq!(args.token_in, "SOL");
        assert_eq!(args.amount, 1.5);
        assert_eq!(args.chain, "solana");
    }
}
