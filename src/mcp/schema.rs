//! Declared input and output shapes for tools
//!
//! A [`Shape`] is an ordered list of fields checked by one generic validator. It
//! converts to and from the protocol's tool input and output schemas.

use std::{collections::HashMap, fmt};

use rust_mcp_sdk::schema::{ToolInputSchema, ToolOutputSchema};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::errors::AppError;

type SchemaProperties = HashMap<String, Map<String, Value>>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShapeError {
    #[error("field `{field}` declares unsupported type `{json_type}`")]
    UnsupportedType { field: String, json_type: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Number,
    Integer,
    String,
    Boolean,
}

impl FieldType {
    pub fn json_type(self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::Integer => "integer",
            Self::String => "string",
            Self::Boolean => "boolean",
        }
    }

    pub fn from_json_type(json_type: &str) -> Option<Self> {
        match json_type {
            "number" => Some(Self::Number),
            "integer" => Some(Self::Integer),
            "string" => Some(Self::String),
            "boolean" => Some(Self::Boolean),
            _ => None,
        }
    }

    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::String => value.is_string(),
            Self::Boolean => value.is_boolean(),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.json_type())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub field_type: FieldType,
    pub required: bool,
    /// Minimum string length in Unicode code points.
    pub min_length: Option<usize>,
    pub description: Option<String>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: true,
            min_length: None,
            description: None,
        }
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Number)
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::String)
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn min_length(mut self, min_length: usize) -> Self {
        self.min_length = Some(min_length);
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn check(&self, value: &Value) -> Result<(), AppError> {
        if !self.field_type.matches(value) {
            return Err(AppError::invalid_input(
                &self.name,
                format!("expected {}", self.field_type),
            ));
        }

        if let (Some(min_length), Some(text)) = (self.min_length, value.as_str()) {
            if text.chars().count() < min_length {
                return Err(AppError::invalid_input(
                    &self.name,
                    format!("must contain at least {min_length} character(s)"),
                ));
            }
        }

        Ok(())
    }

    /// Reads one entry of a JSON Schema `properties` object.
    fn from_property(
        name: &str,
        property: &Map<String, Value>,
        required: bool,
    ) -> Result<Self, ShapeError> {
        let json_type = property
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let field_type =
            FieldType::from_json_type(json_type).ok_or_else(|| ShapeError::UnsupportedType {
                field: name.to_string(),
                json_type: json_type.to_string(),
            })?;

        let mut spec = Self::new(name, field_type);
        if !required {
            spec = spec.optional();
        }
        if let Some(min_length) = property.get("minLength").and_then(Value::as_u64) {
            spec = spec.min_length(usize::try_from(min_length).unwrap_or(usize::MAX));
        }
        if let Some(description) = property.get("description").and_then(Value::as_str) {
            spec = spec.describe(description);
        }
        Ok(spec)
    }

    fn to_property(&self) -> Map<String, Value> {
        let mut property = Map::new();
        property.insert("type".to_string(), json!(self.field_type.json_type()));
        if let Some(min_length) = self.min_length {
            property.insert("minLength".to_string(), json!(min_length));
        }
        if let Some(description) = &self.description {
            property.insert("description".to_string(), json!(description));
        }
        property
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shape {
    fields: Vec<FieldSpec>,
}

impl Shape {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field, replacing an earlier field with the same name.
    pub fn field(mut self, spec: FieldSpec) -> Self {
        match self.fields.iter_mut().find(|field| field.name == spec.name) {
            Some(existing) => *existing = spec,
            None => self.fields.push(spec),
        }
        self
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Checks `arguments` field by field and returns only the declared fields.
    pub fn validate(&self, arguments: &Map<String, Value>) -> Result<Map<String, Value>, AppError> {
        let mut validated = Map::new();

        for field in &self.fields {
            match arguments.get(&field.name) {
                Some(value) => {
                    field.check(value)?;
                    validated.insert(field.name.clone(), value.clone());
                }
                None if field.required => {
                    return Err(AppError::invalid_input(&field.name, "is required"));
                }
                None => {}
            }
        }

        Ok(validated)
    }

    /// Builds a shape from a declared input schema. Fields are ordered by name.
    pub fn from_input_schema(schema: &ToolInputSchema) -> Result<Self, ShapeError> {
        let mut properties = schema.properties.iter().flatten().collect::<Vec<_>>();
        properties.sort_by(|(left, _), (right, _)| left.cmp(right));

        let mut shape = Self::new();
        for (name, property) in properties {
            let required = schema.required.iter().any(|field| field == name);
            shape = shape.field(FieldSpec::from_property(name, property, required)?);
        }
        Ok(shape)
    }

    pub fn to_input_schema(&self) -> ToolInputSchema {
        let (required, properties) = self.schema_parts();
        ToolInputSchema::new(required, Some(properties), None)
    }

    pub fn to_output_schema(&self) -> ToolOutputSchema {
        let (required, properties) = self.schema_parts();
        ToolOutputSchema::new(required, Some(properties), None)
    }

    fn schema_parts(&self) -> (Vec<String>, SchemaProperties) {
        let required = self
            .fields
            .iter()
            .filter(|field| field.required)
            .map(|field| field.name.clone())
            .collect();
        let properties = self
            .fields
            .iter()
            .map(|field| (field.name.clone(), field.to_property()))
            .collect();
        (required, properties)
    }
}
