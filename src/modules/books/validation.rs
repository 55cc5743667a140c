//! JSON schema checks for inbound book payloads.
//!
//! The same schema documents are published as OpenAPI components, so the
//! documented contract and the enforced one cannot drift apart.

use anyhow::anyhow;
use jsonschema::{Draft, JSONSchema};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use super::error::BookError;
use super::models::{Book, BookFields};

const TEXT_FIELDS: [&str; 6] = [
    "isbn",
    "amazon_url",
    "author",
    "language",
    "publisher",
    "title",
];
const INTEGER_FIELDS: [&str; 2] = ["pages", "year"];

/// Schema for `POST /books`: every field required.
pub static CREATE_SCHEMA: Lazy<Value> = Lazy::new(|| book_schema(Direction::Create));

/// Schema for `PUT /books/{isbn}`: the ISBN comes from the path.
pub static UPDATE_SCHEMA: Lazy<Value> = Lazy::new(|| book_schema(Direction::Update));

/// Which write a payload is validated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Create,
    Update,
}

fn book_schema(direction: Direction) -> Value {
    let mut properties = serde_json::Map::new();
    for field in TEXT_FIELDS {
        properties.insert(field.to_string(), json!({ "type": "string", "minLength": 1 }));
    }
    for field in INTEGER_FIELDS {
        properties.insert(field.to_string(), json!({ "type": "integer" }));
    }

    let required: Vec<&str> = TEXT_FIELDS
        .iter()
        .chain(INTEGER_FIELDS.iter())
        .copied()
        .filter(|field| direction == Direction::Create || *field != "isbn")
        .collect();

    json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}

/// Compiled create and update schemas.
pub struct BookValidator {
    create: JSONSchema,
    update: JSONSchema,
}

impl BookValidator {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            create: compile(&CREATE_SCHEMA)?,
            update: compile(&UPDATE_SCHEMA)?,
        })
    }

    /// Check `candidate` against the schema for `direction`, collecting every violation.
    pub fn validate(&self, candidate: &Value, direction: Direction) -> Result<(), BookError> {
        let schema = match direction {
            Direction::Create => &self.create,
            Direction::Update => &self.update,
        };

        schema.validate(candidate).map_err(|errors| {
            let messages = errors
                .map(|error| {
                    let path = error.instance_path.to_string();
                    if path.is_empty() {
                        error.to_string()
                    } else {
                        format!("{}: {}", path, error)
                    }
                })
                .collect();
            BookError::Validation(messages)
        })
    }

    /// Validate a create payload and convert it to a [`Book`].
    pub fn parse_new(&self, candidate: Value) -> Result<Book, BookError> {
        self.validate(&candidate, Direction::Create)?;
        typed(candidate)
    }

    /// Validate an update payload and convert it to [`BookFields`]. A body `isbn` is ignored.
    pub fn parse_update(&self, candidate: Value) -> Result<BookFields, BookError> {
        self.validate(&candidate, Direction::Update)?;
        typed(candidate)
    }
}

fn compile(schema: &Value) -> anyhow::Result<JSONSchema> {
    JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(schema)
        .map_err(|e| anyhow!("invalid book schema: {}", e))
}

/// Schema-valid integers can still overflow `i32`, so this can fail too.
fn typed<T: DeserializeOwned>(candidate: Value) -> Result<T, BookError> {
    serde_json::from_value(candidate).map_err(|e| BookError::Validation(vec![e.to_string()]))
}
