//! Reply shapes and placeholder reply synthesis.
//!
//! A [`ReplySchema`] is the part of a service description needed to fabricate a
//! plausible reply for a method nobody scripted an answer for.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum ReplySchema {
    /// A structured type. A child that is itself a sequence contributes its elements
    /// directly.
    Complex {
        name: String,
        children: Vec<ReplySchema>,
    },
    /// An ordered group of named elements.
    Sequence {
        name: String,
        elements: Vec<ReplySchema>,
    },
    Basic {
        name: String,
        kind: BasicKind,
        default: Option<Value>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BasicKind {
    Int,
    String,
    Other(String),
}

impl ReplySchema {
    pub fn name(&self) -> &str {
        match self {
            ReplySchema::Complex { name, .. }
            | ReplySchema::Sequence { name, .. }
            | ReplySchema::Basic { name, .. } => name,
        }
    }

    pub fn int(name: impl Into<String>) -> Self {
        ReplySchema::Basic {
            name: name.into(),
            kind: BasicKind::Int,
            default: None,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        ReplySchema::Basic {
            name: name.into(),
            kind: BasicKind::String,
            default: None,
        }
    }
}

/// Fabricates placeholder replies.
///
/// Integers without a declared default get consecutive numbers and strings get
/// `"??? n ???"`, both drawn from one counter owned by the generator.
#[derive(Debug, Default)]
pub struct DefaultReplies {
    counter: AtomicU64,
}

impl DefaultReplies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generate(&self, schema: &ReplySchema) -> Value {
        match schema {
            ReplySchema::Complex { children, .. } => {
                let mut object = Map::new();
                for child in children {
                    match child {
                        ReplySchema::Sequence { elements, .. } => {
                            self.fill_sequence(elements, &mut object)
                        }
                        other => {
                            object.insert(other.name().to_string(), self.generate(other));
                        }
                    }
                }
                Value::Object(object)
            }
            ReplySchema::Sequence { elements, .. } => {
                let mut object = Map::new();
                self.fill_sequence(elements, &mut object);
                Value::Object(object)
            }
            ReplySchema::Basic { kind, default, .. } => self.basic(kind, default.as_ref()),
        }
    }

    fn fill_sequence(&self, elements: &[ReplySchema], target: &mut Map<String, Value>) {
        for element in elements {
            target.insert(element.name().to_string(), self.generate(element));
        }
    }

    fn basic(&self, kind: &BasicKind, default: Option<&Value>) -> Value {
        if let Some(default) = default {
            return default.clone();
        }
        match kind {
            BasicKind::Int => Value::from(self.next()),
            BasicKind::String => Value::from(format!("??? {} ???", self.next())),
            BasicKind::Other(_) => Value::from("???"),
        }
    }

    fn next(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed) + 1
    }
}
