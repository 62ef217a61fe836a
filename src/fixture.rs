use crate::value::Value;
use std::collections::HashMap;
use std::error::Error as StdError;
use thiserror::Error;

/// The reserved fixture key that receives the normalized textual content of
/// the current command's element before the command runs.
pub const TEXT_KEY: &str = "TEXT";

/// An error raised by fixture code.
///
/// These are never fatal: the engine converts them into exception decorations
/// on the document and keeps going.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct FixtureError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl FixtureError {
    pub fn new(message: impl Into<String>) -> Self {
        FixtureError {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        FixtureError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn no_such_method(name: &str) -> Self {
        FixtureError::new(format!("fixture has no method named {name:?}"))
    }
}

/// The capability interface through which the engine touches test state.
///
/// The engine only ever accesses a fixture by name: reading and writing
/// attributes, and invoking methods named by expressions. [`TEXT_KEY`] is
/// written before every command execution.
pub trait Fixture {
    fn get(&self, name: &str) -> Option<Value>;
    fn set(&mut self, name: &str, value: Value);
    fn call(&mut self, name: &str, args: &[Value]) -> Result<Value, FixtureError>;
}

type Method = Box<dyn FnMut(&[Value]) -> Result<Value, FixtureError>>;

/// A hash-map fixture: named variables plus registered methods.
///
/// Suits tests and hosts that don't want to hand-implement [`Fixture`]:
///
/// ```
/// use exemplar::{MapFixture, Value};
///
/// let fixture = MapFixture::new()
///     .var("greeting", "hello")
///     .method("shout", |args| match args {
///         [Value::Str(s)] => Ok(Value::Str(s.to_uppercase())),
///         _ => Err(exemplar::FixtureError::new("shout takes one string")),
///     });
/// ```
#[derive(Default)]
pub struct MapFixture {
    vars: HashMap<String, Value>,
    methods: HashMap<String, Method>,
}

impl MapFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn var(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn method(
        mut self,
        name: impl Into<String>,
        method: impl FnMut(&[Value]) -> Result<Value, FixtureError> + 'static,
    ) -> Self {
        self.methods.insert(name.into(), Box::new(method));
        self
    }
}

impl Fixture for MapFixture {
    fn get(&self, name: &str) -> Option<Value> {
        self.vars.get(name).cloned()
    }

    fn set(&mut self, name: &str, value: Value) {
        self.vars.insert(name.to_owned(), value);
    }

    fn call(&mut self, name: &str, args: &[Value]) -> Result<Value, FixtureError> {
        match self.methods.get_mut(name) {
            Some(method) => method(args),
            None => Err(FixtureError::no_such_method(name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variables() {
        let mut fixture = MapFixture::new().var("a", 1);
        assert_eq!(fixture.get("a"), Some(Value::Int(1)));
        assert_eq!(fixture.get("b"), None);

        fixture.set("b", Value::from("two"));
        assert_eq!(fixture.get("b"), Some(Value::from("two")));
    }

    #[test]
    fn methods() {
        let mut fixture = MapFixture::new().method("double", |args| match args {
            [Value::Int(i)] => Ok(Value::Int(i * 2)),
            _ => Err(FixtureError::new("double takes one integer")),
        });

        assert_eq!(
            fixture.call("double", &[Value::Int(21)]).unwrap(),
            Value::Int(42)
        );
        assert!(fixture.call("halve", &[]).is_err());
    }
}
