//! Application events carried by EVENT packets
//!
//! An EVENT payload is a JSON array whose first element is the event name and
//! whose optional second element is the argument:
//!
//! ```text
//! ["chat"]                      -> name "chat", no argument
//! ["chat", "hello"]             -> name "chat", argument "hello"
//! ["chat", {"text": "hello"}]   -> name "chat", argument {"text": "hello"}
//! ```
//!
//! Only strings and objects are accepted as arguments. Anything else (numbers,
//! arrays, booleans, null, extra elements) is rejected with
//! [`Error::InvalidEventPayload`].

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named application event with an optional argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocketEvent {
    /// Event name, used to look up handlers
    pub name: String,
    /// Optional event argument
    #[serde(skip_serializing_if = "Option::is_none")]
    pub argument: Option<Value>,
}

impl SocketEvent {
    /// Create an event without an argument
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            argument: None,
        }
    }

    /// Create an event carrying an argument
    pub fn with_argument(name: impl Into<String>, argument: Value) -> Self {
        Self {
            name: name.into(),
            argument: Some(argument),
        }
    }

    /// Build the wire payload array (`[name]` or `[name, argument]`)
    pub fn to_payload(&self) -> Value {
        match &self.argument {
            Some(argument) => {
                Value::Array(vec![Value::String(self.name.clone()), argument.clone()])
            }
            None => Value::Array(vec![Value::String(self.name.clone())]),
        }
    }
}

/// Extract a [`SocketEvent`] from a decoded EVENT payload
///
/// # Errors
///
/// Returns `Error::InvalidEventPayload` when the payload is not an array of
/// one or two elements, when the first element is not a string, or when the
/// second element is neither an object nor a string.
///
/// # Examples
///
/// ```rust
/// use sockio_core::event::parse_event;
/// use serde_json::json;
///
/// let event = parse_event(&json!(["foo", "bar"])).unwrap();
/// assert_eq!(event.name, "foo");
/// assert_eq!(event.argument, Some(json!("bar")));
///
/// assert!(parse_event(&json!(["foo", 42])).is_err());
/// ```
pub fn parse_event(payload: &Value) -> Result<SocketEvent> {
    let items = payload
        .as_array()
        .ok_or_else(|| Error::InvalidEventPayload(format!("expected an array, got {}", payload)))?;

    let name = match items.first() {
        Some(Value::String(name)) => name.clone(),
        Some(other) => {
            return Err(Error::InvalidEventPayload(format!(
                "event name must be a string, got {}",
                other
            )))
        }
        None => return Err(Error::InvalidEventPayload("empty event array".to_string())),
    };

    match items.len() {
        1 => Ok(SocketEvent::new(name)),
        2 => match &items[1] {
            argument @ (Value::Object(_) | Value::String(_)) => {
                Ok(SocketEvent::with_argument(name, argument.clone()))
            }
            other => Err(Error::InvalidEventPayload(format!(
                "argument of '{}' must be an object or string, got {}",
                name, other
            ))),
        },
        n => Err(Error::InvalidEventPayload(format!(
            "expected 1 or 2 elements, got {}",
            n
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_name_only() {
        let event = parse_event(&json!(["foo"])).unwrap();
        assert_eq!(event, SocketEvent::new("foo"));
        assert!(event.argument.is_none());
    }

    #[test]
    fn test_string_argument() {
        let event = parse_event(&json!(["foo", "bar"])).unwrap();
        assert_eq!(event.name, "foo");
        assert_eq!(event.argument, Some(json!("bar")));
    }

    #[test]
    fn test_object_argument() {
        let event = parse_event(&json!(["move", {"x": 1, "y": 2}])).unwrap();
        assert_eq!(event.argument, Some(json!({"x": 1, "y": 2})));
    }

    #[test]
    fn test_rejects_non_string_non_object_argument() {
        for argument in [json!(42), json!([1, 2]), json!(true), json!(null)] {
            let result = parse_event(&json!(["foo", argument]));
            assert!(matches!(result, Err(Error::InvalidEventPayload(_))));
        }
    }

    #[test]
    fn test_rejects_bad_shapes() {
        assert!(matches!(parse_event(&json!({"name": "foo"})), Err(Error::InvalidEventPayload(_))));
        assert!(matches!(parse_event(&json!([])), Err(Error::InvalidEventPayload(_))));
        assert!(matches!(parse_event(&json!(["a", "b", "c"])), Err(Error::InvalidEventPayload(_))));
        assert!(matches!(parse_event(&json!([1, "b"])), Err(Error::InvalidEventPayload(_))));
        assert!(matches!(parse_event(&json!("foo")), Err(Error::InvalidEventPayload(_))));
    }

    #[test]
    fn test_to_payload() {
        assert_eq!(SocketEvent::new("a").to_payload(), json!(["a"]));
        assert_eq!(
            SocketEvent::with_argument("a", json!({"k": 1})).to_payload(),
            json!(["a", {"k": 1}])
        );
    }
}
