use crate::schema::ReplySchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use snare_http::HttpResponse;
use std::sync::Arc;

/// A decoded RPC request body: the invoked method and its named arguments, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub method: String,
    pub arguments: Vec<(String, Value)>,
}

impl Envelope {
    pub fn argument_names(&self) -> Vec<&str> {
        self.arguments.iter().map(|(name, _)| name.as_str()).collect()
    }
}

/// Identifies one concrete method of a service, overloads included.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodHandle {
    pub method: String,
    pub overload: usize,
}

impl MethodHandle {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            overload: 0,
        }
    }

    pub fn overload(method: impl Into<String>, overload: usize) -> Self {
        Self {
            method: method.into(),
            overload,
        }
    }
}

/// What an RPC sub-flow evaluates: a resolved method call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcCall {
    pub handle: MethodHandle,
    pub arguments: Vec<(String, Value)>,
    /// Reply shape of the resolved method, when the service describes one.
    #[serde(skip)]
    pub reply_schema: Option<Arc<ReplySchema>>,
}

impl RpcCall {
    pub fn new(handle: MethodHandle, arguments: Vec<(String, Value)>) -> Self {
        Self {
            handle,
            arguments,
            reply_schema: None,
        }
    }

    pub fn with_reply_schema(mut self, schema: Option<ReplySchema>) -> Self {
        self.reply_schema = schema.map(Arc::new);
        self
    }

    pub fn method(&self) -> &str {
        &self.handle.method
    }

    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.arguments
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }

    /// Arguments as a record, the shape call patterns are matched against.
    ///
    /// A name sent more than once becomes a sequence of its values in the order sent.
    pub fn arguments_value(&self) -> Value {
        let mut fields = Map::new();
        let mut repeated: Vec<&str> = Vec::new();
        for (name, value) in &self.arguments {
            match fields.get_mut(name) {
                None => {
                    fields.insert(name.clone(), value.clone());
                }
                Some(existing) => {
                    if !repeated.contains(&name.as_str()) {
                        repeated.push(name);
                        *existing = Value::Array(vec![existing.take()]);
                    }
                    if let Value::Array(items) = existing {
                        items.push(value.clone());
                    }
                }
            }
        }
        Value::Object(fields)
    }
}

/// What an RPC sub-flow answers.
#[derive(Debug, Clone)]
pub enum RpcResponse {
    /// A structured reply, encoded by the RPC transform.
    Reply(Value),
    /// A complete HTTP response, returned to the client unchanged.
    Raw(HttpResponse),
}

impl From<Value> for RpcResponse {
    fn from(value: Value) -> Self {
        RpcResponse::Reply(value)
    }
}

impl From<HttpResponse> for RpcResponse {
    fn from(response: HttpResponse) -> Self {
        RpcResponse::Raw(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_arguments_value_keeps_names() {
        let call = RpcCall::new(
            MethodHandle::new("GetQuote"),
            vec![("symbol".into(), json!("ACME")), ("depth".into(), json!(2))],
        );
        assert_eq!(call.method(), "GetQuote");
        assert_eq!(call.argument("depth"), Some(&json!(2)));
        assert_eq!(call.argument("missing"), None);
        assert_eq!(call.arguments_value(), json!({"symbol": "ACME", "depth": 2}));
    }

    #[test]
    fn test_repeated_arguments_become_a_sequence() {
        let call = RpcCall::new(
            MethodHandle::new("Tag"),
            vec![
                ("item".into(), json!("a")),
                ("owner".into(), json!("ops")),
                ("item".into(), json!("b")),
                ("item".into(), json!(["c"])),
            ],
        );
        assert_eq!(
            call.arguments_value(),
            json!({"item": ["a", "b", ["c"]], "owner": "ops"})
        );
        assert_eq!(call.argument("item"), Some(&json!("a")));
    }
}
