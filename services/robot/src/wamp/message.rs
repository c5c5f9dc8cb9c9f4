//! WAMP v2 messages in the JSON serialization.
//!
//! Every message is a JSON array whose first element is the message type code.
//! Only the subset needed by a caller/subscriber client is modelled.

use super::WampError;
use serde_json::{Map, Value, json};

pub type Dict = Map<String, Value>;

pub const HELLO: u64 = 1;
pub const WELCOME: u64 = 2;
pub const ABORT: u64 = 3;
pub const GOODBYE: u64 = 6;
pub const ERROR: u64 = 8;
pub const SUBSCRIBE: u64 = 32;
pub const SUBSCRIBED: u64 = 33;
pub const EVENT: u64 = 36;
pub const CALL: u64 = 48;
pub const RESULT: u64 = 50;

#[derive(Debug, Clone, PartialEq)]
pub enum WampMessage {
    Hello { realm: String, details: Dict },
    Welcome { session: u64, details: Dict },
    Abort { details: Dict, reason: String },
    Goodbye { details: Dict, reason: String },
    Error {
        request_type: u64,
        request: u64,
        details: Dict,
        error: String,
        args: Vec<Value>,
        kwargs: Dict,
    },
    Subscribe { request: u64, options: Dict, topic: String },
    Subscribed { request: u64, subscription: u64 },
    Event {
        subscription: u64,
        publication: u64,
        details: Dict,
        args: Vec<Value>,
        kwargs: Dict,
    },
    Call {
        request: u64,
        options: Dict,
        procedure: String,
        args: Vec<Value>,
        kwargs: Dict,
    },
    Result {
        request: u64,
        details: Dict,
        args: Vec<Value>,
        kwargs: Dict,
    },
}

impl WampMessage {
    /// Encodes this message as its JSON array form.
    pub fn to_value(&self) -> Value {
        match self {
            WampMessage::Hello { realm, details } => json!([HELLO, realm, details]),
            WampMessage::Welcome { session, details } => json!([WELCOME, session, details]),
            WampMessage::Abort { details, reason } => json!([ABORT, details, reason]),
            WampMessage::Goodbye { details, reason } => json!([GOODBYE, details, reason]),
            WampMessage::Error { request_type, request, details, error, args, kwargs } => {
                json!([ERROR, request_type, request, details, error, args, kwargs])
            }
            WampMessage::Subscribe { request, options, topic } => {
                json!([SUBSCRIBE, request, options, topic])
            }
            WampMessage::Subscribed { request, subscription } => {
                json!([SUBSCRIBED, request, subscription])
            }
            WampMessage::Event { subscription, publication, details, args, kwargs } => {
                json!([EVENT, subscription, publication, details, args, kwargs])
            }
            WampMessage::Call { request, options, procedure, args, kwargs } => {
                json!([CALL, request, options, procedure, args, kwargs])
            }
            WampMessage::Result { request, details, args, kwargs } => {
                json!([RESULT, request, details, args, kwargs])
            }
        }
    }

    pub fn to_text(&self) -> String {
        self.to_value().to_string()
    }

    /// Decodes a received text frame.
    pub fn parse(text: &str) -> Result<Self, WampError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| WampError::Protocol(format!("invalid JSON: {e}")))?;
        let Value::Array(items) = value else {
            return Err(WampError::Protocol("message is not an array".to_string()));
        };
        let fields = Fields(&items);
        let code = fields.id(0)?;

        let message = match code {
            HELLO => WampMessage::Hello { realm: fields.string(1)?, details: fields.dict(2)? },
            WELCOME => WampMessage::Welcome { session: fields.id(1)?, details: fields.dict(2)? },
            ABORT => WampMessage::Abort { details: fields.dict(1)?, reason: fields.string(2)? },
            GOODBYE => WampMessage::Goodbye { details: fields.dict(1)?, reason: fields.string(2)? },
            ERROR => WampMessage::Error {
                request_type: fields.id(1)?,
                request: fields.id(2)?,
                details: fields.dict(3)?,
                error: fields.string(4)?,
                args: fields.list_or_empty(5)?,
                kwargs: fields.dict_or_empty(6)?,
            },
            SUBSCRIBE => WampMessage::Subscribe {
                request: fields.id(1)?,
                options: fields.dict(2)?,
                topic: fields.string(3)?,
            },
            SUBSCRIBED => WampMessage::Subscribed {
                request: fields.id(1)?,
                subscription: fields.id(2)?,
            },
            EVENT => WampMessage::Event {
                subscription: fields.id(1)?,
                publication: fields.id(2)?,
                details: fields.dict(3)?,
                args: fields.list_or_empty(4)?,
                kwargs: fields.dict_or_empty(5)?,
            },
            CALL => WampMessage::Call {
                request: fields.id(1)?,
                options: fields.dict(2)?,
                procedure: fields.string(3)?,
                args: fields.list_or_empty(4)?,
                kwargs: fields.dict_or_empty(5)?,
            },
            RESULT => WampMessage::Result {
                request: fields.id(1)?,
                details: fields.dict(2)?,
                args: fields.list_or_empty(3)?,
                kwargs: fields.dict_or_empty(4)?,
            },
            other => return Err(WampError::Protocol(format!("unsupported message type {other}"))),
        };
        Ok(message)
    }
}

struct Fields<'a>(&'a [Value]);

impl Fields<'_> {
    fn get(&self, idx: usize) -> Result<&Value, WampError> {
        self.0
            .get(idx)
            .ok_or_else(|| WampError::Protocol(format!("missing field {idx}")))
    }

    fn id(&self, idx: usize) -> Result<u64, WampError> {
        self.get(idx)?
            .as_u64()
            .ok_or_else(|| WampError::Protocol(format!("field {idx} is not an id")))
    }

    fn string(&self, idx: usize) -> Result<String, WampError> {
        self.get(idx)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| WampError::Protocol(format!("field {idx} is not a string")))
    }

    fn dict(&self, idx: usize) -> Result<Dict, WampError> {
        self.get(idx)?
            .as_object()
            .cloned()
            .ok_or_else(|| WampError::Protocol(format!("field {idx} is not a dict")))
    }

    fn list_or_empty(&self, idx: usize) -> Result<Vec<Value>, WampError> {
        match self.0.get(idx) {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => Ok(items.clone()),
            Some(_) => Err(WampError::Protocol(format!("field {idx} is not a list"))),
        }
    }

    fn dict_or_empty(&self, idx: usize) -> Result<Dict, WampError> {
        match self.0.get(idx) {
            None => Ok(Dict::new()),
            Some(Value::Object(map)) => Ok(map.clone()),
            Some(_) => Err(WampError::Protocol(format!("field {idx} is not a dict"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_encoding() {
        let mut kwargs = Dict::new();
        kwargs.insert("text".into(), json!("Hello there!"));
        let call = WampMessage::Call {
            request: 7,
            options: Dict::new(),
            procedure: "rie.dialogue.say".into(),
            args: vec![],
            kwargs,
        };
        assert_eq!(
            call.to_text(),
            r#"[48,7,{},"rie.dialogue.say",[],{"text":"Hello there!"}]"#
        );
    }

    #[test]
    fn test_parse_welcome() {
        let msg = WampMessage::parse(r#"[2, 9129137332, {"roles": {"broker": {}}}]"#).unwrap();
        match msg {
            WampMessage::Welcome { session, details } => {
                assert_eq!(session, 9129137332);
                assert!(details.contains_key("roles"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_result_without_payload() {
        let msg = WampMessage::parse("[50, 3, {}]").unwrap();
        assert_eq!(
            msg,
            WampMessage::Result { request: 3, details: Dict::new(), args: vec![], kwargs: Dict::new() }
        );
    }

    #[test]
    fn test_parse_error_with_args() {
        let msg = WampMessage::parse(
            r#"[8, 48, 5, {}, "wamp.error.no_such_procedure", ["not registered"]]"#,
        )
        .unwrap();
        match msg {
            WampMessage::Error { request_type, request, error, args, .. } => {
                assert_eq!(request_type, CALL);
                assert_eq!(request, 5);
                assert_eq!(error, "wamp.error.no_such_procedure");
                assert_eq!(args, vec![json!("not registered")]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_event_with_kwargs() {
        let msg = WampMessage::parse(r#"[36, 11, 22, {}, [], {"text": "yes"}]"#).unwrap();
        match msg {
            WampMessage::Event { subscription, kwargs, .. } => {
                assert_eq!(subscription, 11);
                assert_eq!(kwargs.get("text"), Some(&json!("yes")));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(WampMessage::parse("{}").is_err());
        assert!(WampMessage::parse("[]").is_err());
        assert!(WampMessage::parse("[99, 1]").is_err());
        assert!(WampMessage::parse(r#"[33, "x", 1]"#).is_err());
        assert!(WampMessage::parse("not json").is_err());
    }
}
