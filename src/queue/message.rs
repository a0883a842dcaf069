//! Queue-agnostic message representation borrowed from the source queue for the
//! duration of one transfer attempt.

use std::collections::HashMap;

/// Typed message attribute value carried alongside a message body.
///
/// Mirrors the SQS attribute shape (`String`, `Number`, `Binary` data types plus
/// optional custom suffixes) so attributes survive a forward unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeValue {
    pub data_type: String,
    pub string_value: Option<String>,
    pub binary_value: Option<Vec<u8>>,
}

impl AttributeValue {
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            data_type: "String".to_owned(),
            string_value: Some(value.into()),
            binary_value: None,
        }
    }

    pub fn number(value: impl ToString) -> Self {
        Self {
            data_type: "Number".to_owned(),
            string_value: Some(value.to_string()),
            binary_value: None,
        }
    }

    pub fn binary(value: impl Into<Vec<u8>>) -> Self {
        Self {
            data_type: "Binary".to_owned(),
            string_value: None,
            binary_value: Some(value.into()),
        }
    }
}

pub type MessageAttributes = HashMap<String, AttributeValue>;

/// One delivery of a message fetched from a queue.
///
/// Identity for acknowledgment is the receipt handle, not the body: the same body
/// may be delivered several times with different receipt handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub message_id: Option<String>,
    pub body: String,
    pub attributes: MessageAttributes,
    pub receipt_handle: String,
}

impl Message {
    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn receipt_handle(&self) -> &str {
        &self.receipt_handle
    }
}
