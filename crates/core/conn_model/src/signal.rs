use crate::connection::DittoHeaders;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;

/// Protocol-agnostic representation of wire bytes with headers, as produced by a [Source] and
/// consumed by a [Target](crate::connection::Target) publisher.
///
/// [Source]: crate::connection::Source
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExternalMessage {
    pub headers: BTreeMap<String, String>,
    pub payload: ExternalPayload,
}

/// The body of an [ExternalMessage]: either text or raw bytes, matching the two shapes the
/// HTTP-push specialization (§4.5) must distinguish when choosing how to build the request
/// entity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ExternalPayload {
    Text(String),
    Bytes(Vec<u8>),
}

impl ExternalMessage {
    pub fn is_text_message(&self) -> bool {
        matches!(self.payload, ExternalPayload::Text(_))
    }

    /// The `Content-Type` header, extracted separately from the rest of the headers so it can
    /// be attached to the HTTP entity instead of duplicated as a plain header.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
            .map(|(_, v)| v.as_str())
    }

    /// All headers except `Content-Type`.
    pub fn headers_without_content_type(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .filter(|(k, _)| !k.eq_ignore_ascii_case("content-type"))
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// The signal being published: either a plain event/acknowledgement passthrough, or a message
/// command expecting a typed response once the publish completes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Signal {
    /// A signal with no response expected beyond the delivery acknowledgement itself.
    Event { ditto_headers: DittoHeaders },

    /// A `SendThing`/`SendFeature`/`SendClaim`-style message command: the publisher must also
    /// synthesize a matching `*MessageResponse` from the HTTP response, on top of the ack.
    MessageCommand {
        ditto_headers: DittoHeaders,
        entity_id: String,
    },
}

impl Signal {
    pub fn ditto_headers(&self) -> &DittoHeaders {
        match self {
            Signal::Event { ditto_headers } => ditto_headers,
            Signal::MessageCommand { ditto_headers, .. } => ditto_headers,
        }
    }

    pub fn is_message_command(&self) -> bool {
        matches!(self, Signal::MessageCommand { .. })
    }
}

/// Where to deliver the acknowledgement label requested by the originator of a signal, if any.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AutoAckTarget {
    pub label: String,
}

/// The sentinel label used when no [AutoAckTarget] was configured: this acknowledgement exists
/// only to surface delivery success/failure, not to satisfy a user-requested ack.
pub const DIAGNOSTIC_ACK_LABEL: &str = "ditto-http-diagnostic";

/// A protocol-specific address derived from a [Target](crate::connection::Target), the
/// concrete destination a publish is aimed at.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PublishTarget {
    pub address: String,
}

/// A typed receipt carrying label, entity id, HTTP-style status code, headers and payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Acknowledgement {
    pub label: String,
    pub entity_id: Option<String>,
    pub status_code: u16,
    pub ditto_headers: DittoHeaders,
    pub payload: serde_json::Value,
}

/// The matching `Send{Thing,Feature,Claim}MessageResponse` built alongside an
/// [Acknowledgement] when the originating [Signal] was a `MessageCommand`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MessageCommandResponse {
    pub entity_id: String,
    pub status_code: u16,
    pub ditto_headers: DittoHeaders,
    pub payload: serde_json::Value,
}

/// The outcome of one `publish` call: an acknowledgement, plus an optional matching
/// `MessageCommandResponse` when the original signal was a message command.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommandResponseOrAck {
    pub command_response: Option<MessageCommandResponse>,
    pub acknowledgement: Acknowledgement,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_is_extracted_separately_from_other_headers() {
        let message = ExternalMessage {
            headers: BTreeMap::from([
                ("Content-Type".to_string(), "application/json".to_string()),
                ("X-Correlation-Id".to_string(), "abc".to_string()),
            ]),
            payload: ExternalPayload::Text("{}".to_string()),
        };

        assert_eq!(message.content_type(), Some("application/json"));
        let remaining: Vec<_> = message.headers_without_content_type().collect();
        assert_eq!(remaining, vec![("X-Correlation-Id", "abc")]);
    }

    #[test]
    fn event_signals_have_no_entity_id() {
        let signal = Signal::Event {
            ditto_headers: DittoHeaders::new(),
        };
        assert!(!signal.is_message_command());
    }
}
