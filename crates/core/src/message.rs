//! Protocol messages exchanged between peers.

use serde::{Deserialize, Serialize};

/// A fork protocol message.
///
/// Messages carry no payload beyond their tag; the sender is known from the
/// link the message arrived on. Encoding on the wire is the transport's
/// concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ForkMessage {
    /// Ask the receiver to hand over the fork it shares with the sender.
    Request,

    /// Hand the shared fork over to the receiver.
    Grant,
}

impl ForkMessage {
    /// Get a human-readable name for this message type.
    pub fn type_name(&self) -> &'static str {
        match self {
            ForkMessage::Request => "Request",
            ForkMessage::Grant => "Grant",
        }
    }

    /// Check if this is a fork request.
    pub fn is_request(&self) -> bool {
        matches!(self, ForkMessage::Request)
    }

    /// Check if this is a fork grant.
    pub fn is_grant(&self) -> bool {
        matches!(self, ForkMessage::Grant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_kinds() {
        assert!(ForkMessage::Request.is_request());
        assert!(!ForkMessage::Request.is_grant());
        assert!(ForkMessage::Grant.is_grant());
        assert_eq!(ForkMessage::Grant.type_name(), "Grant");
    }

    #[test]
    fn test_message_serde() {
        let json = serde_json::to_string(&ForkMessage::Request).unwrap();
        assert_eq!(json, "\"Request\"");
        let back: ForkMessage = serde_json::from_str("\"Grant\"").unwrap();
        assert_eq!(back, ForkMessage::Grant);
    }
}
