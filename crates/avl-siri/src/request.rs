// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Builders for the outbound SIRI subscription envelopes.
//!
//! Two messages are sent to producers: `SubscriptionRequest` to establish a
//! vehicle-monitoring subscription and `TerminateSubscriptionRequest` to tear
//! one down. Both are rendered as SIRI v2.0 XML with the namespace declared
//! on the root element. All caller-supplied text is escaped before it is
//! placed into the document.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::{SIRI_NAMESPACE, SIRI_VERSION};

/// Requester identity sent on the wire when a subscription carries no
/// override of its own.
pub const DEFAULT_REQUESTOR_REF: &str = "BODS";

/// Heartbeat interval demanded from producers (ISO 8601 duration).
///
/// The health monitor's stale deadline is derived from this cadence, so the
/// two must move together.
pub const HEARTBEAT_INTERVAL: &str = "PT30S";

/// Outbound `SubscriptionRequest` envelope.
///
/// Establishes (or re-establishes) a vehicle-monitoring subscription with a
/// producer. The consumer address given to the producer is
/// `{callback_base_url}/{subscription_id}`, so inbound pushes identify the
/// subscription they belong to by path.
#[derive(Debug, Clone)]
pub struct SubscriptionRequest {
    /// Stable subscription identifier, sent as `SubscriptionIdentifier`.
    pub subscription_id: String,
    /// Timestamp of this request.
    pub request_timestamp: DateTime<Utc>,
    /// Wire-level expiry the producer is told to honor.
    pub initial_termination_time: DateTime<Utc>,
    /// Unique identifier for this message.
    pub message_identifier: String,
    /// Base URL the producer should push data and heartbeats to.
    pub callback_base_url: String,
    /// Requester identity, normally [`DEFAULT_REQUESTOR_REF`].
    pub requestor_ref: String,
}

impl SubscriptionRequest {
    /// Render the envelope as a SIRI v2.0 XML document.
    pub fn to_xml(&self) -> String {
        let timestamp = format_timestamp(self.request_timestamp);
        let consumer_address = format!(
            "{}/{}",
            self.callback_base_url.trim_end_matches('/'),
            self.subscription_id
        );
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<Siri version="{version}" xmlns="{namespace}">
  <SubscriptionRequest>
    <RequestTimestamp>{timestamp}</RequestTimestamp>
    <ConsumerAddress>{consumer_address}</ConsumerAddress>
    <RequestorRef>{requestor_ref}</RequestorRef>
    <MessageIdentifier>{message_identifier}</MessageIdentifier>
    <SubscriptionContext>
      <HeartbeatInterval>{heartbeat_interval}</HeartbeatInterval>
    </SubscriptionContext>
    <VehicleMonitoringSubscriptionRequest>
      <SubscriptionIdentifier>{subscription_id}</SubscriptionIdentifier>
      <InitialTerminationTime>{termination_time}</InitialTerminationTime>
      <VehicleMonitoringRequest version="{version}">
        <RequestTimestamp>{timestamp}</RequestTimestamp>
      </VehicleMonitoringRequest>
    </VehicleMonitoringSubscriptionRequest>
  </SubscriptionRequest>
</Siri>
"#,
            version = SIRI_VERSION,
            namespace = SIRI_NAMESPACE,
            timestamp = timestamp,
            consumer_address = escape_xml(&consumer_address),
            requestor_ref = escape_xml(&self.requestor_ref),
            message_identifier = escape_xml(&self.message_identifier),
            heartbeat_interval = HEARTBEAT_INTERVAL,
            subscription_id = escape_xml(&self.subscription_id),
            termination_time = format_timestamp(self.initial_termination_time),
        )
    }
}

/// Outbound `TerminateSubscriptionRequest` envelope.
#[derive(Debug, Clone)]
pub struct TerminateSubscriptionRequest {
    /// Subscription to terminate, sent as `SubscriptionRef`.
    pub subscription_id: String,
    /// Timestamp of this request.
    pub request_timestamp: DateTime<Utc>,
    /// Unique identifier for this message.
    pub message_identifier: String,
    /// Requester identity, normally [`DEFAULT_REQUESTOR_REF`].
    pub requestor_ref: String,
}

impl TerminateSubscriptionRequest {
    /// Render the envelope as a SIRI v2.0 XML document.
    pub fn to_xml(&self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<Siri version="{version}" xmlns="{namespace}">
  <TerminateSubscriptionRequest>
    <RequestTimestamp>{timestamp}</RequestTimestamp>
    <RequestorRef>{requestor_ref}</RequestorRef>
    <MessageIdentifier>{message_identifier}</MessageIdentifier>
    <SubscriptionRef>{subscription_id}</SubscriptionRef>
  </TerminateSubscriptionRequest>
</Siri>
"#,
            version = SIRI_VERSION,
            namespace = SIRI_NAMESPACE,
            timestamp = format_timestamp(self.request_timestamp),
            requestor_ref = escape_xml(&self.requestor_ref),
            message_identifier = escape_xml(&self.message_identifier),
            subscription_id = escape_xml(&self.subscription_id),
        )
    }
}

/// Render a timestamp the way SIRI expects it (RFC 3339, millisecond
/// precision, `Z` suffix).
fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Escape text for placement inside XML element content or attributes.
fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn request_fixture() -> SubscriptionRequest {
        SubscriptionRequest {
            subscription_id: "sub-42".to_string(),
            request_timestamp: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
            initial_termination_time: Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap(),
            message_identifier: "msg-1".to_string(),
            callback_base_url: "https://ingest.example.com/avl".to_string(),
            requestor_ref: DEFAULT_REQUESTOR_REF.to_string(),
        }
    }

    fn find_text<'a>(doc: &'a roxmltree::Document, name: &str) -> Option<&'a str> {
        doc.descendants()
            .find(|n| n.tag_name().name() == name)
            .and_then(|n| n.text())
    }

    #[test]
    fn test_subscription_request_shape() {
        let xml = request_fixture().to_xml();
        let doc = roxmltree::Document::parse(&xml).unwrap();

        let root = doc.root_element();
        assert_eq!(root.tag_name().name(), "Siri");
        assert_eq!(root.tag_name().namespace(), Some(SIRI_NAMESPACE));
        assert_eq!(root.attribute("version"), Some("2.0"));

        assert_eq!(find_text(&doc, "SubscriptionIdentifier"), Some("sub-42"));
        assert_eq!(find_text(&doc, "RequestorRef"), Some("BODS"));
        assert_eq!(find_text(&doc, "MessageIdentifier"), Some("msg-1"));
        assert_eq!(find_text(&doc, "HeartbeatInterval"), Some("PT30S"));
        assert_eq!(
            find_text(&doc, "RequestTimestamp"),
            Some("2026-03-01T12:00:00.000Z")
        );
        assert_eq!(
            find_text(&doc, "InitialTerminationTime"),
            Some("2026-03-02T12:00:00.000Z")
        );

        let vm_request = doc
            .descendants()
            .find(|n| n.tag_name().name() == "VehicleMonitoringRequest")
            .unwrap();
        assert_eq!(vm_request.attribute("version"), Some("2.0"));
    }

    #[test]
    fn test_consumer_address_joins_base_url_and_id() {
        let xml = request_fixture().to_xml();
        let doc = roxmltree::Document::parse(&xml).unwrap();
        assert_eq!(
            find_text(&doc, "ConsumerAddress"),
            Some("https://ingest.example.com/avl/sub-42")
        );

        // A trailing slash on the base URL must not produce a double slash.
        let mut request = request_fixture();
        request.callback_base_url = "https://ingest.example.com/avl/".to_string();
        let xml = request.to_xml();
        let doc = roxmltree::Document::parse(&xml).unwrap();
        assert_eq!(
            find_text(&doc, "ConsumerAddress"),
            Some("https://ingest.example.com/avl/sub-42")
        );
    }

    #[test]
    fn test_special_characters_are_escaped() {
        let mut request = request_fixture();
        request.subscription_id = "a&b<c>".to_string();
        let xml = request.to_xml();

        // Output must still parse, and the identifier must round-trip.
        let doc = roxmltree::Document::parse(&xml).unwrap();
        assert_eq!(find_text(&doc, "SubscriptionIdentifier"), Some("a&b<c>"));
    }

    #[test]
    fn test_terminate_request_shape() {
        let request = TerminateSubscriptionRequest {
            subscription_id: "sub-42".to_string(),
            request_timestamp: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
            message_identifier: "msg-2".to_string(),
            requestor_ref: DEFAULT_REQUESTOR_REF.to_string(),
        };
        let xml = request.to_xml();
        let doc = roxmltree::Document::parse(&xml).unwrap();

        let root = doc.root_element();
        assert_eq!(root.tag_name().namespace(), Some(SIRI_NAMESPACE));
        let terminate = doc
            .descendants()
            .find(|n| n.tag_name().name() == "TerminateSubscriptionRequest")
            .unwrap();
        assert!(terminate.children().any(|n| n.tag_name().name() == "SubscriptionRef"));
        assert_eq!(find_text(&doc, "SubscriptionRef"), Some("sub-42"));
        assert_eq!(find_text(&doc, "MessageIdentifier"), Some("msg-2"));
    }
}
