// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Parsers for the inbound SIRI envelopes.
//!
//! Producers answer a `SubscriptionRequest` with a `SubscriptionResponse`
//! and a `TerminateSubscriptionRequest` with a
//! `TerminateSubscriptionResponse`; between data pushes they send
//! `HeartbeatNotification` envelopes to prove the feed is alive.
//!
//! Parsing is deliberately asymmetric: extra elements anywhere in the
//! document are ignored (producers add vendor extensions freely), but the
//! root must be a `Siri` element in the SIRI namespace and the status
//! element must be present and parseable. A producer response that cannot
//! be classified is an error, never an implicit success.

use chrono::{DateTime, Utc};
use roxmltree::{Document, Node};
use thiserror::Error;

use crate::SIRI_NAMESPACE;

/// Errors from parsing inbound SIRI envelopes.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The document is not well-formed XML.
    #[error("Malformed XML: {0}")]
    Malformed(#[from] roxmltree::Error),

    /// The root element is not `Siri` in the SIRI namespace.
    #[error("Unexpected root element: {0}")]
    UnexpectedRoot(String),

    /// An expected element is absent.
    #[error("Missing element: {0}")]
    MissingElement(&'static str),

    /// An expected element is present but carries no usable text.
    #[error("Empty element: {0}")]
    EmptyElement(&'static str),

    /// A status element carried something other than `true`/`false`.
    #[error("Invalid status value: {0:?}")]
    InvalidStatus(String),

    /// A timestamp element could not be parsed as RFC 3339.
    #[error("Invalid timestamp: {0:?}")]
    InvalidTimestamp(String),
}

/// Parsed `SubscriptionResponse`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionResponse {
    /// Whether the producer accepted the subscription.
    pub status: bool,
}

/// Parsed `TerminateSubscriptionResponse`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminateSubscriptionResponse {
    /// Whether the producer acknowledged the termination.
    pub status: bool,
}

/// Parsed `HeartbeatNotification`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatNotification {
    /// Identity of the producer sending the heartbeat.
    pub producer_ref: String,
    /// When the producer sent the heartbeat.
    pub request_timestamp: DateTime<Utc>,
}

/// Parse a producer's answer to a `SubscriptionRequest`.
///
/// Reads `Siri/SubscriptionResponse/ResponseStatus/Status`.
///
/// # Errors
///
/// Returns [`ParseError`] when the document is malformed, the root is not a
/// SIRI envelope, or the status element is missing or unparseable.
pub fn parse_subscription_response(xml: &str) -> Result<SubscriptionResponse, ParseError> {
    let doc = Document::parse(xml)?;
    let root = siri_root(&doc)?;
    let response = required_child(root, "SubscriptionResponse")?;
    let response_status = required_child(response, "ResponseStatus")?;
    let status = parse_status(required_child(response_status, "Status")?)?;
    Ok(SubscriptionResponse { status })
}

/// Parse a producer's answer to a `TerminateSubscriptionRequest`.
///
/// Reads `Siri/TerminateSubscriptionResponse/TerminationResponseStatus/Status`.
///
/// # Errors
///
/// Returns [`ParseError`] under the same conditions as
/// [`parse_subscription_response`].
pub fn parse_terminate_response(xml: &str) -> Result<TerminateSubscriptionResponse, ParseError> {
    let doc = Document::parse(xml)?;
    let root = siri_root(&doc)?;
    let response = required_child(root, "TerminateSubscriptionResponse")?;
    let response_status = required_child(response, "TerminationResponseStatus")?;
    let status = parse_status(required_child(response_status, "Status")?)?;
    Ok(TerminateSubscriptionResponse { status })
}

/// Parse a producer's `HeartbeatNotification`.
///
/// # Errors
///
/// Returns [`ParseError`] when the envelope, `ProducerRef`, or
/// `RequestTimestamp` is missing or invalid.
pub fn parse_heartbeat_notification(xml: &str) -> Result<HeartbeatNotification, ParseError> {
    let doc = Document::parse(xml)?;
    let root = siri_root(&doc)?;
    let notification = required_child(root, "HeartbeatNotification")?;

    let producer_ref = required_child(notification, "ProducerRef")?
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(ParseError::EmptyElement("ProducerRef"))?
        .to_string();

    let raw_timestamp = required_child(notification, "RequestTimestamp")?
        .text()
        .map(str::trim)
        .unwrap_or_default();
    let request_timestamp = DateTime::parse_from_rfc3339(raw_timestamp)
        .map_err(|_| ParseError::InvalidTimestamp(raw_timestamp.to_string()))?
        .with_timezone(&Utc);

    Ok(HeartbeatNotification {
        producer_ref,
        request_timestamp,
    })
}

/// Validate and return the `Siri` root element.
fn siri_root<'a, 'input>(doc: &'a Document<'input>) -> Result<Node<'a, 'input>, ParseError> {
    let root = doc.root_element();
    if root.tag_name().name() != "Siri" || root.tag_name().namespace() != Some(SIRI_NAMESPACE) {
        return Err(ParseError::UnexpectedRoot(root.tag_name().name().to_string()));
    }
    Ok(root)
}

/// Find a direct child element by local name.
///
/// Matching on local name only keeps the parser tolerant of producers that
/// declare the SIRI namespace with a prefix instead of as the default.
fn required_child<'a, 'input>(
    node: Node<'a, 'input>,
    name: &'static str,
) -> Result<Node<'a, 'input>, ParseError> {
    node.children()
        .filter(Node::is_element)
        .find(|n| n.tag_name().name() == name)
        .ok_or(ParseError::MissingElement(name))
}

/// Read a SIRI string-typed boolean out of a status element.
fn parse_status(node: Node<'_, '_>) -> Result<bool, ParseError> {
    let text = node.text().map(str::trim).unwrap_or_default();
    match text {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(ParseError::InvalidStatus(other.to_string())),
    }
}
