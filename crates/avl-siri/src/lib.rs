// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! SIRI-VM wire protocol layer
//!
//! This crate builds and parses the SIRI v2.0 envelopes exchanged with AVL
//! data producers during subscription management:
//!
//! | Message | Direction | Module |
//! |---------|-----------|--------|
//! | `SubscriptionRequest` | outbound | [`request`] |
//! | `TerminateSubscriptionRequest` | outbound | [`request`] |
//! | `SubscriptionResponse` | inbound | [`response`] |
//! | `TerminateSubscriptionResponse` | inbound | [`response`] |
//! | `HeartbeatNotification` | inbound | [`response`] |
//!
//! All envelopes share the fixed SIRI namespace and version:
//!
//! ```text
//! <Siri version="2.0" xmlns="http://www.siri.org.uk/siri">
//!   ...
//! </Siri>
//! ```
//!
//! The crate is pure and stateless: builders render owned structs to XML
//! strings, parsers turn XML strings into typed results. Parsing is forward
//! compatible (unknown extra elements are ignored) but never lenient about
//! the fields that matter: a response without the expected status element is
//! a [`ParseError`], not a default. An ambiguous producer answer must not be
//! mistaken for success.

#![deny(missing_docs)]

/// Outbound envelope builders.
pub mod request;

/// Inbound envelope parsers.
pub mod response;

pub use request::{
    DEFAULT_REQUESTOR_REF, HEARTBEAT_INTERVAL, SubscriptionRequest, TerminateSubscriptionRequest,
};
pub use response::{
    HeartbeatNotification, ParseError, SubscriptionResponse, TerminateSubscriptionResponse,
    parse_heartbeat_notification, parse_subscription_response, parse_terminate_response,
};

/// The SIRI XML namespace shared by all envelopes.
pub const SIRI_NAMESPACE: &str = "http://www.siri.org.uk/siri";

/// The SIRI schema version carried on the root element.
pub const SIRI_VERSION: &str = "2.0";
