//! MAX platform integration for forumbot.
//!
//! - **Gateway** (`gateway`) - outbound HTTP calls (send with buttons/image,
//!   delete) behind a trait so handlers can be tested against a fake
//! - **Wire** (`wire`) - long-poll update payloads, normalized once at the
//!   boundary into [`forumbot_core::InboundEvent`]
//! - **Content** (`content`) - menu, track, and survey copy with button rows
//! - **Survey** (`survey`) - executes dialog machine transitions against the
//!   store, the gateway, and the feedback log
//! - **Router** (`router`) - single entry point for inbound events:
//!   duplicate filter first, then intent or free-text dispatch
//! - **Polling** (`polling`) - the long-poll loop, one task per event

pub mod content;
pub mod gateway;
pub mod polling;
pub mod router;
pub mod survey;
pub mod wire;

pub use gateway::{Button, GatewayError, MaxGateway, MessageGateway, OutgoingMessage};
pub use polling::UpdatePoller;
pub use router::{BroadcastReport, Routed, Router, RouterSettings};
pub use survey::SurveyService;
