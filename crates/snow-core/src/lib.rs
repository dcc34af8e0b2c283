//! ServiceNow access for snow-bot.
//!
//! Fetches ticket records from the ServiceNow table API and normalises the
//! five supported record kinds into one display shape.
//!
//! # Architecture
//!
//! - [`SnowClient`] issues authenticated table API lookups by `sys_id` or
//!   effective number
//! - [`link`] translates between classic-UI links and `(table, sys_id)`
//! - [`RecordKind`] is the closed set of supported tables
//! - [`normalize`] maps a [`RawTicket`] into a [`CanonicalTicket`]
//! - [`state`] holds the state-code label tables

pub mod client;
mod error;
mod kind;
pub mod link;
mod normalize;
pub mod state;
pub mod ticket;

pub use client::{SnowClient, SnowConfig};
pub use error::SnowError;
pub use kind::RecordKind;
pub use link::{TicketUrl, build_ui_url, parse_ticket_url};
pub use normalize::normalize;
pub use ticket::{CanonicalTicket, NOT_AVAILABLE, RawTicket};
