//! Envelope-type handlers for Socket Mode events.
//!
//! - [`events`]: Events API callbacks (link unfurls, reactions, App Home)

pub mod events;
