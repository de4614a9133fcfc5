//! Events: the unit of ingestion
//!
//! Producers publish labeled numeric events over UDP in either a
//! pipe-delimited text format or JSON. This module holds the decoded
//! `Event` type and both codecs.

mod types;
mod codec;

pub use types::{now_nanos, Event};
pub use codec::{parse_datagram, parse_json, parse_text, EventParseError};
