// Enforce at crate level
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! Forwarded Email Extractor
//!
//! Recovers the original sender, send date and body from an email that has
//! been forwarded, possibly several times, through common mail clients.
//!
//! # Features
//!
//! - Detection of the forward layout written by Gmail, Outlook, Outlook 2010,
//!   Hotmail, Yahoo, Apple Mail, Lotus Notes and the iPhone, plus a generic
//!   fallback
//! - Recursive unwrap of nested markup forwards, innermost layer wins
//! - Reconciliation of the markup and plain-text alternatives
//! - A match trace recording every unwrapped layer
//! - MIME decoding of raw messages
//!
//! # Example
//!
//! ```rust
//! use unforward::Extractor;
//!
//! let text = "---------- Forwarded message ----------\n\
//!             From: John Doe <john@example.com>\n\
//!             Date: Tue, Jun 3, 2014 at 1:47 PM\n\
//!             Subject: Hello\n\
//!             To: me@example.com\n\
//!             \n\
//!             Original body";
//!
//! let outcome = Extractor::new().extract(None, Some(text));
//! let result = outcome.into_result().unwrap();
//!
//! println!("From: {result}");
//! println!("Sent: {:?}", result.date);
//! ```

mod address;
pub mod clients;
mod dates;
mod dom;
mod error;
mod extractor;
mod fields;
mod mime;
mod reconcile;
mod types;

pub use address::{is_valid_address, is_valid_sender};
pub use clients::{ClientStrategy, default_clients};
pub use dates::{parse_special_case, parse_with_template, parse_with_templates};
pub use dom::render_text;
pub use error::{ExtractError, FailureKind, Result};
pub use extractor::{Extractor, MAX_UNWRAP_DEPTH};
pub use fields::{
    ClientDescriptor, HEADER_LABELS, body_after_headers, is_header_text, last_header_label, unquote,
};
pub use mime::{MessageParts, decode_parts};
pub use reconcile::{DEFAULT_LENGTH_RATIO, MergePolicy, reconcile};
pub use types::*;
