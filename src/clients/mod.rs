//! Client strategies
//!
//! Each mail client wraps a forwarded message in its own header layout.
//! A strategy knows how to spot that layout in markup or plain text and how
//! to strip it, recovering the original sender, date and body.

mod apple;
mod generic;
mod gmail;
mod hotmail;
mod iphone;
mod lotus_notes;
mod outlook;
mod outlook2010;
mod yahoo;

pub use apple::Apple;
pub use generic::Generic;
pub use gmail::Gmail;
pub use hotmail::Hotmail;
pub use iphone::IPhone;
pub use lotus_notes::LotusNotes;
pub use outlook::Outlook;
pub use outlook2010::Outlook2010;
pub use yahoo::Yahoo;

use crate::error::Result;
use crate::fields::ClientDescriptor;
use crate::types::Extraction;

/// Name under which the iPhone strategy is recorded in a trace
pub const IPHONE: &str = "iPhone";

/// Detection and extraction for one mail client's forward layout
pub trait ClientStrategy: Send + Sync {
    /// Patterns and templates this client extracts fields with
    fn descriptor(&self) -> &ClientDescriptor;

    fn name(&self) -> &'static str {
        self.descriptor().name
    }

    /// Offset of this client's forward marker in a markup blob
    fn detect_in_markup(&self, markup: &str) -> Option<usize>;

    /// Offset of this client's forward marker in a plain-text blob.
    ///
    /// `iphone_seen` is set when an earlier layer matched the iPhone client.
    fn detect_in_text(&self, text: &str, iphone_seen: bool) -> Option<usize>;

    /// Strip one forward layer from markup
    fn extract_from_markup(&self, markup: &str) -> Result<Extraction>;

    /// Strip one forward layer from plain text
    fn extract_from_text(&self, text: &str) -> Result<Extraction> {
        Ok(self.descriptor().extract_from_text(text))
    }
}

/// All strategies in priority order; earlier entries win offset ties
#[must_use]
pub fn default_clients() -> Vec<Box<dyn ClientStrategy>> {
    vec![
        Box::new(Gmail::new()),
        Box::new(Outlook::new()),
        Box::new(Outlook2010::new()),
        Box::new(Hotmail::new()),
        Box::new(Yahoo::new()),
        Box::new(Apple::new()),
        Box::new(LotusNotes::new()),
        Box::new(Generic::new()),
        Box::new(IPhone::new()),
    ]
}

fn strip_newlines(text: &str) -> String {
    text.replace('\n', "")
}
