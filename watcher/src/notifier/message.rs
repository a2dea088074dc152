//! Structured notification messages.

use alloy_primitives::Address;
use serde::Serialize;
use swapwatch_ledger::events::{format_units, DomainEvent, BASE_DECIMALS, QUOTE_DECIMALS};

use super::ChannelKey;
use crate::status::AssetLabels;

/// Accent colour for listing messages.
pub const LISTING_COLOR: u32 = 0x0099FF;

/// Accent colour for swap messages.
pub const SWAP_COLOR: u32 = 0x00FF00;

/// Accent colour for offer messages.
pub const OFFER_COLOR: u32 = 0xFFFF00;

/// A single name/value field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageField {
    /// Field label.
    pub name: String,
    /// Field value.
    pub value: String,
    /// Whether the field may share a row.
    pub inline: bool,
}

impl MessageField {
    /// Creates an inline field.
    #[must_use]
    pub fn inline(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            inline: true,
        }
    }
}

/// A transport-neutral notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructuredMessage {
    /// Headline.
    pub title: String,
    /// Accent colour as `0xRRGGBB`.
    pub color: u32,
    /// Ordered fields.
    pub fields: Vec<MessageField>,
    /// Footer text.
    pub footer: String,
    /// Link to the originating transaction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl StructuredMessage {
    /// Builds the message for a domain event.
    ///
    /// `explorer_base_url` is joined with the transaction hash; pass an
    /// empty string to omit the link.
    #[must_use]
    pub fn from_event(event: &DomainEvent, labels: &AssetLabels, explorer_base_url: &str) -> Self {
        let (title, color, footer, party) = match event {
            DomainEvent::ListingCreated(e) => (
                "New Listing Created",
                LISTING_COLOR,
                "Listing Created",
                MessageField::inline("Seller", short_address(&e.seller)),
            ),
            DomainEvent::SwapCompleted(e) => (
                "Swap Completed",
                SWAP_COLOR,
                "Swap Completed",
                MessageField::inline("Buyer", short_address(&e.buyer)),
            ),
            DomainEvent::OfferAccepted(e) => (
                "Offer Accepted",
                OFFER_COLOR,
                "Offer Accepted",
                MessageField::inline("Buyer", short_address(&e.buyer)),
            ),
        };

        let fields = vec![
            party,
            MessageField::inline(
                format!("{} Amount", labels.base),
                format_units(event.base_amount(), BASE_DECIMALS),
            ),
            MessageField::inline(
                format!("{} Amount", labels.quote),
                format_units(event.quote_amount(), QUOTE_DECIMALS),
            ),
            MessageField::inline("Listing ID", event.listing_id().to_string()),
        ];

        let base = explorer_base_url.trim_end_matches('/');
        let url = (!base.is_empty()).then(|| format!("{}/{}", base, event.origin().tx_hash));

        Self {
            title: title.to_string(),
            color,
            fields,
            footer: footer.to_string(),
            url,
        }
    }

    /// Returns the value of the named field.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }

    /// Returns a single-line rendering for logs.
    #[must_use]
    pub fn summary_line(&self, channel: ChannelKey) -> String {
        let fields: Vec<String> = self
            .fields
            .iter()
            .map(|f| format!("{}={}", f.name, f.value))
            .collect();
        format!("[{}] {}: {}", channel, self.title, fields.join(", "))
    }
}

/// Shortens an address to `0x1234...abcd`.
#[must_use]
pub fn short_address(address: &Address) -> String {
    let full = address.to_string();
    if full.len() <= 10 {
        return full;
    }
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}
