//! Outbound notifications.
//!
//! The gateway is the only component that talks to the outside world.
//! Every dispatch is independent: a failure is counted and logged, never
//! retried, and never propagated back into the cycle.
//!
//! # Components
//!
//! - [`message`]: StructuredMessage built from a DomainEvent
//! - [`gateway`]: Per-event dispatch with failure isolation
//! - [`webhook`]: HTTP webhook sink
//! - [`log`]: Tracing-only sink

pub mod gateway;
pub mod log;
pub mod message;
pub mod webhook;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use swapwatch_ledger::events::DomainEvent;
use tracing::info;

use crate::status::StatusSummary;

pub use gateway::{DispatchReport, NotifierGateway};
pub use log::LogNotifier;
pub use message::{MessageField, StructuredMessage};
pub use webhook::WebhookNotifier;

/// Logical destination of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKey {
    /// New listings.
    Listing,
    /// Completed swaps.
    Swap,
    /// Accepted offers.
    Offer,
}

impl ChannelKey {
    /// All channels.
    pub const ALL: [Self; 3] = [Self::Listing, Self::Swap, Self::Offer];

    /// Returns the channel an event is routed to.
    #[must_use]
    pub const fn for_event(event: &DomainEvent) -> Self {
        match event {
            DomainEvent::ListingCreated(_) => Self::Listing,
            DomainEvent::SwapCompleted(_) => Self::Swap,
            DomainEvent::OfferAccepted(_) => Self::Offer,
        }
    }

    /// Returns the channel name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Listing => "listing",
            Self::Swap => "swap",
            Self::Offer => "offer",
        }
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification delivery errors.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The request never got a response.
    #[error("notification transport failed: {0}")]
    Transport(String),

    /// The sink answered with a non-success status.
    #[error("notification rejected with status {status}")]
    Rejected {
        /// HTTP status code.
        status: u16,
    },
}

impl From<reqwest::Error> for NotifyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Transport("request timeout".to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// A notification sink.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers one message to a channel.
    async fn send(&self, channel: ChannelKey, message: &StructuredMessage)
        -> Result<(), NotifyError>;

    /// Publishes the derived status summary.
    ///
    /// Sinks without a status surface just log it.
    async fn publish_status(&self, summary: &StatusSummary) -> Result<(), NotifyError> {
        info!("Status: {}", summary);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, B256, U256};
    use swapwatch_ledger::events::{EventOrigin, ListingCreated, OfferAccepted, SwapCompleted};

    fn origin() -> EventOrigin {
        EventOrigin {
            block_height: 1,
            tx_hash: B256::ZERO,
            log_index: 0,
        }
    }

    #[test]
    fn test_channel_routing() {
        let listing = DomainEvent::ListingCreated(ListingCreated {
            listing_id: U256::from(1u64),
            seller: Address::ZERO,
            base_amount: U256::ZERO,
            quote_amount: U256::ZERO,
            origin: origin(),
        });
        let swap = DomainEvent::SwapCompleted(SwapCompleted {
            listing_id: U256::from(1u64),
            buyer: Address::ZERO,
            base_amount: U256::ZERO,
            quote_amount: U256::ZERO,
            origin: origin(),
        });
        let offer = DomainEvent::OfferAccepted(OfferAccepted {
            listing_id: U256::from(1u64),
            seller: Address::ZERO,
            buyer: Address::ZERO,
            base_amount: U256::ZERO,
            quote_amount: U256::ZERO,
            origin: origin(),
        });

        assert_eq!(ChannelKey::for_event(&listing), ChannelKey::Listing);
        assert_eq!(ChannelKey::for_event(&swap), ChannelKey::Swap);
        assert_eq!(ChannelKey::for_event(&offer), ChannelKey::Offer);
    }

    #[test]
    fn test_channel_display() {
        assert_eq!(ChannelKey::Listing.to_string(), "listing");
        assert_eq!(ChannelKey::Offer.to_string(), "offer");
    }

    #[test]
    fn test_notify_error_display() {
        let err = NotifyError::Rejected { status: 429 };
        assert_eq!(err.to_string(), "notification rejected with status 429");

        let err = NotifyError::Transport("request timeout".to_string());
        assert_eq!(err.to_string(), "notification transport failed: request timeout");
    }
}
