//! In-process change feed.
//!
//! Every successful trip or profile write publishes a [`ChangeEvent`]. Events
//! only say "something changed, re-read": subscribers must not rely on
//! delivery, and a subscriber that falls behind gets [`ChangeEvent::Resync`]
//! instead of the events it missed.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use taxi_core::{CustomerToken, DriverId, DriverProfile, TripId, TripRequest, TripStatus};

/// A change notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeEvent {
    /// A trip was created or transitioned.
    Trip {
        /// The trip.
        trip_id: TripId,
        /// Its driver.
        owner_id: DriverId,
        /// Its customer token.
        customer_id: CustomerToken,
        /// Status after the write.
        status: TripStatus,
    },
    /// A driver profile was created or edited.
    Driver {
        /// The driver.
        owner_id: DriverId,
        /// Availability after the write.
        available: bool,
    },
    /// Events were dropped; re-read everything.
    Resync,
}

impl ChangeEvent {
    /// Event for a trip write.
    #[must_use]
    pub fn trip(trip: &TripRequest) -> Self {
        Self::Trip {
            trip_id: trip.id,
            owner_id: trip.owner_id,
            customer_id: trip.customer_id.clone(),
            status: trip.status,
        }
    }

    /// Event for a profile write.
    #[must_use]
    pub fn driver(profile: &DriverProfile) -> Self {
        Self::Driver {
            owner_id: profile.owner_id,
            available: profile.available,
        }
    }

    /// Whether a driver watching their own trips should see this.
    #[must_use]
    pub fn concerns_owner(&self, owner: &DriverId) -> bool {
        match self {
            Self::Trip { owner_id, .. } => owner_id == owner,
            Self::Driver { .. } => false,
            Self::Resync => true,
        }
    }

    /// Whether the holder of `token` should see this.
    #[must_use]
    pub fn concerns_customer(&self, token: &CustomerToken) -> bool {
        match self {
            Self::Trip { customer_id, .. } => customer_id == token,
            Self::Driver { .. } => false,
            Self::Resync => true,
        }
    }

    /// Whether a driver listing should refresh.
    #[must_use]
    pub const fn concerns_driver_listing(&self) -> bool {
        matches!(self, Self::Driver { .. } | Self::Resync)
    }
}

/// Broadcast channel of change events.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    /// Create a feed that buffers `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event to current subscribers.
    pub fn publish(&self, event: ChangeEvent) {
        // No subscribers is the common case, not an error.
        let delivered = self.sender.send(event).unwrap_or(0);
        tracing::trace!(subscribers = delivered, "Change event published");
    }

    /// Subscribe to events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> FeedSubscription {
        FeedSubscription {
            receiver: self.sender.subscribe(),
        }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// One subscriber's view of the feed.
#[derive(Debug)]
pub struct FeedSubscription {
    receiver: broadcast::Receiver<ChangeEvent>,
}

impl FeedSubscription {
    /// Wait for the next event; `None` once the feed is gone.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        match self.receiver.recv().await {
            Ok(event) => Some(event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Feed subscriber lagged");
                Some(ChangeEvent::Resync)
            }
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }
}
