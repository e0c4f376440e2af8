//! Location source contract

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Location-related errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LocationError {
    #[error("Location updates already requested")]
    AlreadySubscribed,

    #[error("Location provider unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid location trace: {0}")]
    InvalidTrace(String),
}

/// Result type for location operations
pub type LocationResult<T> = Result<T, LocationError>;

/// A single reported coordinate pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
}

impl LocationFix {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Accuracy/power trade-off requested from the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Priority {
    HighAccuracy,
}

/// Parameters for a location subscription
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationRequest {
    /// Desired delivery interval
    pub interval: Duration,
    /// Fastest interval the subscriber accepts
    pub min_interval: Duration,
    pub priority: Priority,
}

impl LocationRequest {
    /// High accuracy request at a fixed period
    pub fn high_accuracy(interval: Duration) -> Self {
        Self {
            interval,
            min_interval: interval,
            priority: Priority::HighAccuracy,
        }
    }
}

/// Batch of fixes delivered by one provider callback. May be empty or hold
/// several fixes.
pub type FixBatch = Vec<LocationFix>;

/// Provider of location fixes, either pushed through a subscription or
/// read on demand.
#[async_trait]
pub trait LocationSource: Send {
    /// Start pushing fix batches
    async fn subscribe(&mut self, request: LocationRequest) -> LocationResult<mpsc::Receiver<FixBatch>>;

    /// Cancel the active subscription; a no-op when none is active
    async fn unsubscribe(&mut self);

    /// Most recent fix known to the provider
    async fn last_known(&mut self) -> LocationResult<Option<LocationFix>>;
}
