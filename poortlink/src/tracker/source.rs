//! Device location sources.
//!
//! A [`LocationSource`] is a push source of position samples, typically the
//! device geolocation API. Watching it yields a [`LocationWatch`]; dropping
//! the watch releases the underlying device subscription.

use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::geo::GeoPoint;

/// Default maximum age of a usable sample.
pub const DEFAULT_MAXIMUM_AGE: Duration = Duration::from_secs(5);

/// Default time to wait for a sample before reporting a timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Why the device location could not be obtained.
///
/// Every variant is non-fatal; the user may retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    /// The user refused location access.
    #[error("Location permission denied")]
    PermissionDenied,

    /// The device has no geolocation support.
    #[error("Geolocation is not supported on this device")]
    Unsupported,

    /// No sample arrived within the configured timeout.
    #[error("Timed out waiting for a location fix")]
    Timeout,

    /// Any other source failure.
    #[error("Location source unavailable: {0}")]
    Unavailable(String),
}

impl LocationError {
    /// Whether the user has to change a device setting before retrying.
    pub fn needs_user_action(&self) -> bool {
        matches!(self, LocationError::PermissionDenied | LocationError::Unsupported)
    }
}

/// One position fix from the device.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationSample {
    pub point: GeoPoint,
    /// Reported accuracy radius, when the device provides one.
    pub accuracy_meters: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl LocationSample {
    /// A sample taken now.
    pub fn now(point: GeoPoint) -> Self {
        Self {
            point,
            accuracy_meters: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_accuracy(mut self, accuracy_meters: f64) -> Self {
        self.accuracy_meters = Some(accuracy_meters);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Age of the sample relative to `now`. Future timestamps count as fresh.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.timestamp).to_std().unwrap_or(Duration::ZERO)
    }

    /// Whether the sample is older than `maximum_age`.
    pub fn is_stale(&self, now: DateTime<Utc>, maximum_age: Duration) -> bool {
        self.age(now) > maximum_age
    }
}

/// Options requested from the location source.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchOptions {
    pub high_accuracy: bool,
    /// Samples older than this are discarded. Zero accepts only fixes taken
    /// after tracking started.
    pub maximum_age: Duration,
    /// How long to wait for a sample before reporting [`LocationError::Timeout`].
    pub timeout: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            maximum_age: DEFAULT_MAXIMUM_AGE,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// A live stream of samples from a [`LocationSource`].
#[derive(Debug)]
pub struct LocationWatch {
    receiver: mpsc::Receiver<Result<LocationSample, LocationError>>,
}

impl LocationWatch {
    pub fn new(receiver: mpsc::Receiver<Result<LocationSample, LocationError>>) -> Self {
        Self { receiver }
    }

    /// Next sample or error; `None` once the source has shut down.
    pub async fn recv(&mut self) -> Option<Result<LocationSample, LocationError>> {
        self.receiver.recv().await
    }
}

/// Push source of device positions.
pub trait LocationSource: Send + Sync {
    /// Start watching the device position.
    ///
    /// # Errors
    ///
    /// `PermissionDenied` or `Unsupported` when no watch can be established.
    fn watch(&self, options: &WatchOptions) -> Result<LocationWatch, LocationError>;

    /// Short human-readable name for logs.
    fn describe(&self) -> String {
        "location source".to_string()
    }
}

/// Location source fed through a channel.
///
/// Used by the simulator and tests: positions are pushed through the
/// [`LocationFeed`] returned alongside the source. The source can be watched
/// once; it can also be built to always fail with a given error.
#[derive(Debug)]
pub struct ChannelLocationSource {
    receiver: Mutex<Option<mpsc::Receiver<Result<LocationSample, LocationError>>>>,
    failure: Option<LocationError>,
}

impl ChannelLocationSource {
    /// Create a source and the feed that drives it.
    pub fn new(capacity: usize) -> (Self, LocationFeed) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let source = Self {
            receiver: Mutex::new(Some(receiver)),
            failure: None,
        };
        (source, LocationFeed { sender })
    }

    /// A source whose every watch fails with `error`.
    pub fn failing(error: LocationError) -> Self {
        Self {
            receiver: Mutex::new(None),
            failure: Some(error),
        }
    }
}

impl LocationSource for ChannelLocationSource {
    fn watch(&self, _options: &WatchOptions) -> Result<LocationWatch, LocationError> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        self.receiver
            .lock()
            .take()
            .map(LocationWatch::new)
            .ok_or_else(|| LocationError::Unavailable("source is already being watched".into()))
    }

    fn describe(&self) -> String {
        "channel".to_string()
    }
}

/// Sending half of a [`ChannelLocationSource`].
#[derive(Debug, Clone)]
pub struct LocationFeed {
    sender: mpsc::Sender<Result<LocationSample, LocationError>>,
}

impl LocationFeed {
    /// Push a sample. Returns `false` once the watch has been dropped.
    pub async fn send(&self, sample: LocationSample) -> bool {
        self.sender.send(Ok(sample)).await.is_ok()
    }

    /// Push a fresh sample at `point`.
    pub async fn send_point(&self, point: GeoPoint) -> bool {
        self.send(LocationSample::now(point)).await
    }

    /// Push a source error.
    pub async fn send_error(&self, error: LocationError) -> bool {
        self.sender.send(Err(error)).await.is_ok()
    }

    /// Whether the watching side has gone away.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_options_defaults() {
        let options = WatchOptions::default();
        assert!(options.high_accuracy);
        assert_eq!(options.maximum_age, Duration::from_secs(5));
        assert_eq!(options.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_sample_staleness() {
        let now = Utc::now();
        let point = GeoPoint::new(-25.7, 28.3).unwrap();

        let fresh = LocationSample::now(point).with_timestamp(now - chrono::Duration::seconds(2));
        let old = LocationSample::now(point).with_timestamp(now - chrono::Duration::seconds(9));
        let future = LocationSample::now(point).with_timestamp(now + chrono::Duration::seconds(3));

        assert!(!fresh.is_stale(now, DEFAULT_MAXIMUM_AGE));
        assert!(old.is_stale(now, DEFAULT_MAXIMUM_AGE));
        assert_eq!(future.age(now), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_channel_source_delivers_and_releases() {
        let (source, feed) = ChannelLocationSource::new(4);
        let mut watch = source.watch(&WatchOptions::default()).unwrap();

        let point = GeoPoint::new(-25.7, 28.3).unwrap();
        assert!(feed.send_point(point).await);
        assert!(feed.send_error(LocationError::Timeout).await);

        assert_eq!(watch.recv().await.unwrap().unwrap().point, point);
        assert_eq!(watch.recv().await.unwrap(), Err(LocationError::Timeout));

        drop(watch);
        assert!(feed.is_closed());
        assert!(!feed.send_point(point).await);
    }

    #[test]
    fn test_channel_source_single_watch() {
        let (source, _feed) = ChannelLocationSource::new(1);
        assert!(source.watch(&WatchOptions::default()).is_ok());
        assert!(matches!(
            source.watch(&WatchOptions::default()),
            Err(LocationError::Unavailable(_))
        ));
    }

    #[test]
    fn test_failing_source() {
        let source = ChannelLocationSource::failing(LocationError::PermissionDenied);
        let err = source.watch(&WatchOptions::default()).unwrap_err();
        assert_eq!(err, LocationError::PermissionDenied);
        assert!(err.needs_user_action());
        assert!(!LocationError::Timeout.needs_user_action());
    }
}
