//! Trace replay location source
//!
//! Plays back a recorded list of fixes as if they came from a live provider.
//! Each subscription tick delivers the next point; once the trace is
//! exhausted the final point is repeated, like a device that stopped moving.
//!
//! Traces are either a JSON array of `{"latitude": .., "longitude": ..}`
//! objects or plain text with one `lat,lon` pair per line (`#` starts a
//! comment).

use super::traits::{
    FixBatch, LocationError, LocationFix, LocationRequest, LocationResult, LocationSource,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Parse a trace from JSON or `lat,lon` text
pub fn parse_trace(content: &str) -> LocationResult<Vec<LocationFix>> {
    let trimmed = content.trim_start();

    let fixes: Vec<LocationFix> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed).map_err(|e| LocationError::InvalidTrace(e.to_string()))?
    } else {
        let mut fixes = Vec::new();
        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            fixes.push(parse_line(line).ok_or_else(|| {
                LocationError::InvalidTrace(format!("line {}: {:?}", index + 1, line))
            })?);
        }
        fixes
    };

    for fix in &fixes {
        if !(-90.0..=90.0).contains(&fix.latitude) || !(-180.0..=180.0).contains(&fix.longitude) {
            return Err(LocationError::InvalidTrace(format!(
                "coordinates out of range: {}, {}",
                fix.latitude, fix.longitude
            )));
        }
    }

    Ok(fixes)
}

fn parse_line(line: &str) -> Option<LocationFix> {
    let mut parts = line.split(',').map(str::trim);
    let latitude = parts.next()?.parse().ok()?;
    let longitude = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(LocationFix::new(latitude, longitude))
}

/// Replays a fixed trace
pub struct ReplayLocationSource {
    trace: Arc<Vec<LocationFix>>,
    cursor: Arc<Mutex<usize>>,
    task: Option<JoinHandle<()>>,
}

impl ReplayLocationSource {
    pub fn new(trace: Vec<LocationFix>) -> Self {
        Self {
            trace: Arc::new(trace),
            cursor: Arc::new(Mutex::new(0)),
            task: None,
        }
    }

    /// Load a trace file
    pub fn from_file(path: &Path) -> LocationResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            LocationError::Unavailable(format!("Failed to read trace {:?}: {}", path, e))
        })?;
        let trace = parse_trace(&content)?;

        tracing::info!("Loaded {} trace points from {:?}", trace.len(), path);
        Ok(Self::new(trace))
    }

    fn advance(trace: &[LocationFix], cursor: &Mutex<usize>) -> Option<LocationFix> {
        let last = trace.len().checked_sub(1)?;
        let mut cursor = cursor.lock();
        let fix = trace[(*cursor).min(last)];
        if *cursor < last {
            *cursor += 1;
        }
        Some(fix)
    }

    fn is_subscribed(&self) -> bool {
        self.task.as_ref().map_or(false, |task| !task.is_finished())
    }
}

#[async_trait]
impl LocationSource for ReplayLocationSource {
    async fn subscribe(&mut self, request: LocationRequest) -> LocationResult<mpsc::Receiver<FixBatch>> {
        if self.is_subscribed() {
            return Err(LocationError::AlreadySubscribed);
        }

        let period = request.interval.max(request.min_interval);
        let (tx, rx) = mpsc::channel(32);
        let trace = self.trace.clone();
        let cursor = self.cursor.clone();

        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let batch: FixBatch = Self::advance(&trace, &cursor).into_iter().collect();
                if tx.send(batch).await.is_err() {
                    break;
                }
            }
        }));

        tracing::debug!(
            "Replaying location trace every {:?} ({:?})",
            period,
            request.priority
        );
        Ok(rx)
    }

    async fn unsubscribe(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("Location replay stopped");
        }
    }

    async fn last_known(&mut self) -> LocationResult<Option<LocationFix>> {
        Ok(Self::advance(&self.trace, &self.cursor))
    }
}

impl Drop for ReplayLocationSource {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
