//! Dispatch result types

use serde::Serialize;

/// What happened to one channel during a dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum DeliveryStatus {
    Delivered,
    Failed(String),
    Skipped(String),
}

impl DeliveryStatus {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryStatus::Delivered)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, DeliveryStatus::Failed(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, DeliveryStatus::Skipped(_))
    }
}

/// Status of one named channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelReport {
    pub channel: String,
    pub status: DeliveryStatus,
}

/// Per-channel outcome of one dispatch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub channels: Vec<ChannelReport>,
}

impl DispatchReport {
    /// Status of the channel named `channel`
    pub fn status(&self, channel: &str) -> Option<&DeliveryStatus> {
        self.channels
            .iter()
            .find(|report| report.channel == channel)
            .map(|report| &report.status)
    }

    pub fn delivered_count(&self) -> usize {
        self.count(DeliveryStatus::is_delivered)
    }

    pub fn failed_count(&self) -> usize {
        self.count(DeliveryStatus::is_failed)
    }

    pub fn skipped_count(&self) -> usize {
        self.count(DeliveryStatus::is_skipped)
    }

    /// Whether every channel was skipped (or there were none)
    pub fn nothing_attempted(&self) -> bool {
        self.channels.iter().all(|report| report.status.is_skipped())
    }

    fn count(&self, predicate: fn(&DeliveryStatus) -> bool) -> usize {
        self.channels
            .iter()
            .filter(|report| predicate(&report.status))
            .count()
    }
}
