//! Notification dispatcher
//!
//! Decides which channels fire for a run and delivers to them concurrently.
//! A channel failure, timeout or panic is recorded in the report and never
//! reaches the caller or the other channels.

use super::channels::{EmailChannel, NotificationChannel, WebhookChannel};
use super::message::NotificationMessage;
use super::types::{ChannelReport, DeliveryStatus, DispatchReport};
use crate::config::Config;
use crate::monitoring::types::{panic_message, ExecutionResult, Outcome};
use crate::observability::RunIdentity;
use futures::future::join_all;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Channel names used in reports
pub const EMAIL_CHANNEL: &str = "email";
pub const WEBHOOK_CHANNEL: &str = "webhook";

/// One configured channel, or the reason it cannot be used
#[derive(Debug)]
enum ChannelSlot {
    Ready(Box<dyn NotificationChannel>),
    /// Required settings are absent
    Unconfigured(String),
    /// Settings are present but the channel could not be built
    Broken(String),
}

/// Fans one run outcome out to every configured channel
#[derive(Debug)]
pub struct NotificationDispatcher {
    slots: Vec<(&'static str, ChannelSlot)>,
    enabled: bool,
    notify_on_success: bool,
    timeout: Duration,
}

impl NotificationDispatcher {
    /// Build the email and webhook channels from configuration
    pub fn from_config(config: &Config) -> Self {
        let notification = &config.notification;

        let email = match notification.email_missing_settings() {
            Some(reason) => ChannelSlot::Unconfigured(reason.to_string()),
            None => ChannelSlot::Ready(Box::new(EmailChannel::new(
                notification.smtp.clone(),
                config.recipients.clone(),
                notification.timeout(),
            ))),
        };

        let webhook = match (
            notification.webhook_missing_settings(),
            notification.webhook_url.as_ref(),
        ) {
            (None, Some(url)) => match WebhookChannel::new(
                url.clone(),
                notification.webhook_type,
                notification.webhook_include_stacktrace,
                notification.timeout(),
            ) {
                Ok(channel) => ChannelSlot::Ready(Box::new(channel)),
                Err(e) => ChannelSlot::Broken(e.to_string()),
            },
            (reason, _) => ChannelSlot::Unconfigured(
                reason.unwrap_or("webhook URL is not configured").to_string(),
            ),
        };

        Self {
            slots: vec![(EMAIL_CHANNEL, email), (WEBHOOK_CHANNEL, webhook)],
            enabled: notification.enabled,
            notify_on_success: config.notify_on_success,
            timeout: notification.timeout(),
        }
    }

    /// Dispatcher over explicit channels, for callers bringing their own
    pub fn with_channels(
        channels: Vec<(&'static str, Box<dyn NotificationChannel>)>,
        notify_on_success: bool,
        timeout: Duration,
    ) -> Self {
        Self {
            slots: channels
                .into_iter()
                .map(|(name, channel)| (name, ChannelSlot::Ready(channel)))
                .collect(),
            enabled: true,
            notify_on_success,
            timeout,
        }
    }

    /// Whether the outcome gate is open for `outcome`
    pub fn should_notify(&self, outcome: Outcome) -> bool {
        match outcome {
            Outcome::Failure => true,
            Outcome::Success => self.notify_on_success,
        }
    }

    /// Deliver the run outcome to every eligible channel, at most once each
    pub async fn dispatch(
        &self,
        config: &Config,
        result: &ExecutionResult,
        identity: &RunIdentity,
        log_artifact: Option<&Path>,
    ) -> DispatchReport {
        let message = NotificationMessage::build(config, result, identity, log_artifact);
        self.dispatch_message(&message).await
    }

    /// Deliver a prepared message
    pub async fn dispatch_message(&self, message: &NotificationMessage) -> DispatchReport {
        let gate_open = self.should_notify(message.outcome);

        let sends = self.slots.iter().map(|(name, slot)| async move {
            let status = match slot {
                ChannelSlot::Unconfigured(reason) => DeliveryStatus::Skipped(reason.clone()),
                _ if !self.enabled => {
                    DeliveryStatus::Skipped("notifications are disabled".to_string())
                }
                _ if !gate_open => DeliveryStatus::Skipped(
                    "notify_on_success is off for a successful run".to_string(),
                ),
                ChannelSlot::Broken(reason) => DeliveryStatus::Failed(reason.clone()),
                ChannelSlot::Ready(channel) => match channel.skip_reason(message) {
                    Some(reason) => DeliveryStatus::Skipped(reason),
                    None => self.deliver(channel.as_ref(), message).await,
                },
            };

            ChannelReport {
                channel: (*name).to_string(),
                status,
            }
        });

        let report = DispatchReport {
            channels: join_all(sends).await,
        };

        for channel in &report.channels {
            match &channel.status {
                DeliveryStatus::Delivered => info!("Notification delivered via {}", channel.channel),
                DeliveryStatus::Failed(reason) => {
                    warn!("Notification via {} failed: {}", channel.channel, reason)
                }
                DeliveryStatus::Skipped(reason) => {
                    debug!("Notification via {} skipped: {}", channel.channel, reason)
                }
            }
        }

        report
    }

    async fn deliver(
        &self,
        channel: &dyn NotificationChannel,
        message: &NotificationMessage,
    ) -> DeliveryStatus {
        let send = AssertUnwindSafe(channel.send(message)).catch_unwind();

        match tokio::time::timeout(self.timeout, send).await {
            Ok(Ok(Ok(()))) => DeliveryStatus::Delivered,
            Ok(Ok(Err(e))) => DeliveryStatus::Failed(e.to_string()),
            Ok(Err(panic)) => DeliveryStatus::Failed(format!(
                "channel panicked: {}",
                panic_message(panic.as_ref())
            )),
            Err(_) => DeliveryStatus::Failed(format!(
                "timed out after {}s",
                self.timeout.as_secs_f64()
            )),
        }
    }
}
