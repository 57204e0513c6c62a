//! Outcome notifications
//!
//! This module turns a finished run into a channel-agnostic message and fans it
//! out to the configured email and chat webhook channels.

mod channels;
mod dispatcher;
mod message;
mod types;

// Re-export public types
pub use channels::{
    gchat_payload, render_html, slack_payload, EmailChannel, NotificationChannel, WebhookChannel,
};
pub use dispatcher::{NotificationDispatcher, EMAIL_CHANNEL, WEBHOOK_CHANNEL};
pub use message::{ErrorSummary, NotificationMessage, Severity};
pub use types::{ChannelReport, DeliveryStatus, DispatchReport};
