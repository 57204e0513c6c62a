//! Notification channel implementations

use super::message::{NotificationMessage, Severity};
use crate::config::{SmtpConfig, WebhookType};
use crate::monitoring::types::Outcome;
use crate::utils::error::{Result, ToolboxError};
use crate::utils::truncate_string;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// Chat services reject oversized messages; stacks are cut to this many bytes
const MAX_WEBHOOK_STACK_BYTES: usize = 2500;

/// Notification channel trait
#[async_trait::async_trait]
pub trait NotificationChannel: Send + Sync + std::fmt::Debug {
    /// Get channel name
    fn name(&self) -> &str;

    /// Why this channel should not be attempted for `message`, if it should not
    fn skip_reason(&self, _message: &NotificationMessage) -> Option<String> {
        None
    }

    /// Send a notification
    async fn send(&self, message: &NotificationMessage) -> Result<()>;
}

/// Email notification channel over SMTP
#[derive(Debug)]
pub struct EmailChannel {
    smtp: SmtpConfig,
    recipients: Vec<String>,
    timeout: Duration,
}

impl EmailChannel {
    /// Create a new email notification channel
    pub fn new(smtp: SmtpConfig, recipients: Vec<String>, timeout: Duration) -> Self {
        Self {
            smtp,
            recipients,
            timeout,
        }
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let host = self
            .smtp
            .host
            .as_deref()
            .ok_or_else(|| ToolboxError::Email("SMTP host is not configured".to_string()))?;

        let builder = if self.smtp.use_tls {
            let tls = if self.smtp.port == 465 {
                AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            } else {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            };
            tls.map_err(|e| {
                ToolboxError::Email(format!("failed to configure TLS for {}: {}", host, e))
            })?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
        };

        let mut builder = builder.port(self.smtp.port).timeout(Some(self.timeout));
        if let (Some(user), Some(password)) = (&self.smtp.user, &self.smtp.password) {
            builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
        }

        Ok(builder.build())
    }

    fn build_email(&self, message: &NotificationMessage) -> Result<Message> {
        let sender = self
            .smtp
            .sender()
            .ok_or_else(|| ToolboxError::Email("no sender address configured".to_string()))?;
        let from: Mailbox = sender
            .parse()
            .map_err(|e| ToolboxError::Email(format!("invalid sender '{}': {}", sender, e)))?;

        let mut builder = Message::builder().from(from).subject(message.subject.clone());
        for recipient in &self.recipients {
            let to: Mailbox = recipient.parse().map_err(|e| {
                ToolboxError::Email(format!("invalid recipient '{}': {}", recipient, e))
            })?;
            builder = builder.to(to);
        }

        builder
            .multipart(MultiPart::alternative_plain_html(
                message.render_text(true),
                render_html(message),
            ))
            .map_err(|e| ToolboxError::Email(format!("failed to build email: {}", e)))
    }
}

#[async_trait::async_trait]
impl NotificationChannel for EmailChannel {
    fn name(&self) -> &str {
        "email"
    }

    fn skip_reason(&self, _message: &NotificationMessage) -> Option<String> {
        if self.recipients.is_empty() {
            return Some("no recipients configured".to_string());
        }
        None
    }

    async fn send(&self, message: &NotificationMessage) -> Result<()> {
        let email = self.build_email(message)?;
        let transport = self.transport()?;

        transport
            .send(email)
            .await
            .map_err(|e| ToolboxError::Email(format!("SMTP delivery failed: {}", e)))?;

        debug!("Email notification sent to {} recipients", self.recipients.len());
        Ok(())
    }
}

/// Chat webhook notification channel (Slack or Google Chat)
#[derive(Debug)]
pub struct WebhookChannel {
    webhook_url: String,
    webhook_type: WebhookType,
    include_stacktrace: bool,
    client: reqwest::Client,
}

impl WebhookChannel {
    /// Create a new webhook channel with a bounded HTTP client
    pub fn new(
        webhook_url: String,
        webhook_type: WebhookType,
        include_stacktrace: bool,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ToolboxError::Notification(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            webhook_url,
            webhook_type,
            include_stacktrace,
            client,
        })
    }

    /// Wire payload for the configured webhook flavour
    pub fn payload(&self, message: &NotificationMessage) -> Value {
        match self.webhook_type {
            WebhookType::Slack => slack_payload(message, self.include_stacktrace),
            WebhookType::Gchat => gchat_payload(message, self.include_stacktrace),
        }
    }
}

#[async_trait::async_trait]
impl NotificationChannel for WebhookChannel {
    fn name(&self) -> &str {
        self.webhook_type.as_str()
    }

    async fn send(&self, message: &NotificationMessage) -> Result<()> {
        let payload = self.payload(message);

        // Webhook URLs carry credentials, keep them out of error messages
        self.client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| ToolboxError::HttpClient(e.without_url()))?;

        debug!("{} webhook notification sent", self.webhook_type.as_str());
        Ok(())
    }
}

/// Slack payload: summary text plus one attachment with the facts
pub fn slack_payload(message: &NotificationMessage, include_stacktrace: bool) -> Value {
    let color = match message.severity {
        Severity::Info => "good",
        Severity::Critical => "danger",
    };

    let fields: Vec<Value> = message
        .facts()
        .into_iter()
        .map(|(title, value)| {
            json!({
                "title": title,
                "value": value,
                "short": !matches!(title, "Log File" | "Start Time"),
            })
        })
        .collect();

    let mut attachment = json!({
        "color": color,
        "title": format!("{} - {}", message.app_name, message.outcome),
        "fields": fields,
        "footer": "dt-toolbox",
        "ts": message.started_at.timestamp(),
    });

    if let Some(error) = &message.error {
        let mut text = format!("```{}: {}```", error.type_name, error.message);
        if include_stacktrace {
            if let Some(stack) = &message.stack {
                text.push_str(&format!(
                    "\n```{}```",
                    truncate_string(stack, MAX_WEBHOOK_STACK_BYTES)
                ));
            }
        }
        attachment["text"] = Value::String(text);
    }

    json!({
        "text": message.subject,
        "attachments": [attachment],
    })
}

/// Google Chat payload: a single markdown-ish text block
pub fn gchat_payload(message: &NotificationMessage, include_stacktrace: bool) -> Value {
    let mut text = format!("*{}* - {}\n\n", message.app_name, message.outcome);
    for (label, value) in message.facts() {
        if label == "Application" {
            continue;
        }
        text.push_str(&format!("• *{}:* {}\n", label, value));
    }

    if let Some(error) = &message.error {
        text.push_str(&format!(
            "\n*Error:* ```{}: {}```",
            error.type_name, error.message
        ));
        if include_stacktrace {
            if let Some(stack) = &message.stack {
                text.push_str(&format!(
                    "\n*Stack Trace:* ```{}```",
                    truncate_string(stack, MAX_WEBHOOK_STACK_BYTES)
                ));
            }
        }
    }

    json!({ "text": text })
}

/// HTML alternative of the email body
pub fn render_html(message: &NotificationMessage) -> String {
    let color = match message.outcome {
        Outcome::Success => "#2e7d32",
        Outcome::Failure => "#c62828",
    };

    let rows: String = message
        .facts()
        .into_iter()
        .map(|(label, value)| {
            format!(
                "<tr><td style=\"padding: 8px; border: 1px solid #ddd;\"><strong>{}:</strong></td>\
                 <td style=\"padding: 8px; border: 1px solid #ddd;\">{}</td></tr>",
                label,
                escape_html(&value)
            )
        })
        .collect();

    let mut html = format!(
        "<html><body style=\"font-family: Arial, sans-serif;\">\
         <h2 style=\"color: {};\">{} - {}</h2>\
         <table style=\"border-collapse: collapse; width: 100%;\">{}</table>",
        color,
        escape_html(&message.app_name),
        message.outcome,
        rows
    );

    if let Some(error) = &message.error {
        html.push_str(&format!(
            "<h3 style=\"color: #c62828;\">{}</h3><pre>{}</pre>",
            escape_html(&error.type_name),
            escape_html(&error.message)
        ));
    }
    if let Some(stack) = &message.stack {
        html.push_str(&format!("<h3>Stack Trace</h3><pre>{}</pre>", escape_html(stack)));
    }

    html.push_str("</body></html>");
    html
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
