//! Notification configuration

use super::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Chat webhook payload flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookType {
    #[default]
    Slack,
    Gchat,
}

impl WebhookType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookType::Slack => "slack",
            WebhookType::Gchat => "gchat",
        }
    }
}

impl FromStr for WebhookType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "slack" => Ok(WebhookType::Slack),
            "gchat" | "google_chat" | "googlechat" => Ok(WebhookType::Gchat),
            other => Err(format!(
                "unknown webhook type '{}', expected slack or gchat",
                other
            )),
        }
    }
}

/// SMTP settings for the email channel
#[derive(Debug, Clone, Serialize)]
pub struct SmtpConfig {
    /// SMTP server host
    pub host: Option<String>,
    /// SMTP server port
    pub port: u16,
    /// Login user, also the default sender
    pub user: Option<String>,
    /// Login password
    #[serde(serialize_with = "serialize_masked")]
    pub password: Option<String>,
    /// Explicit sender address
    pub from: Option<String>,
    /// Upgrade the connection with STARTTLS
    pub use_tls: bool,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: default_smtp_port(),
            user: None,
            password: None,
            from: None,
            use_tls: true,
        }
    }
}

impl SmtpConfig {
    /// Sender address: explicit `from`, else the login user
    pub fn sender(&self) -> Option<&str> {
        self.from.as_deref().or(self.user.as_deref())
    }
}

/// Notification configuration
#[derive(Debug, Clone, Serialize)]
pub struct NotificationConfig {
    /// Master switch for every channel
    pub enabled: bool,
    /// Email channel settings
    pub smtp: SmtpConfig,
    /// Chat webhook URL
    pub webhook_url: Option<String>,
    /// Chat webhook payload flavour
    pub webhook_type: WebhookType,
    /// Send the captured stack representation through the webhook
    pub webhook_include_stacktrace: bool,
    /// Time budget for one delivery, in seconds
    pub timeout_secs: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            smtp: SmtpConfig::default(),
            webhook_url: None,
            webhook_type: WebhookType::default(),
            webhook_include_stacktrace: false,
            timeout_secs: default_notification_timeout(),
        }
    }
}

impl NotificationConfig {
    /// Time budget for one delivery
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Why the email channel cannot be used, if it cannot
    pub fn email_missing_settings(&self) -> Option<&'static str> {
        if self.smtp.host.as_deref().is_none_or(str::is_empty) {
            return Some("SMTP host is not configured");
        }
        let user = self.smtp.user.as_deref().is_some_and(|user| !user.is_empty());
        let password = self.smtp.password.as_deref().is_some_and(|pw| !pw.is_empty());
        if !(user && password) {
            return Some("SMTP credentials are not configured");
        }
        None
    }

    /// Why the webhook channel cannot be used, if it cannot
    pub fn webhook_missing_settings(&self) -> Option<&'static str> {
        if self.webhook_url.as_deref().is_none_or(|url| url.trim().is_empty()) {
            return Some("webhook URL is not configured");
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webhook_type_parsing() {
        assert_eq!("slack".parse::<WebhookType>().unwrap(), WebhookType::Slack);
        assert_eq!("GCHAT".parse::<WebhookType>().unwrap(), WebhookType::Gchat);
        assert_eq!(
            "google_chat".parse::<WebhookType>().unwrap(),
            WebhookType::Gchat
        );
        assert!("teams".parse::<WebhookType>().is_err());
    }

    #[test]
    fn test_email_requires_host_and_credentials() {
        let mut config = NotificationConfig::default();
        assert_eq!(
            config.email_missing_settings(),
            Some("SMTP host is not configured")
        );

        config.smtp.host = Some("smtp.example.com".to_string());
        assert_eq!(
            config.email_missing_settings(),
            Some("SMTP credentials are not configured")
        );

        config.smtp.user = Some("bot@example.com".to_string());
        assert_eq!(
            config.email_missing_settings(),
            Some("SMTP credentials are not configured")
        );

        config.smtp.password = Some(String::new());
        assert!(config.email_missing_settings().is_some());

        config.smtp.password = Some("app-password".to_string());
        assert_eq!(config.email_missing_settings(), None);
    }

    #[test]
    fn test_webhook_requires_non_empty_url() {
        let mut config = NotificationConfig::default();
        assert!(config.webhook_missing_settings().is_some());

        config.webhook_url = Some("   ".to_string());
        assert!(config.webhook_missing_settings().is_some());

        config.webhook_url = Some("https://hooks.slack.com/services/x".to_string());
        assert!(config.webhook_missing_settings().is_none());
    }

    #[test]
    fn test_sender_falls_back_to_user() {
        let mut smtp = SmtpConfig {
            user: Some("bot@example.com".to_string()),
            ..SmtpConfig::default()
        };
        assert_eq!(smtp.sender(), Some("bot@example.com"));

        smtp.from = Some("alerts@example.com".to_string());
        assert_eq!(smtp.sender(), Some("alerts@example.com"));
    }

    #[test]
    fn test_password_is_masked_when_serialized() {
        let smtp = SmtpConfig {
            password: Some("hunter2".to_string()),
            ..SmtpConfig::default()
        };
        let json = serde_json::to_string(&smtp).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(json.contains("********"));
    }
}
