//! Alerting module for webhook notifications
//!
//! Impossible travel detections are queued as [`TravelAlert`]s and sent by an
//! async dispatcher to Slack, Discord and generic webhooks. Delivery problems
//! are logged and never affect the analysis that raised the alert.

use crate::config::{AlertConfig, DiscordConfig, SlackConfig, WebhookConfig};
use crate::detection::{Verdict, VerdictReason};
use crate::models::AnalysisResult;
use chrono::{DateTime, FixedOffset};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

/// Cruising speed of a commercial flight, used to grade severity
pub const COMMERCIAL_FLIGHT_KMH: f64 = 900.0;

const QUEUE_CAPACITY: usize = 100;

/// Errors that can occur during alert dispatch
#[derive(Error, Debug)]
pub enum AlertError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Alert channel closed")]
    ChannelClosed,
}

/// Notification payload for one detection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TravelAlert {
    pub severity: u8,
    pub rule_name: String,
    pub user: String,
    pub current_ip: String,
    pub previous_ip: String,
    pub previous_location: String,
    pub current_location: String,
    pub distance_km: f64,
    pub time_difference_minutes: f64,
    /// `None` when both logins share the same instant
    pub implied_speed_kmh: Option<f64>,
    pub timestamp: DateTime<FixedOffset>,
    pub message: String,
}

impl TravelAlert {
    /// Build an alert for a detected analysis; `None` when nothing was detected
    pub fn from_analysis(
        result: &AnalysisResult,
        verdict: &Verdict,
        timestamp: DateTime<FixedOffset>,
    ) -> Option<Self> {
        if !verdict.detected {
            return None;
        }
        let previous = result.previous_login.as_ref()?;
        let distance_km = verdict.distance_km?;
        let minutes = verdict.elapsed_minutes?;

        let implied_speed_kmh = (minutes > 0.0).then(|| distance_km / (minutes / 60.0));
        let rule_name = match verdict.reason {
            VerdictReason::CountryChange => "Impossible Travel: Country Change",
            _ => "Impossible Travel: Distant Relocation",
        };

        Some(TravelAlert {
            severity: Self::calculate_severity(verdict.reason, implied_speed_kmh),
            rule_name: rule_name.to_string(),
            user: result.subject.clone(),
            current_ip: result.current_ip.clone(),
            previous_ip: previous.source_ip.clone(),
            previous_location: display_location(&previous.location.city, &previous.location.country),
            current_location: display_location(
                &result.current_location.city,
                &result.current_location.country,
            ),
            distance_km,
            time_difference_minutes: minutes,
            implied_speed_kmh,
            timestamp,
            message: result.message.clone(),
        })
    }

    fn calculate_severity(reason: VerdictReason, implied_speed_kmh: Option<f64>) -> u8 {
        match implied_speed_kmh {
            // Same instant from two places
            None => 10,
            Some(speed) if speed > COMMERCIAL_FLIGHT_KMH * 10.0 => 10,
            _ if reason == VerdictReason::CountryChange => 9,
            _ => 8,
        }
    }
}

fn display_location(city: &str, country: &str) -> String {
    match (city.is_empty(), country.is_empty()) {
        (false, false) => format!("{}, {}", city, country),
        (true, false) => country.to_string(),
        (false, true) => city.to_string(),
        (true, true) => "Unknown".to_string(),
    }
}

/// Async alert dispatcher
///
/// Receives alerts from an [`AlertQueue`] and sends them to every configured
/// notification channel. Run it as a tokio task with `run()`.
pub struct AlertDispatcher {
    config: AlertConfig,
    client: Client,
}

impl AlertDispatcher {
    pub fn new(config: AlertConfig) -> Result<Self, AlertError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(AlertDispatcher { config, client })
    }

    /// Create the channel that connects an [`AlertQueue`] to a dispatcher
    pub fn create_channel() -> (AlertQueue, mpsc::Receiver<TravelAlert>) {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        (AlertQueue::new(tx), rx)
    }

    /// Whether an alert passes the enabled flag and severity filter
    pub fn should_dispatch(&self, alert: &TravelAlert) -> bool {
        self.config.enabled && alert.severity >= self.config.min_severity
    }

    /// Run the alert dispatch loop until every queue handle is dropped
    pub async fn run(self, mut rx: mpsc::Receiver<TravelAlert>) {
        log::info!("Alert dispatcher started");

        while let Some(alert) = rx.recv().await {
            if !self.should_dispatch(&alert) {
                log::debug!(
                    "Skipping alert for {} (severity {} < min {})",
                    alert.user,
                    alert.severity,
                    self.config.min_severity
                );
                continue;
            }

            log::info!(
                "Dispatching alert: {} for {} (severity {})",
                alert.rule_name,
                alert.user,
                alert.severity
            );

            if let Err(e) = self.dispatch_alert(&alert).await {
                log::error!("Failed to dispatch alert: {}", e);
            }
        }

        log::info!("Alert dispatcher stopped");
    }

    /// Dispatch an alert to all configured channels
    async fn dispatch_alert(&self, alert: &TravelAlert) -> Result<(), AlertError> {
        let mut first_error = None;

        if let Some(ref slack) = self.config.slack {
            if let Err(e) = self.send_slack_alert(slack, alert).await {
                log::error!("Slack alert failed: {}", e);
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }

        if let Some(ref discord) = self.config.discord {
            if let Err(e) = self.send_discord_alert(discord, alert).await {
                log::error!("Discord alert failed: {}", e);
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }

        for webhook in &self.config.webhooks {
            if let Err(e) = self.send_generic_webhook(webhook, alert).await {
                log::error!("Webhook {} failed: {}", webhook.name, e);
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn send_slack_alert(
        &self,
        config: &SlackConfig,
        alert: &TravelAlert,
    ) -> Result<(), AlertError> {
        let payload = slack_payload(config, alert);
        let response = self
            .client
            .post(&config.webhook_url)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            log::warn!("Slack returned non-success status: {}", response.status());
        }

        Ok(())
    }

    async fn send_discord_alert(
        &self,
        config: &DiscordConfig,
        alert: &TravelAlert,
    ) -> Result<(), AlertError> {
        let payload = discord_payload(config, alert);
        let response = self
            .client
            .post(&config.webhook_url)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            log::warn!("Discord returned non-success status: {}", response.status());
        }

        Ok(())
    }

    async fn send_generic_webhook(
        &self,
        config: &WebhookConfig,
        alert: &TravelAlert,
    ) -> Result<(), AlertError> {
        let method = config.method.as_deref().unwrap_or("POST");

        let mut request = match method.to_uppercase().as_str() {
            "PUT" => self.client.put(&config.url),
            _ => self.client.post(&config.url),
        };

        if let Some(ref headers) = config.headers {
            for (key, value) in headers {
                request = request.header(key, value);
            }
        }

        let response = request.json(alert).send().await?;

        if !response.status().is_success() {
            log::warn!(
                "Webhook {} returned non-success status: {}",
                config.name,
                response.status()
            );
        }

        Ok(())
    }
}

fn slack_payload(config: &SlackConfig, alert: &TravelAlert) -> serde_json::Value {
    let color = if alert.severity >= 9 { "danger" } else { "warning" };
    let speed = alert
        .implied_speed_kmh
        .map(|s| format!("{:.0} km/h", s))
        .unwrap_or_else(|| "simultaneous".to_string());

    serde_json::json!({
        "channel": config.channel,
        "username": config.username.as_deref().unwrap_or("Travel Sentinel"),
        "icon_emoji": ":airplane:",
        "attachments": [{
            "color": color,
            "title": format!(":rotating_light: {}", alert.rule_name),
            "fields": [
                { "title": "User", "value": &alert.user, "short": true },
                { "title": "Severity", "value": alert.severity.to_string(), "short": true },
                { "title": "From", "value": format!("{} ({})", alert.previous_location, alert.previous_ip), "short": true },
                { "title": "To", "value": format!("{} ({})", alert.current_location, alert.current_ip), "short": true },
                { "title": "Distance", "value": format!("{:.2} km", alert.distance_km), "short": true },
                { "title": "Implied speed", "value": speed, "short": true },
            ],
            "text": &alert.message,
            "ts": alert.timestamp.timestamp(),
        }]
    })
}

fn discord_payload(config: &DiscordConfig, alert: &TravelAlert) -> serde_json::Value {
    let color = match alert.severity {
        10 => 0xFF0000, // Red
        9 => 0xFF6600,  // Orange
        _ => 0xFFCC00,  // Yellow
    };

    serde_json::json!({
        "username": config.username.as_deref().unwrap_or("Travel Sentinel"),
        "embeds": [{
            "title": format!(":airplane: {}", alert.rule_name),
            "description": &alert.message,
            "color": color,
            "fields": [
                { "name": "User", "value": &alert.user, "inline": true },
                { "name": "Severity", "value": format!("{}/10", alert.severity), "inline": true },
                { "name": "From", "value": &alert.previous_location, "inline": true },
                { "name": "To", "value": &alert.current_location, "inline": true },
            ],
            "timestamp": alert.timestamp.to_rfc3339(),
            "footer": {
                "text": "Travel Sentinel impossible travel detection"
            }
        }]
    })
}

/// Handle for queueing alerts from request handlers
///
/// Cloning is cheap. The dispatcher stops once every handle is dropped.
#[derive(Clone)]
pub struct AlertQueue {
    tx: mpsc::Sender<TravelAlert>,
}

impl AlertQueue {
    pub fn new(tx: mpsc::Sender<TravelAlert>) -> Self {
        AlertQueue { tx }
    }

    /// Queue an alert for dispatch (non-blocking)
    ///
    /// If the queue is full the alert is dropped and a warning logged.
    pub fn queue_alert(&self, alert: TravelAlert) {
        if let Err(e) = self.tx.try_send(alert) {
            match e {
                mpsc::error::TrySendError::Full(_) => {
                    log::warn!("Alert queue full, dropping alert");
                }
                mpsc::error::TrySendError::Closed(_) => {
                    log::warn!("Alert queue closed");
                }
            }
        }
    }

    /// Queue an alert, waiting for capacity
    pub async fn queue_alert_async(&self, alert: TravelAlert) -> Result<(), AlertError> {
        self.tx
            .send(alert)
            .await
            .map_err(|_| AlertError::ChannelClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
