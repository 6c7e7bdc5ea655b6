use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tokio::sync::broadcast;

use crate::{
    config::NotifierConfig,
    error::Result,
    repository::{CheckinRepository, PaymentRepository, UserRepository},
};

/// One push event on the dashboard channel.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Connection,
    CheckinUpdate,
    PaymentUpdate,
    UserUpdate,
    ManualUpdate,
}

/// Polls the database for recent writes and fans summaries out to every
/// connected dashboard client over a broadcast channel. One timer for
/// the whole process, independent of how many clients are connected.
pub struct ChangeNotifier {
    checkin_repo: Arc<dyn CheckinRepository>,
    payment_repo: Arc<dyn PaymentRepository>,
    user_repo: Arc<dyn UserRepository>,
    sender: broadcast::Sender<DashboardEvent>,
    tick: Duration,
    lookback: chrono::Duration,
}

impl ChangeNotifier {
    pub fn new(
        checkin_repo: Arc<dyn CheckinRepository>,
        payment_repo: Arc<dyn PaymentRepository>,
        user_repo: Arc<dyn UserRepository>,
        config: &NotifierConfig,
    ) -> Self {
        let (sender, _) = broadcast::channel(64);
        Self {
            checkin_repo,
            payment_repo,
            user_repo,
            sender,
            tick: Duration::from_secs(config.tick_seconds),
            lookback: chrono::Duration::seconds(config.lookback_seconds),
        }
    }

    /// New subscribers receive only events broadcast after this call;
    /// whether they catch an in-flight tick's events depends on timing,
    /// same as any pub/sub join.
    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.sender.subscribe()
    }

    /// The acknowledgement sent to a client the moment its connection
    /// opens.
    pub fn connection_event(&self) -> DashboardEvent {
        DashboardEvent {
            kind: EventKind::Connection,
            message: "Conectado ao dashboard em tempo real".to_string(),
            timestamp: Utc::now(),
            data: json!({}),
        }
    }

    /// Pushes a `manual_update` immediately, outside the timer.
    pub fn notify_manual(&self, message: &str) {
        self.broadcast(DashboardEvent {
            kind: EventKind::ManualUpdate,
            message: message.to_string(),
            timestamp: Utc::now(),
            data: json!({}),
        });
    }

    /// One polling pass: three recent-insert counts, one event per
    /// nonzero count. Returns the events it broadcast, which is what the
    /// tests assert on.
    pub async fn poll_once(&self) -> Result<Vec<DashboardEvent>> {
        let cutoff = Utc::now() - self.lookback;
        let mut events = Vec::new();

        let checkins = self.checkin_repo.count_since(cutoff).await?;
        if checkins > 0 {
            events.push(DashboardEvent {
                kind: EventKind::CheckinUpdate,
                message: "Novos checkins realizados".to_string(),
                timestamp: Utc::now(),
                data: json!({ "count": checkins }),
            });
        }

        let payments = self.payment_repo.count_paid_since(cutoff).await?;
        if payments > 0 {
            events.push(DashboardEvent {
                kind: EventKind::PaymentUpdate,
                message: "Novos pagamentos realizados".to_string(),
                timestamp: Utc::now(),
                data: json!({ "count": payments }),
            });
        }

        let users = self.user_repo.count_created_since(cutoff).await?;
        if users > 0 {
            events.push(DashboardEvent {
                kind: EventKind::UserUpdate,
                message: "Novos usuários cadastrados".to_string(),
                timestamp: Utc::now(),
                data: json!({ "count": users }),
            });
        }

        for event in &events {
            self.broadcast(event.clone());
        }

        Ok(events)
    }

    /// Runs the polling loop until the process shuts down. A failed tick
    /// is logged and skipped; the timer keeps going.
    pub fn spawn(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.tick);
            loop {
                interval.tick().await;
                if let Err(e) = self.poll_once().await {
                    tracing::error!("Change notifier tick failed: {}", e);
                }
            }
        })
    }

    fn broadcast(&self, event: DashboardEvent) {
        // Send only fails when nobody is subscribed, which is fine.
        let _ = self.sender.send(event);
    }
}
