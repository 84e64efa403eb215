use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use parlor_db::Database;
use parlor_db::queries::Registration;
use parlor_types::api::{RegisterRequest, SendMessageRequest};
use parlor_types::models::{Message, Participant};

use crate::clock::Clock;
use crate::error::ChatError;
use crate::sweeper::SweepReport;
use crate::validation;

pub type AppState = Arc<ChatService>;

/// Orchestrates the participant directory and the message log.
///
/// Storage calls run on the blocking pool. Request-path calls are bounded by
/// `storage_timeout` and an overrun is reported as transient. The sweep is
/// not bounded.
pub struct ChatService {
    db: Arc<Database>,
    clock: Arc<dyn Clock>,
    storage_timeout: Duration,
}

impl ChatService {
    pub fn new(db: Arc<Database>, clock: Arc<dyn Clock>, storage_timeout: Duration) -> Self {
        Self {
            db,
            clock,
            storage_timeout,
        }
    }

    pub async fn register(&self, req: &RegisterRequest) -> Result<Participant, ChatError> {
        let name = validation::participant_name(req)?;
        let now = self.clock.now_millis();
        let time = self.clock.display_time();

        let n = name.clone();
        let outcome = self
            .storage("register", move |db| db.register_participant(&n, now, &time))
            .await?;

        match outcome {
            Registration::Created(participant) => {
                info!(participant = %participant.name, "Participant registered");
                Ok(participant)
            }
            Registration::NameTaken => Err(ChatError::Conflict(format!(
                "participant '{}' already exists",
                name
            ))),
        }
    }

    pub async fn list_participants(&self) -> Result<Vec<Participant>, ChatError> {
        self.storage("list_participants", |db| db.list_participants())
            .await
    }

    pub async fn post_message(
        &self,
        from: Option<&str>,
        req: &SendMessageRequest,
    ) -> Result<Message, ChatError> {
        let new = validation::new_message(req)?;
        let from = from.unwrap_or_default();

        let message = Message {
            from: from.to_string(),
            to: new.to,
            text: new.text,
            kind: new.kind,
            time: self.clock.display_time(),
        };

        let m = message.clone();
        let appended = self
            .storage("post_message", move |db| db.append_message_from_active(&m))
            .await?;

        match appended {
            Some(_) => Ok(message),
            None => Err(ChatError::Conflict(format!(
                "participant '{}' does not exist",
                from
            ))),
        }
    }

    /// Visible messages, oldest first. With a positive `limit`, only the
    /// newest `limit` are returned.
    pub async fn list_messages(
        &self,
        participant: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<Message>, ChatError> {
        let participant = participant.unwrap_or_default().to_string();
        self.storage("list_messages", move |db| {
            db.list_visible_messages(&participant, limit)
        })
        .await
    }

    pub async fn heartbeat(&self, participant: Option<&str>) -> Result<(), ChatError> {
        let name = participant.unwrap_or_default().to_string();
        let now = self.clock.now_millis();

        let n = name.clone();
        let touched = self
            .storage("heartbeat", move |db| db.touch_participant(&n, now))
            .await?;

        if touched {
            Ok(())
        } else {
            Err(ChatError::NotFound(format!(
                "participant '{}' is not active",
                name
            )))
        }
    }

    /// Evict everyone idle for longer than `stale_after` and announce each
    /// departure.
    ///
    /// Each eviction commits on its own, so the sweep always runs to the end
    /// and the report covers every unit it applied. A slow sweep is logged,
    /// not cut short.
    pub async fn sweep(&self, stale_after: Duration) -> Result<SweepReport, ChatError> {
        let now = self.clock.now_millis();
        let time = self.clock.display_time();
        let threshold = i64::try_from(stale_after.as_millis()).unwrap_or(i64::MAX);

        let started = Instant::now();
        let db = self.db.clone();
        let batch = tokio::task::spawn_blocking(move || db.evict_stale(now, threshold, &time))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error in sweep: {}", e);
                ChatError::Unexpected(e.into())
            })?
            .map_err(ChatError::storage)?;

        let elapsed = started.elapsed();
        if elapsed > self.storage_timeout {
            warn!(
                "sweep took {:?}, over the {:?} storage timeout",
                elapsed, self.storage_timeout
            );
        }

        Ok(SweepReport::from(batch))
    }

    async fn storage<F, T>(&self, op: &'static str, f: F) -> Result<T, ChatError>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        let task = tokio::task::spawn_blocking(move || f(db.as_ref()));

        match tokio::time::timeout(self.storage_timeout, task).await {
            Ok(Ok(result)) => result.map_err(ChatError::storage),
            Ok(Err(e)) => {
                error!("spawn_blocking join error in {}: {}", op, e);
                Err(ChatError::Unexpected(e.into()))
            }
            Err(_) => {
                warn!("{} timed out after {:?}", op, self.storage_timeout);
                Err(ChatError::TransientStorage(format!("{} timed out", op)))
            }
        }
    }
}
