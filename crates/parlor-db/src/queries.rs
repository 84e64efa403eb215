use crate::models::{MessageRow, ParticipantRow};
use crate::Database;
use anyhow::Result;
use parlor_types::models::{BROADCAST_TARGET, Message, Participant};
use rusqlite::{Connection, ErrorCode};

/// Outcome of inserting a participant.
#[derive(Debug, PartialEq, Eq)]
pub enum Registration {
    Created(Participant),
    NameTaken,
}

/// Result of one eviction pass over the directory.
#[derive(Debug, Default)]
pub struct EvictionBatch {
    /// Participants that were removed and announced, in directory order.
    pub evicted: Vec<Participant>,
    /// Candidates that refreshed between the scan and their delete.
    pub refreshed: Vec<String>,
    /// Candidates whose delete/announce unit failed and was rolled back.
    pub failed: Vec<(String, anyhow::Error)>,
}

impl Database {
    // -- Participants --

    /// Insert a participant and its arrival notice atomically.
    ///
    /// Uniqueness is left to the `UNIQUE` constraint so two concurrent
    /// registrations of one name cannot both succeed.
    pub fn register_participant(&self, name: &str, now_ms: i64, time: &str) -> Result<Registration> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;

            match tx.execute(
                "INSERT INTO participants (name, last_seen) VALUES (?1, ?2)",
                rusqlite::params![name, now_ms],
            ) {
                Ok(_) => {}
                Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                    return Ok(Registration::NameTaken);
                }
                Err(e) => return Err(e.into()),
            }

            insert_message(&tx, &Message::arrival(name, time.to_string()))?;
            tx.commit()?;

            Ok(Registration::Created(Participant {
                name: name.to_string(),
                last_seen: now_ms,
            }))
        })
    }

    /// Refresh `last_seen`. Returns false if the participant is not active.
    pub fn touch_participant(&self, name: &str, now_ms: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE participants SET last_seen = ?1 WHERE name = ?2",
                rusqlite::params![now_ms, name],
            )?;
            Ok(updated > 0)
        })
    }

    pub fn list_participants(&self) -> Result<Vec<Participant>> {
        self.with_conn(|conn| {
            let rows = query_participants(conn, "SELECT name, last_seen FROM participants ORDER BY id", [])?;
            Ok(rows.into_iter().map(Participant::from).collect())
        })
    }

    /// Remove every participant with `now - last_seen > threshold` and
    /// append a departure notice for each one.
    ///
    /// Candidates are scanned first, then each one is evicted in its own
    /// transaction under a fresh lock acquisition. The delete re-checks the
    /// cutoff, so a heartbeat that lands after the scan keeps the
    /// participant, and a participant is never announced twice.
    pub fn evict_stale(&self, now_ms: i64, threshold_ms: i64, time: &str) -> Result<EvictionBatch> {
        let cutoff = now_ms - threshold_ms;

        let candidates = self.with_conn(|conn| {
            query_participants(
                conn,
                "SELECT name, last_seen FROM participants WHERE last_seen < ?1 ORDER BY id",
                [cutoff],
            )
        })?;

        let mut batch = EvictionBatch::default();
        for candidate in candidates {
            match self.with_conn(|conn| evict_one(conn, &candidate.name, cutoff, time)) {
                Ok(true) => batch.evicted.push(candidate.into()),
                Ok(false) => batch.refreshed.push(candidate.name),
                Err(e) => batch.failed.push((candidate.name, e)),
            }
        }

        Ok(batch)
    }

    // -- Messages --

    /// Append only if `message.from` is an active participant. The check and
    /// the insert share one lock acquisition, so a concurrent sweep cannot
    /// evict the sender in between.
    pub fn append_message_from_active(&self, message: &Message) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            let active: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM participants WHERE name = ?1)",
                [&message.from],
                |row| row.get(0),
            )?;
            if !active {
                return Ok(None);
            }
            insert_message(conn, message).map(Some)
        })
    }

    /// Messages `participant` may see, oldest first. With `limit`, only the
    /// newest `limit` of them are returned.
    pub fn list_visible_messages(&self, participant: &str, limit: Option<usize>) -> Result<Vec<Message>> {
        // SQLite treats a negative LIMIT as unbounded
        let limit = limit.map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX));

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, sender, recipient, body, kind, time
                 FROM messages
                 WHERE recipient = ?1 OR recipient = ?2 OR sender = ?2
                 ORDER BY id DESC
                 LIMIT ?3",
            )?;

            let mut rows = stmt
                .query_map(rusqlite::params![BROADCAST_TARGET, participant, limit], |row| {
                    Ok(MessageRow {
                        id: row.get(0)?,
                        sender: row.get(1)?,
                        recipient: row.get(2)?,
                        body: row.get(3)?,
                        kind: row.get(4)?,
                        time: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.reverse();
            Ok(rows.into_iter().map(Message::from).collect())
        })
    }
}

/// Delete one stale participant and announce the departure. Returns false
/// (and writes nothing) when the participant is gone or no longer stale.
fn evict_one(conn: &Connection, name: &str, cutoff: i64, time: &str) -> Result<bool> {
    let tx = conn.unchecked_transaction()?;

    let removed = tx.execute(
        "DELETE FROM participants WHERE name = ?1 AND last_seen < ?2",
        rusqlite::params![name, cutoff],
    )?;
    if removed == 0 {
        return Ok(false);
    }

    insert_message(&tx, &Message::departure(name, time.to_string()))?;
    tx.commit()?;
    Ok(true)
}

fn insert_message(conn: &Connection, message: &Message) -> Result<i64> {
    conn.execute(
        "INSERT INTO messages (sender, recipient, body, kind, time) VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            message.from,
            message.to,
            message.text,
            message.kind.as_str(),
            message.time,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn query_participants<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<ParticipantRow>> {
    let mut stmt = conn.prepare(sql)?;

    let rows = stmt
        .query_map(params, |row| {
            Ok(ParticipantRow {
                name: row.get(0)?,
                last_seen: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}
