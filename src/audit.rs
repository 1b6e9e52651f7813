// 📜 Audit Trail - Every registry change is an event
// SQLite (WAL mode) next to the CSV data files

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const AUDIT_FILE: &str = "audit.db";

pub const HOUSEHOLD_ADDED: &str = "household_added";
pub const HOUSEHOLD_REMOVED: &str = "household_removed";
pub const BUDGET_UPDATED: &str = "budget_updated";
pub const RESOURCES_ALLOCATED: &str = "resources_allocated";
pub const PLAN_EXPORTED: &str = "plan_exported";

/// Event for audit trail
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

/// Open (creating if needed) the audit database inside `data_dir`
pub fn open_audit(data_dir: &Path) -> Result<Connection> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data dir {:?}", data_dir))?;
    let path = data_dir.join(AUDIT_FILE);
    let conn = Connection::open(&path)
        .with_context(|| format!("Failed to open audit database {:?}", path))?;
    setup_audit(&conn)?;
    Ok(conn)
}

pub fn setup_audit(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events(timestamp)",
        [],
    )?;

    Ok(())
}

/// Insert event into audit trail
pub fn record_event(conn: &Connection, event: &Event) -> Result<()> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO events (
            event_id, timestamp, event_type, entity_type, entity_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.entity_type,
            event.entity_id,
            data_json,
            event.actor,
        ],
    )
    .context("Failed to record audit event")?;

    Ok(())
}

fn event_from_row(row: &Row) -> rusqlite::Result<Event> {
    let timestamp_str: String = row.get(1)?;
    let data_json: String = row.get(5)?;

    Ok(Event {
        event_id: row.get(0)?,
        timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
            })?
            .with_timezone(&Utc),
        event_type: row.get(2)?,
        entity_type: row.get(3)?,
        entity_id: row.get(4)?,
        data: serde_json::from_str(&data_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?,
        actor: row.get(6)?,
    })
}

/// Get events for a specific entity, newest first
pub fn events_for_entity(conn: &Connection, entity_type: &str, entity_id: &str) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
         FROM events
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY id DESC",
    )?;

    let events = stmt
        .query_map(params![entity_type, entity_id], event_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(events)
}

/// Most recent events across all entities, newest first
pub fn recent_events(conn: &Connection, limit: usize) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
         FROM events
         ORDER BY id DESC
         LIMIT ?1",
    )?;

    let events = stmt
        .query_map(params![limit as i64], event_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(events)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_audit() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_audit(&conn).unwrap();
        conn
    }

    #[test]
    fn test_record_and_query_by_entity() {
        let conn = memory_audit();

        record_event(
            &conn,
            &Event::new(HOUSEHOLD_ADDED, "household", "1", serde_json::json!({"name": "Santos"}), "cli"),
        )
        .unwrap();
        record_event(
            &conn,
            &Event::new(HOUSEHOLD_ADDED, "household", "2", serde_json::json!({"name": "Reyes"}), "cli"),
        )
        .unwrap();
        record_event(
            &conn,
            &Event::new(HOUSEHOLD_REMOVED, "household", "1", serde_json::json!({}), "server"),
        )
        .unwrap();

        let events = events_for_entity(&conn, "household", "1").unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, HOUSEHOLD_REMOVED);
        assert_eq!(events[1].data["name"], "Santos");
    }

    #[test]
    fn test_recent_events_limit() {
        let conn = memory_audit();
        for budget in [100_000, 120_000, 150_000] {
            record_event(
                &conn,
                &Event::new(BUDGET_UPDATED, "budget", "barangay", serde_json::json!({"budget": budget}), "treasurer"),
            )
            .unwrap();
        }

        let events = recent_events(&conn, 2).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data["budget"], 150_000);
    }

    #[test]
    fn test_event_round_trip_fields() {
        let conn = memory_audit();
        let event = Event::new(RESOURCES_ALLOCATED, "plan", "current", serde_json::json!({"total_cost": 3150}), "cli");
        record_event(&conn, &event).unwrap();

        let stored = recent_events(&conn, 1).unwrap().remove(0);
        assert_eq!(stored.event_id, event.event_id);
        assert_eq!(stored.actor, "cli");
        assert_eq!(stored.timestamp.timestamp(), event.timestamp.timestamp());
    }

    #[test]
    fn test_open_audit_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let conn = open_audit(dir.path()).unwrap();
        record_event(&conn, &Event::new(PLAN_EXPORTED, "plan", "current", serde_json::json!({}), "cli")).unwrap();
        assert!(dir.path().join(AUDIT_FILE).exists());
    }
}
