use anyhow::{bail, Result};
use chrono::Utc;
use rusqlite::{params, Connection, Row};

use crate::db::{
    connection::Database,
    helpers::{format_time, parse_datetime, parse_time, to_u8},
    models::UserAvailability,
};

fn row_to_availability(row: &Row) -> Result<UserAvailability> {
    let day_of_week: i64 = row.get("day_of_week")?;
    let start_time: String = row.get("start_time")?;
    let end_time: String = row.get("end_time")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    let slot = UserAvailability {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        day_of_week: to_u8(day_of_week, "day_of_week")?,
        start_time: parse_time(&start_time, "start_time")?,
        end_time: parse_time(&end_time, "end_time")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    };
    slot.validate()?;
    Ok(slot)
}

fn insert_slot(conn: &Connection, slot: &UserAvailability) -> Result<()> {
    conn.execute(
        "INSERT INTO user_availability (id, user_id, day_of_week, start_time, end_time, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            slot.id,
            slot.user_id,
            slot.day_of_week,
            format_time(slot.start_time),
            format_time(slot.end_time),
            slot.created_at.to_rfc3339(),
            slot.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Refuses `slot` when another slot of the same user and weekday shares a
/// minute with it. Times are stored as `%H:%M:%S`, so text order is time order.
fn ensure_no_overlap(conn: &Connection, slot: &UserAvailability) -> Result<()> {
    let overlapping: i64 = conn.query_row(
        "SELECT COUNT(*) FROM user_availability
         WHERE user_id = ?1
           AND day_of_week = ?2
           AND start_time < ?3
           AND end_time > ?4
           AND id != ?5",
        params![
            slot.user_id,
            slot.day_of_week,
            format_time(slot.end_time),
            format_time(slot.start_time),
            slot.id,
        ],
        |row| row.get(0),
    )?;
    if overlapping > 0 {
        bail!(
            "Availability slot {}-{} overlaps an existing slot of user {} on day {}",
            slot.start_time,
            slot.end_time,
            slot.user_id,
            slot.day_of_week
        );
    }
    Ok(())
}

fn ensure_disjoint(slots: &[UserAvailability]) -> Result<()> {
    let mut ordered: Vec<&UserAvailability> = slots.iter().collect();
    ordered.sort_by_key(|slot| (slot.day_of_week, slot.start_time));
    for pair in ordered.windows(2) {
        if pair[0].overlaps(pair[1]) {
            bail!(
                "Availability slots {}-{} and {}-{} overlap on day {}",
                pair[0].start_time,
                pair[0].end_time,
                pair[1].start_time,
                pair[1].end_time,
                pair[0].day_of_week
            );
        }
    }
    Ok(())
}

impl Database {
    /// Ordered by weekday (Sunday first), then start time.
    pub async fn list_availability(&self, user_id: &str) -> Result<Vec<UserAvailability>> {
        let user_id = user_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, day_of_week, start_time, end_time, created_at, updated_at
                 FROM user_availability
                 WHERE user_id = ?1
                 ORDER BY day_of_week ASC, start_time ASC",
            )?;
            let mut rows = stmt.query(params![user_id])?;
            let mut slots = Vec::new();
            while let Some(row) = rows.next()? {
                slots.push(row_to_availability(row)?);
            }
            Ok(slots)
        })
        .await
    }

    pub async fn insert_availability(&self, slot: &UserAvailability) -> Result<()> {
        slot.validate()?;
        let record = slot.clone();
        self.execute(move |conn| {
            ensure_no_overlap(conn, &record)?;
            insert_slot(conn, &record)
        })
        .await
    }

    pub async fn update_availability(&self, slot: &UserAvailability) -> Result<UserAvailability> {
        slot.validate()?;
        let mut record = slot.clone();
        record.updated_at = Utc::now();

        self.execute(move |conn| {
            ensure_no_overlap(conn, &record)?;
            let rows_affected = conn.execute(
                "UPDATE user_availability
                 SET day_of_week = ?1,
                     start_time = ?2,
                     end_time = ?3,
                     updated_at = ?4
                 WHERE id = ?5 AND user_id = ?6",
                params![
                    record.day_of_week,
                    format_time(record.start_time),
                    format_time(record.end_time),
                    record.updated_at.to_rfc3339(),
                    record.id,
                    record.user_id,
                ],
            )?;
            if rows_affected == 0 {
                bail!("Availability slot {} not found", record.id);
            }
            Ok(record)
        })
        .await
    }

    pub async fn delete_availability(&self, slot_id: &str) -> Result<()> {
        let slot_id = slot_id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "DELETE FROM user_availability WHERE id = ?1",
                params![slot_id],
            )?;
            if rows_affected == 0 {
                bail!("Availability slot {slot_id} not found");
            }
            Ok(())
        })
        .await
    }

    /// Swaps a user's whole weekly pattern in one transaction. The new
    /// slots must not overlap each other.
    pub async fn replace_availability(
        &self,
        user_id: &str,
        slots: Vec<UserAvailability>,
    ) -> Result<()> {
        for slot in &slots {
            slot.validate()?;
            if slot.user_id != user_id {
                bail!(
                    "Availability slot {} belongs to user {}, not {}",
                    slot.id,
                    slot.user_id,
                    user_id
                );
            }
        }
        ensure_disjoint(&slots)?;

        let user_id = user_id.to_string();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM user_availability WHERE user_id = ?1",
                params![user_id],
            )?;
            for slot in &slots {
                insert_slot(&tx, slot)?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }
}
