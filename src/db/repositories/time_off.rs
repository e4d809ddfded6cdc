use anyhow::{anyhow, bail, Result};
use chrono::{NaiveDate, Utc};
use rusqlite::{params, OptionalExtension, Row, ToSql};

use crate::db::{
    connection::Database,
    helpers::{
        format_date, format_date_bound, parse_date, parse_datetime, parse_optional_datetime,
        placeholders,
    },
    models::{RequestType, TimeOffFilter, TimeOffStatus, TimeOffWindow},
};
use crate::log_info;

const ENABLE_LOGS: bool = true;

const TIME_OFF_COLUMNS: &str = "id, user_id, start_date, end_date, status, request_type, notes,
     approved_by, approved_at, created_at, updated_at";

fn row_to_time_off(row: &Row) -> Result<TimeOffWindow> {
    let start_date: String = row.get("start_date")?;
    let end_date: String = row.get("end_date")?;
    let status: String = row.get("status")?;
    let request_type: String = row.get("request_type")?;
    let approved_at: Option<String> = row.get("approved_at")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    let window = TimeOffWindow {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        start_date: parse_date(&start_date, "start_date")?,
        end_date: parse_date(&end_date, "end_date")?,
        status: status.parse::<TimeOffStatus>()?,
        request_type: request_type.parse::<RequestType>()?,
        notes: row.get("notes")?,
        approved_by: row.get("approved_by")?,
        approved_at: parse_optional_datetime(approved_at, "approved_at")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    };
    window.validate()?;
    Ok(window)
}

fn fetch_time_off(conn: &rusqlite::Connection, id: &str) -> Result<Option<TimeOffWindow>> {
    let query = format!("SELECT {TIME_OFF_COLUMNS} FROM time_off_requests WHERE id = ?1");
    let mut stmt = conn.prepare(&query)?;
    let window = stmt
        .query_row(params![id], |row| Ok(row_to_time_off(row)))
        .optional()?
        .transpose()?;
    Ok(window)
}

impl Database {
    /// Files a new request. It is always stored as `pending`, and is
    /// refused when it overlaps another request of the same user that has
    /// not been rejected.
    pub async fn insert_time_off(&self, window: &TimeOffWindow) -> Result<TimeOffWindow> {
        window.validate()?;
        let mut record = window.clone();
        record.status = TimeOffStatus::Pending;
        record.approved_by = None;
        record.approved_at = None;

        self.execute(move |conn| {
            let overlapping: i64 = conn.query_row(
                "SELECT COUNT(*) FROM time_off_requests
                 WHERE user_id = ?1
                   AND status != 'rejected'
                   AND start_date <= ?2
                   AND end_date >= ?3",
                params![
                    record.user_id,
                    format_date(record.end_date),
                    format_date(record.start_date),
                ],
                |row| row.get(0),
            )?;
            if overlapping > 0 {
                bail!(
                    "Overlapping time off request exists for user {} between {} and {}",
                    record.user_id,
                    record.start_date,
                    record.end_date
                );
            }

            conn.execute(
                "INSERT INTO time_off_requests
                 (id, user_id, start_date, end_date, status, request_type, notes, approved_by, approved_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL, NULL, ?8, ?9)",
                params![
                    record.id,
                    record.user_id,
                    format_date(record.start_date),
                    format_date(record.end_date),
                    record.status.as_str(),
                    record.request_type.as_str(),
                    record.notes,
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                ],
            )?;

            Ok(record)
        })
        .await
    }

    pub async fn get_time_off(&self, request_id: &str) -> Result<Option<TimeOffWindow>> {
        let request_id = request_id.to_string();
        self.execute(move |conn| fetch_time_off(conn, &request_id))
            .await
    }

    /// Newest start date first.
    pub async fn list_time_off(&self, filter: TimeOffFilter) -> Result<Vec<TimeOffWindow>> {
        self.execute(move |conn| {
            let mut clauses = Vec::new();
            let mut params_vec: Vec<Box<dyn ToSql>> = Vec::new();

            if let Some(user_id) = filter.user_id {
                clauses.push("user_id = ?");
                params_vec.push(Box::new(user_id));
            }
            if let Some(status) = filter.status {
                clauses.push("status = ?");
                params_vec.push(Box::new(status.as_str()));
            }

            let mut query = format!("SELECT {TIME_OFF_COLUMNS} FROM time_off_requests");
            if !clauses.is_empty() {
                query.push_str(" WHERE ");
                query.push_str(&clauses.join(" AND "));
            }
            query.push_str(" ORDER BY start_date DESC, created_at DESC");

            let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|b| b.as_ref()).collect();

            let mut stmt = conn.prepare(&query)?;
            let mut rows = stmt.query(params_refs.as_slice())?;
            let mut windows = Vec::new();
            while let Some(row) = rows.next()? {
                windows.push(row_to_time_off(row)?);
            }
            Ok(windows)
        })
        .await
    }

    /// Approved requests of `user_ids` that touch `[start, end]`.
    pub async fn list_approved_time_off_in_range(
        &self,
        user_ids: Vec<String>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TimeOffWindow>> {
        if user_ids.is_empty() || end < start {
            return Ok(Vec::new());
        }

        self.execute(move |conn| {
            let query = format!(
                "SELECT {TIME_OFF_COLUMNS} FROM time_off_requests
                 WHERE user_id IN ({})
                   AND status = 'approved'
                   AND start_date <= ?
                   AND end_date >= ?
                 ORDER BY start_date ASC",
                placeholders(user_ids.len())
            );

            let mut params_vec: Vec<Box<dyn ToSql>> = user_ids
                .into_iter()
                .map(|id| Box::new(id) as Box<dyn ToSql>)
                .collect();
            params_vec.push(Box::new(format_date_bound(end)));
            params_vec.push(Box::new(format_date_bound(start)));
            let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|b| b.as_ref()).collect();

            let mut stmt = conn.prepare(&query)?;
            let mut rows = stmt.query(params_refs.as_slice())?;
            let mut windows = Vec::new();
            while let Some(row) = rows.next()? {
                windows.push(row_to_time_off(row)?);
            }
            Ok(windows)
        })
        .await
    }

    /// Approving records the approver and time; any other status clears them.
    pub async fn update_time_off_status(
        &self,
        request_id: &str,
        status: TimeOffStatus,
        approver: Option<String>,
    ) -> Result<TimeOffWindow> {
        let request_id = request_id.to_string();
        self.execute(move |conn| {
            let now = Utc::now();
            let (approved_by, approved_at) = match status {
                TimeOffStatus::Approved => (approver, Some(now.to_rfc3339())),
                _ => (None, None),
            };

            let rows_affected = conn.execute(
                "UPDATE time_off_requests
                 SET status = ?1,
                     approved_by = ?2,
                     approved_at = ?3,
                     updated_at = ?4
                 WHERE id = ?5",
                params![
                    status.as_str(),
                    approved_by,
                    approved_at,
                    now.to_rfc3339(),
                    request_id,
                ],
            )?;
            if rows_affected == 0 {
                bail!("Time off request {request_id} not found");
            }

            log_info!("Time off request {} marked {}", request_id, status.as_str());

            fetch_time_off(conn, &request_id)?
                .ok_or_else(|| anyhow!("Time off request {request_id} not found after update"))
        })
        .await
    }

    pub async fn delete_time_off(&self, request_id: &str) -> Result<()> {
        let request_id = request_id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "DELETE FROM time_off_requests WHERE id = ?1",
                params![request_id],
            )?;
            if rows_affected == 0 {
                bail!("Time off request {request_id} not found");
            }
            Ok(())
        })
        .await
    }
}
