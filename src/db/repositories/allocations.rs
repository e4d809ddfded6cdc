use anyhow::{bail, Result};
use chrono::{NaiveDate, Utc};
use rusqlite::{params, OptionalExtension, Row, ToSql};

use crate::db::{
    connection::Database,
    helpers::{
        format_date, format_date_bound, parse_date, parse_datetime, parse_optional_date,
        placeholders, to_u32,
    },
    models::{Allocation, AllocationFilter},
};

const ALLOCATION_COLUMNS: &str = "id, user_id, project_id, task_id, allocation_percentage,
     start_date, end_date, created_at, updated_at";

fn row_to_allocation(row: &Row) -> Result<Allocation> {
    let allocation_percentage: i64 = row.get("allocation_percentage")?;
    let start_date: String = row.get("start_date")?;
    let end_date: Option<String> = row.get("end_date")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    let allocation = Allocation {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        project_id: row.get("project_id")?,
        task_id: row.get("task_id")?,
        allocation_percentage: to_u32(allocation_percentage, "allocation_percentage")?,
        start_date: parse_date(&start_date, "start_date")?,
        end_date: parse_optional_date(end_date, "end_date")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    };
    allocation.validate()?;
    Ok(allocation)
}

impl Database {
    /// Stores an allocation as-is. A user's summed percentage is allowed to
    /// exceed 100 here; overallocation is reported when calendars are read.
    pub async fn insert_allocation(&self, allocation: &Allocation) -> Result<()> {
        allocation.validate()?;
        let record = allocation.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO resource_allocations
                 (id, user_id, project_id, task_id, allocation_percentage, start_date, end_date, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    record.id,
                    record.user_id,
                    record.project_id,
                    record.task_id,
                    record.allocation_percentage,
                    format_date(record.start_date),
                    record.end_date.map(format_date),
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn get_allocation(&self, allocation_id: &str) -> Result<Option<Allocation>> {
        let allocation_id = allocation_id.to_string();
        self.execute(move |conn| {
            let query =
                format!("SELECT {ALLOCATION_COLUMNS} FROM resource_allocations WHERE id = ?1");
            let mut stmt = conn.prepare(&query)?;
            let allocation = stmt
                .query_row(params![allocation_id], |row| Ok(row_to_allocation(row)))
                .optional()?
                .transpose()?;
            Ok(allocation)
        })
        .await
    }

    /// Newest start date first.
    pub async fn list_allocations(&self, filter: AllocationFilter) -> Result<Vec<Allocation>> {
        self.execute(move |conn| {
            let mut clauses = Vec::new();
            let mut params_vec: Vec<Box<dyn ToSql>> = Vec::new();

            if let Some(user_id) = filter.user_id {
                clauses.push("user_id = ?");
                params_vec.push(Box::new(user_id));
            }
            if let Some(project_id) = filter.project_id {
                clauses.push("project_id = ?");
                params_vec.push(Box::new(project_id));
            }

            let mut query = format!("SELECT {ALLOCATION_COLUMNS} FROM resource_allocations");
            if !clauses.is_empty() {
                query.push_str(" WHERE ");
                query.push_str(&clauses.join(" AND "));
            }
            query.push_str(" ORDER BY start_date DESC, created_at DESC");

            let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|b| b.as_ref()).collect();

            let mut stmt = conn.prepare(&query)?;
            let mut rows = stmt.query(params_refs.as_slice())?;
            let mut allocations = Vec::new();
            while let Some(row) = rows.next()? {
                allocations.push(row_to_allocation(row)?);
            }
            Ok(allocations)
        })
        .await
    }

    /// Allocations of `user_ids` that touch `[start, end]`, oldest start
    /// first. Open-ended allocations match every range after their start.
    pub async fn list_allocations_in_range(
        &self,
        user_ids: Vec<String>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Allocation>> {
        if user_ids.is_empty() || end < start {
            return Ok(Vec::new());
        }

        self.execute(move |conn| {
            let query = format!(
                "SELECT {ALLOCATION_COLUMNS} FROM resource_allocations
                 WHERE user_id IN ({})
                   AND start_date <= ?
                   AND (end_date IS NULL OR end_date >= ?)
                 ORDER BY start_date ASC, created_at ASC",
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
            let mut allocations = Vec::new();
            while let Some(row) = rows.next()? {
                allocations.push(row_to_allocation(row)?);
            }
            Ok(allocations)
        })
        .await
    }

    /// Rewrites percentage, dates and task of an existing allocation.
    /// The user and project of an allocation never change.
    pub async fn update_allocation(&self, allocation: &Allocation) -> Result<Allocation> {
        allocation.validate()?;
        let mut record = allocation.clone();
        record.updated_at = Utc::now();

        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE resource_allocations
                 SET allocation_percentage = ?1,
                     start_date = ?2,
                     end_date = ?3,
                     task_id = ?4,
                     updated_at = ?5
                 WHERE id = ?6",
                params![
                    record.allocation_percentage,
                    format_date(record.start_date),
                    record.end_date.map(format_date),
                    record.task_id,
                    record.updated_at.to_rfc3339(),
                    record.id,
                ],
            )?;

            if rows_affected == 0 {
                bail!("Resource allocation {} not found", record.id);
            }

            Ok(record)
        })
        .await
    }

    pub async fn delete_allocation(&self, allocation_id: &str) -> Result<()> {
        let allocation_id = allocation_id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "DELETE FROM resource_allocations WHERE id = ?1",
                params![allocation_id],
            )?;
            if rows_affected == 0 {
                bail!("Resource allocation {allocation_id} not found");
            }
            Ok(())
        })
        .await
    }
}
