use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, parse_optional_datetime, parse_status, to_u32},
    models::{PauseInterval, ServiceRecord, ServiceStatus},
};
use crate::lifecycle::{PauseEffect, TransitionPlan};

const RECORD_COLUMNS: &str = "id, tenant_id, service_name, status, start_time, end_time, \
     expected_duration_minutes, notes, created_at, updated_at";

fn row_to_service_record(row: &Row) -> Result<ServiceRecord> {
    let started: Option<String> = row.get("start_time")?;
    let ended: Option<String> = row.get("end_time")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;
    let status: String = row.get("status")?;
    let expected: Option<i64> = row.get("expected_duration_minutes")?;

    Ok(ServiceRecord {
        id: row.get("id")?,
        tenant_id: row.get("tenant_id")?,
        service_name: row.get("service_name")?,
        status: parse_status(&status)?,
        start_time: parse_optional_datetime(started, "start_time")?,
        end_time: parse_optional_datetime(ended, "end_time")?,
        expected_duration_minutes: expected
            .map(|minutes| to_u32(minutes, "expected_duration_minutes"))
            .transpose()?,
        pauses: Vec::new(),
        notes: row.get("notes")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

fn row_to_pause(row: &Row) -> Result<PauseInterval> {
    let started_at: String = row.get("started_at")?;
    let ended_at: Option<String> = row.get("ended_at")?;

    Ok(PauseInterval {
        id: row.get("id")?,
        service_id: row.get("service_id")?,
        started_at: parse_datetime(&started_at, "started_at")?,
        ended_at: parse_optional_datetime(ended_at, "ended_at")?,
        reason: row.get("reason")?,
    })
}

fn pauses_for(conn: &Connection, service_id: &str) -> Result<Vec<PauseInterval>> {
    let mut stmt = conn.prepare(
        "SELECT id, service_id, started_at, ended_at, reason
         FROM service_pauses
         WHERE service_id = ?1
         ORDER BY started_at",
    )?;

    let mut rows = stmt.query(params![service_id])?;
    let mut pauses = Vec::new();
    while let Some(row) = rows.next()? {
        pauses.push(row_to_pause(row)?);
    }
    Ok(pauses)
}

fn insert_pause(conn: &Connection, pause: &PauseInterval) -> Result<()> {
    conn.execute(
        "INSERT INTO service_pauses (id, service_id, started_at, ended_at, reason)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            pause.id,
            pause.service_id,
            pause.started_at.to_rfc3339(),
            pause.ended_at.as_ref().map(|dt| dt.to_rfc3339()),
            pause.reason,
        ],
    )
    .with_context(|| "failed to insert pause interval")?;
    Ok(())
}

impl Database {
    pub async fn create_service_record(&self, record: &ServiceRecord) -> Result<()> {
        let record = record.clone();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO service_records (id, tenant_id, service_name, status, start_time, \
                 end_time, expected_duration_minutes, notes, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    record.id,
                    record.tenant_id,
                    record.service_name,
                    record.status.as_str(),
                    record.start_time.as_ref().map(|dt| dt.to_rfc3339()),
                    record.end_time.as_ref().map(|dt| dt.to_rfc3339()),
                    record.expected_duration_minutes.map(i64::from),
                    record.notes,
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                ],
            )
            .with_context(|| "failed to insert service record")?;

            for pause in &record.pauses {
                insert_pause(&tx, pause)?;
            }

            tx.commit()?;
            Ok(())
        })
        .await
    }

    pub async fn get_service_record(&self, service_id: &str) -> Result<ServiceRecord> {
        let service_id = service_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RECORD_COLUMNS} FROM service_records WHERE id = ?1"
            ))?;

            let mut rows = stmt.query(params![service_id])?;
            let mut record = match rows.next()? {
                Some(row) => row_to_service_record(row)?,
                None => return Err(anyhow!("service record not found: {service_id}")),
            };

            record.pauses = pauses_for(conn, &record.id)?;
            Ok(record)
        })
        .await
    }

    /// Full queue for a tenant: records still moving through the lifecycle
    /// first, terminal ones after, each group oldest first.
    pub async fn list_service_records(&self, tenant_id: &str) -> Result<Vec<ServiceRecord>> {
        let tenant_id = tenant_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RECORD_COLUMNS} FROM service_records
                 WHERE tenant_id = ?1
                 ORDER BY status IN ('Completed', 'Cancelled'), created_at"
            ))?;

            let mut rows = stmt.query(params![tenant_id])?;
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                records.push(row_to_service_record(row)?);
            }

            for record in &mut records {
                record.pauses = pauses_for(conn, &record.id)?;
            }

            Ok(records)
        })
        .await
    }

    pub async fn filter_service_records(
        &self,
        tenant_id: &str,
        status: ServiceStatus,
    ) -> Result<Vec<ServiceRecord>> {
        let tenant_id = tenant_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RECORD_COLUMNS} FROM service_records
                 WHERE tenant_id = ?1 AND status = ?2
                 ORDER BY created_at"
            ))?;

            let mut rows = stmt.query(params![tenant_id, status.as_str()])?;
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                records.push(row_to_service_record(row)?);
            }

            for record in &mut records {
                record.pauses = pauses_for(conn, &record.id)?;
            }

            Ok(records)
        })
        .await
    }

    /// Records that were running when the host last shut down, so tickers
    /// can be re-armed on startup.
    pub async fn list_in_progress(&self, tenant_id: &str) -> Result<Vec<ServiceRecord>> {
        self.filter_service_records(tenant_id, ServiceStatus::InProgress)
            .await
    }

    /// Scalar-field update. Pause intervals are managed exclusively by the
    /// transition path.
    pub async fn update_service_record(&self, record: &ServiceRecord) -> Result<()> {
        let record = record.clone();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE service_records
                 SET service_name = ?1,
                     status = ?2,
                     start_time = ?3,
                     end_time = ?4,
                     expected_duration_minutes = ?5,
                     notes = ?6,
                     updated_at = ?7
                 WHERE id = ?8",
                params![
                    record.service_name,
                    record.status.as_str(),
                    record.start_time.as_ref().map(|dt| dt.to_rfc3339()),
                    record.end_time.as_ref().map(|dt| dt.to_rfc3339()),
                    record.expected_duration_minutes.map(i64::from),
                    record.notes,
                    record.updated_at.to_rfc3339(),
                    record.id,
                ],
            )?;

            if rows_affected == 0 {
                return Err(anyhow!("service record not found: {}", record.id));
            }

            Ok(())
        })
        .await
    }

    /// Persist one validated transition: status and timestamp columns plus
    /// the pause insert/close, atomically.
    pub async fn apply_transition_plan(
        &self,
        service_id: &str,
        plan: &TransitionPlan,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let service_id = service_id.to_string();
        let plan = plan.clone();
        self.execute(move |conn| {
            let tx = conn.transaction()?;

            let rows_affected = tx.execute(
                "UPDATE service_records
                 SET status = ?1,
                     start_time = COALESCE(?2, start_time),
                     end_time = COALESCE(?3, end_time),
                     updated_at = ?4
                 WHERE id = ?5",
                params![
                    plan.status.as_str(),
                    plan.set_start_time.map(|dt| dt.to_rfc3339()),
                    plan.set_end_time.map(|dt| dt.to_rfc3339()),
                    updated_at.to_rfc3339(),
                    service_id,
                ],
            )
            .with_context(|| "failed to update service record status")?;

            if rows_affected == 0 {
                return Err(anyhow!("service record not found: {service_id}"));
            }

            match &plan.pause_effect {
                Some(PauseEffect::Open { started_at, reason }) => {
                    insert_pause(
                        &tx,
                        &PauseInterval {
                            id: Uuid::new_v4().to_string(),
                            service_id: service_id.clone(),
                            started_at: *started_at,
                            ended_at: None,
                            reason: reason.clone(),
                        },
                    )?;
                }
                Some(PauseEffect::Close { ended_at }) => {
                    tx.execute(
                        "UPDATE service_pauses
                         SET ended_at = ?1
                         WHERE service_id = ?2 AND ended_at IS NULL",
                        params![ended_at.to_rfc3339(), service_id],
                    )
                    .with_context(|| "failed to close pause interval")?;
                }
                None => {}
            }

            tx.commit()?;
            Ok(())
        })
        .await
    }

    pub async fn update_service_notes(
        &self,
        service_id: &str,
        notes: Option<String>,
    ) -> Result<()> {
        let service_id = service_id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE service_records
                 SET notes = ?1,
                     updated_at = ?2
                 WHERE id = ?3",
                params![notes, Utc::now().to_rfc3339(), service_id],
            )?;

            if rows_affected == 0 {
                return Err(anyhow!("service record not found: {service_id}"));
            }

            Ok(())
        })
        .await
    }

    /// Administrative removal. The lifecycle never deletes; cancellation is
    /// a status value.
    pub async fn delete_service_record(&self, service_id: &str) -> Result<()> {
        let service_id = service_id.to_string();
        self.execute(move |conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "DELETE FROM service_pauses WHERE service_id = ?1",
                params![service_id],
            )?;
            tx.execute(
                "DELETE FROM service_records WHERE id = ?1",
                params![service_id],
            )?;

            tx.commit()?;
            Ok(())
        })
        .await
    }
}
