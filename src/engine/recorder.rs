use crate::engine::error::{AttendanceError, Result};
use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::MySqlPool;
use tracing::warn;

/// Hours between check-in and check-out, rounded to 2 decimals.
/// A clock-skew-negative interval is clamped to zero rather than persisted.
pub fn hours_worked(check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> f64 {
    let secs = (check_out - check_in).num_milliseconds() as f64 / 1000.0;
    if secs < 0.0 {
        warn!(%check_in, %check_out, "Check-out precedes check-in, clamping hours to zero");
        return 0.0;
    }
    round2(secs / 3600.0)
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

const ATTENDANCE_COLUMNS: &str = "id, user_id, company_id, date, \
     check_in_time, check_in_lat, check_in_lng, check_in_photo, \
     check_out_time, check_out_lat, check_out_lng, check_out_photo, \
     status, hours_worked";

async fn fetch_day(
    pool: &MySqlPool,
    user_id: u64,
    company_id: u64,
    date: NaiveDate,
) -> Result<Option<AttendanceRecord>> {
    let sql = format!(
        "SELECT {ATTENDANCE_COLUMNS} FROM attendance \
         WHERE user_id = ? AND company_id = ? AND date = ?"
    );
    let record = sqlx::query_as::<_, AttendanceRecord>(&sql)
        .bind(user_id)
        .bind(company_id)
        .bind(date)
        .fetch_optional(pool)
        .await?;
    Ok(record)
}

async fn fetch_day_required(
    pool: &MySqlPool,
    user_id: u64,
    company_id: u64,
    date: NaiveDate,
) -> Result<AttendanceRecord> {
    fetch_day(pool, user_id, company_id, date)
        .await?
        .ok_or_else(|| AttendanceError::Upstream("attendance row vanished".to_string()))
}

fn is_duplicate_key(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.code().as_deref() == Some("23000"))
}

/// Write today's check-in. Preconditions (geofence, face) are the
/// orchestrator's job; this guards only against double check-in. The unique
/// key on (user_id, company_id, date) backstops the read-then-write race:
/// a duplicate-key rejection from a concurrent insert surfaces as
/// `AlreadyCheckedIn`.
pub async fn record_check_in(
    pool: &MySqlPool,
    user_id: u64,
    company_id: u64,
    timestamp: DateTime<Utc>,
    latitude: f64,
    longitude: f64,
    photo: &str,
) -> Result<AttendanceRecord> {
    let date = timestamp.date_naive();
    let existing = fetch_day(pool, user_id, company_id, date).await?;

    match existing {
        Some(row) if row.check_in_time.is_some() => Err(AttendanceError::AlreadyCheckedIn),
        Some(row) => {
            // Row pre-created by another flow (e.g. marked on_leave);
            // fill in the check-in fields.
            sqlx::query(
                r#"
                UPDATE attendance
                SET check_in_time = ?, check_in_lat = ?, check_in_lng = ?,
                    check_in_photo = ?, status = ?
                WHERE id = ?
                "#,
            )
            .bind(timestamp)
            .bind(latitude)
            .bind(longitude)
            .bind(photo)
            .bind(AttendanceStatus::Present.as_str())
            .bind(row.id)
            .execute(pool)
            .await?;

            fetch_day_required(pool, user_id, company_id, date).await
        }
        None => {
            let inserted = sqlx::query(
                r#"
                INSERT INTO attendance
                    (user_id, company_id, date, check_in_time,
                     check_in_lat, check_in_lng, check_in_photo, status)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(user_id)
            .bind(company_id)
            .bind(date)
            .bind(timestamp)
            .bind(latitude)
            .bind(longitude)
            .bind(photo)
            .bind(AttendanceStatus::Present.as_str())
            .execute(pool)
            .await;

            if let Err(e) = inserted {
                if is_duplicate_key(&e) {
                    // Lost the race with a concurrent check-in.
                    return Err(AttendanceError::AlreadyCheckedIn);
                }
                return Err(e.into());
            }

            fetch_day_required(pool, user_id, company_id, date).await
        }
    }
}

/// Write today's check-out and the derived hours. Requires an existing
/// check-in and rejects a second check-out.
pub async fn record_check_out(
    pool: &MySqlPool,
    user_id: u64,
    company_id: u64,
    timestamp: DateTime<Utc>,
    latitude: f64,
    longitude: f64,
    photo: &str,
) -> Result<AttendanceRecord> {
    let date = timestamp.date_naive();
    let row = fetch_day(pool, user_id, company_id, date)
        .await?
        .ok_or(AttendanceError::NoCheckInFound)?;

    let check_in = row.check_in_time.ok_or(AttendanceError::NoCheckInFound)?;
    if row.check_out_time.is_some() {
        return Err(AttendanceError::AlreadyCheckedOut);
    }

    let hours = hours_worked(check_in, timestamp);

    sqlx::query(
        r#"
        UPDATE attendance
        SET check_out_time = ?, check_out_lat = ?, check_out_lng = ?,
            check_out_photo = ?, hours_worked = ?
        WHERE id = ?
        "#,
    )
    .bind(timestamp)
    .bind(latitude)
    .bind(longitude)
    .bind(photo)
    .bind(hours)
    .bind(row.id)
    .execute(pool)
    .await?;

    fetch_day_required(pool, user_id, company_id, date).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 6, h, m, s).unwrap()
    }

    #[test]
    fn nine_to_five_thirty_is_eight_and_a_half_hours() {
        assert_eq!(hours_worked(at(9, 0, 0), at(17, 30, 0)), 8.5);
    }

    #[test]
    fn rounds_to_two_decimals() {
        // 7h 29m 30s = 7.491666... hours
        assert_eq!(hours_worked(at(9, 0, 0), at(16, 29, 30)), 7.49);
        // 10 seconds = 0.00277... hours
        assert_eq!(hours_worked(at(9, 0, 0), at(9, 0, 10)), 0.0);
    }

    #[test]
    fn clock_skew_clamps_to_zero() {
        assert_eq!(hours_worked(at(17, 0, 0), at(9, 0, 0)), 0.0);
    }

    #[test]
    fn zero_length_day_is_zero_hours() {
        assert_eq!(hours_worked(at(9, 0, 0), at(9, 0, 0)), 0.0);
    }
}
