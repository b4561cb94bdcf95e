// src/services/leave.rs

use crate::{
    errors::{AppError, AppResult},
    models::{
        AllocateLeaveBalanceRequest, AttendanceStatus, LeaveBalance, LeaveRequest, LeaveStatus,
        SubmitLeaveRequest,
    },
    services::calendar::{inclusive_day_count, working_dates_between},
};
use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{info, warn};
use uuid::Uuid;

pub const BALANCE_COLUMNS: &str = "id, tenant_id, staff_id, leave_type_id, year, total_days, used_days, \
     total_days - used_days AS remaining_days";

/// Longest range a single leave request may span.
pub const MAX_LEAVE_DAYS: i32 = 366;

pub struct LeaveService;

impl LeaveService {
    /// Inclusive day count of a leave range.
    pub fn total_days(start: NaiveDate, end: NaiveDate) -> AppResult<i32> {
        if end < start {
            return Err(AppError::Validation(
                "end_date must not be before start_date".to_string(),
            ));
        }
        let days = inclusive_day_count(start, end);
        if days > MAX_LEAVE_DAYS {
            return Err(AppError::Validation(format!(
                "A leave request cannot span more than {} days",
                MAX_LEAVE_DAYS
            )));
        }
        Ok(days)
    }

    /// Only pending requests move, and never back to pending.
    pub fn ensure_transition(from: LeaveStatus, to: LeaveStatus) -> AppResult<()> {
        match (from, to) {
            (LeaveStatus::Pending, LeaveStatus::Approved)
            | (LeaveStatus::Pending, LeaveStatus::Rejected)
            | (LeaveStatus::Pending, LeaveStatus::Cancelled) => Ok(()),
            _ => Err(AppError::Conflict(format!(
                "Leave request cannot move from {:?} to {:?}",
                from, to
            ))),
        }
    }

    /// Days that get an attendance row when the request is approved.
    pub fn attendance_dates(request: &LeaveRequest) -> Vec<NaiveDate> {
        working_dates_between(request.start_date, request.end_date)
    }

    pub async fn submit(
        db: &PgPool,
        tenant_id: Uuid,
        body: &SubmitLeaveRequest,
    ) -> AppResult<LeaveRequest> {
        let total_days = Self::total_days(body.start_date, body.end_date)?;

        let leave_type_active = sqlx::query_scalar::<_, bool>(
            "SELECT is_active FROM leave_types WHERE id = $1 AND tenant_id = $2",
        )
        .bind(body.leave_type_id)
        .bind(tenant_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Leave type {} not found", body.leave_type_id)))?;

        if !leave_type_active {
            return Err(AppError::Validation("Leave type is no longer active".to_string()));
        }

        let request = sqlx::query_as::<_, LeaveRequest>(
            r#"INSERT INTO leave_requests (
                id, tenant_id, staff_id, leave_type_id, start_date, end_date,
                total_days, reason, status, created_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,'pending',NOW())
            RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(tenant_id)
        .bind(body.staff_id)
        .bind(body.leave_type_id)
        .bind(body.start_date)
        .bind(body.end_date)
        .bind(total_days)
        .bind(&body.reason)
        .fetch_one(db)
        .await?;

        Ok(request)
    }

    /// Sets the allowance for one staff member, leave type and year. Both
    /// the staff member and the leave type must belong to `tenant_id`.
    pub async fn allocate_balance(
        db: &PgPool,
        tenant_id: Uuid,
        body: &AllocateLeaveBalanceRequest,
    ) -> AppResult<LeaveBalance> {
        if body.total_days < 0 {
            return Err(AppError::Validation("total_days cannot be negative".to_string()));
        }

        sqlx::query_scalar::<_, Uuid>("SELECT id FROM staff WHERE id = $1 AND tenant_id = $2")
            .bind(body.staff_id)
            .bind(tenant_id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Staff {} not found", body.staff_id)))?;

        sqlx::query_scalar::<_, Uuid>("SELECT id FROM leave_types WHERE id = $1 AND tenant_id = $2")
            .bind(body.leave_type_id)
            .bind(tenant_id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Leave type {} not found", body.leave_type_id))
            })?;

        // The conflict target has no tenant column, so the update is guarded too
        let balance = sqlx::query_as::<_, LeaveBalance>(&format!(
            r#"INSERT INTO leave_balances (id, tenant_id, staff_id, leave_type_id, year, total_days, used_days)
               VALUES ($1, $2, $3, $4, $5, $6, 0)
               ON CONFLICT (staff_id, leave_type_id, year) DO UPDATE
               SET total_days = EXCLUDED.total_days
               WHERE leave_balances.tenant_id = EXCLUDED.tenant_id
               RETURNING {}"#,
            BALANCE_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(tenant_id)
        .bind(body.staff_id)
        .bind(body.leave_type_id)
        .bind(body.year)
        .bind(body.total_days)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Staff {} not found", body.staff_id)))?;

        Ok(balance)
    }

    async fn lock_request(
        tx: &mut Transaction<'_, Postgres>,
        tenant_id: Uuid,
        request_id: Uuid,
    ) -> AppResult<LeaveRequest> {
        sqlx::query_as::<_, LeaveRequest>(
            "SELECT * FROM leave_requests WHERE id = $1 AND tenant_id = $2 FOR UPDATE",
        )
        .bind(request_id)
        .bind(tenant_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Leave request {} not found", request_id)))
    }

    /// Approves a pending request, charges the staff member's balance for
    /// `year`, and marks each weekday in range as leave.
    pub async fn approve(
        db: &PgPool,
        tenant_id: Uuid,
        request_id: Uuid,
        year: i32,
    ) -> AppResult<LeaveRequest> {
        let mut tx = db.begin().await?;

        let current = Self::lock_request(&mut tx, tenant_id, request_id).await?;
        Self::ensure_transition(current.status, LeaveStatus::Approved)?;

        let approved = sqlx::query_as::<_, LeaveRequest>(
            "UPDATE leave_requests SET status = 'approved', approved_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(request_id)
        .fetch_one(&mut *tx)
        .await?;

        // No overdraft check: remaining_days may go negative
        let charged = sqlx::query(
            r#"UPDATE leave_balances
               SET used_days = used_days + $1
               WHERE staff_id = $2 AND leave_type_id = $3 AND year = $4"#,
        )
        .bind(approved.total_days)
        .bind(approved.staff_id)
        .bind(approved.leave_type_id)
        .bind(year)
        .execute(&mut *tx)
        .await?;

        if charged.rows_affected() == 0 {
            warn!(
                "No {} leave balance for staff {} type {}; approval not charged",
                year, approved.staff_id, approved.leave_type_id
            );
        }

        for date in Self::attendance_dates(&approved) {
            sqlx::query(
                r#"INSERT INTO attendance (id, tenant_id, staff_id, date, status, notes, created_at)
                   VALUES ($1, $2, $3, $4, $5, 'Approved leave', NOW())
                   ON CONFLICT (staff_id, date) DO UPDATE
                   SET status = EXCLUDED.status, notes = EXCLUDED.notes"#,
            )
            .bind(Uuid::new_v4())
            .bind(tenant_id)
            .bind(approved.staff_id)
            .bind(date)
            .bind(AttendanceStatus::Leave)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            "Leave request {} approved ({} days)",
            approved.id, approved.total_days
        );
        Ok(approved)
    }

    pub async fn reject(
        db: &PgPool,
        tenant_id: Uuid,
        request_id: Uuid,
        rejection_reason: Option<&str>,
    ) -> AppResult<LeaveRequest> {
        let reason = rejection_reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or_else(|| AppError::Validation("A rejection reason is required".to_string()))?;

        let mut tx = db.begin().await?;
        let current = Self::lock_request(&mut tx, tenant_id, request_id).await?;
        Self::ensure_transition(current.status, LeaveStatus::Rejected)?;

        let rejected = sqlx::query_as::<_, LeaveRequest>(
            r#"UPDATE leave_requests
               SET status = 'rejected', approved_at = NOW(), rejection_reason = $1
               WHERE id = $2
               RETURNING *"#,
        )
        .bind(reason)
        .bind(request_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        info!("Leave request {} rejected", rejected.id);
        Ok(rejected)
    }

    pub async fn cancel(db: &PgPool, tenant_id: Uuid, request_id: Uuid) -> AppResult<LeaveRequest> {
        let mut tx = db.begin().await?;
        let current = Self::lock_request(&mut tx, tenant_id, request_id).await?;
        Self::ensure_transition(current.status, LeaveStatus::Cancelled)?;

        let cancelled = sqlx::query_as::<_, LeaveRequest>(
            "UPDATE leave_requests SET status = 'cancelled' WHERE id = $1 RETURNING *",
        )
        .bind(request_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn request(start: NaiveDate, end: NaiveDate) -> LeaveRequest {
        LeaveRequest {
            id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            staff_id: Uuid::new_v4(),
            leave_type_id: Uuid::new_v4(),
            start_date: start,
            end_date: end,
            total_days: LeaveService::total_days(start, end).unwrap(),
            reason: None,
            status: LeaveStatus::Pending,
            rejection_reason: None,
            approved_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn total_days_is_inclusive() {
        assert_eq!(
            LeaveService::total_days(date(2024, 1, 10), date(2024, 1, 12)).unwrap(),
            3
        );
    }

    #[test]
    fn reversed_range_is_a_validation_error() {
        let err = LeaveService::total_days(date(2024, 1, 12), date(2024, 1, 10)).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn leave_longer_than_a_year_is_refused() {
        assert_eq!(
            LeaveService::total_days(date(2024, 1, 1), date(2024, 12, 31)).unwrap(),
            366
        );
        let err = LeaveService::total_days(date(2024, 1, 1), date(2025, 1, 1)).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(LeaveService::total_days(date(1, 1, 1), date(9999, 12, 31)).is_err());
    }

    #[test]
    fn approval_skips_weekend_days() {
        // Friday to Sunday: three calendar days charged, one attendance row
        let req = request(date(2024, 1, 5), date(2024, 1, 7));
        assert_eq!(req.total_days, 3);
        assert_eq!(LeaveService::attendance_dates(&req), vec![date(2024, 1, 5)]);
    }

    #[test]
    fn approval_covers_every_weekday_in_range() {
        let req = request(date(2024, 1, 8), date(2024, 1, 19));
        let dates = LeaveService::attendance_dates(&req);
        assert_eq!(dates.len(), 10);
        assert!(!dates.contains(&date(2024, 1, 13)));
        assert!(!dates.contains(&date(2024, 1, 14)));
    }

    #[test]
    fn only_pending_requests_transition() {
        use LeaveStatus::*;
        for to in [Approved, Rejected, Cancelled] {
            assert!(LeaveService::ensure_transition(Pending, to).is_ok());
        }
        for from in [Approved, Rejected, Cancelled] {
            for to in [Pending, Approved, Rejected, Cancelled] {
                assert!(matches!(
                    LeaveService::ensure_transition(from, to),
                    Err(AppError::Conflict(_))
                ));
            }
        }
    }

    fn allocation(staff_id: Uuid, leave_type_id: Uuid, total_days: i32) -> AllocateLeaveBalanceRequest {
        AllocateLeaveBalanceRequest {
            staff_id,
            leave_type_id,
            year: 2024,
            total_days,
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn approval_charges_calendar_days_and_marks_weekdays(pool: PgPool) {
        let tenant = fixtures::tenant(&pool).await;
        let staff = fixtures::staff(&pool, tenant, dec!(22000)).await;
        let leave_type = fixtures::leave_type(&pool, tenant).await;
        LeaveService::allocate_balance(&pool, tenant, &allocation(staff, leave_type, 10))
            .await
            .unwrap();

        let submitted = LeaveService::submit(
            &pool,
            tenant,
            &SubmitLeaveRequest {
                staff_id: staff,
                leave_type_id: leave_type,
                start_date: date(2024, 1, 5),
                end_date: date(2024, 1, 7),
                reason: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(submitted.total_days, 3);

        let approved = LeaveService::approve(&pool, tenant, submitted.id, 2024).await.unwrap();
        assert_eq!(approved.status, LeaveStatus::Approved);

        let (used, remaining): (i32, i32) = sqlx::query_as(
            "SELECT used_days, total_days - used_days FROM leave_balances WHERE staff_id = $1",
        )
        .bind(staff)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!((used, remaining), (3, 7));

        let marked: Vec<(NaiveDate, AttendanceStatus)> =
            sqlx::query_as("SELECT date, status FROM attendance WHERE staff_id = $1")
                .bind(staff)
                .fetch_all(&pool)
                .await
                .unwrap();
        assert_eq!(marked, vec![(date(2024, 1, 5), AttendanceStatus::Leave)]);

        let again = LeaveService::approve(&pool, tenant, submitted.id, 2024).await;
        assert!(matches!(again, Err(AppError::Conflict(_))));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn balance_cannot_be_set_across_tenants(pool: PgPool) {
        let owner = fixtures::tenant(&pool).await;
        let intruder = fixtures::tenant(&pool).await;
        let staff = fixtures::staff(&pool, owner, dec!(22000)).await;
        let leave_type = fixtures::leave_type(&pool, owner).await;
        let intruder_type = fixtures::leave_type(&pool, intruder).await;

        let saved = LeaveService::allocate_balance(&pool, owner, &allocation(staff, leave_type, 14))
            .await
            .unwrap();
        assert_eq!(saved.remaining_days, 14);

        for body in [
            allocation(staff, leave_type, 0),
            allocation(staff, intruder_type, 0),
        ] {
            let err = LeaveService::allocate_balance(&pool, intruder, &body)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::NotFound(_)));
        }

        let rows: Vec<(Uuid, i32)> =
            sqlx::query_as("SELECT tenant_id, total_days FROM leave_balances WHERE staff_id = $1")
                .bind(staff)
                .fetch_all(&pool)
                .await
                .unwrap();
        assert_eq!(rows, vec![(owner, 14)]);

        let updated = LeaveService::allocate_balance(&pool, owner, &allocation(staff, leave_type, 20))
            .await
            .unwrap();
        assert_eq!(updated.id, saved.id);
        assert_eq!(updated.total_days, 20);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn negative_allowance_is_refused(pool: PgPool) {
        let tenant = fixtures::tenant(&pool).await;
        let err = LeaveService::allocate_balance(
            &pool,
            tenant,
            &allocation(Uuid::new_v4(), Uuid::new_v4(), -1),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
