// src/services/payroll.rs

use crate::{
    errors::AppResult,
    models::{
        Attendance, AttendanceStatus, LoanStatus, PayrollRun, SalaryBreakdown, Staff, StaffLoan,
    },
    services::calendar::PayPeriod,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

pub struct PayrollService;

/// Half-up rounding to a whole currency unit.
fn round_half_up(value: Decimal) -> Decimal {
    (value + dec!(0.5)).floor()
}

impl PayrollService {
    /// Salary breakdown for one staff member over one month.
    ///
    /// `attendance` must already be restricted to the staff member and month.
    /// Absent days are whatever is left of the working days after the marked
    /// days; inconsistent data can drive that negative and it is not clamped.
    pub fn calculate(
        salary: Decimal,
        period: &PayPeriod,
        attendance: &[Attendance],
        loans: &[StaffLoan],
    ) -> SalaryBreakdown {
        let working_days = period.working_days();
        let count = |status: AttendanceStatus| {
            attendance.iter().filter(|a| a.status == status).count() as i32
        };

        let present_days = count(AttendanceStatus::Present);
        let late_days = count(AttendanceStatus::Late);
        let leave_days = count(AttendanceStatus::Leave);
        let half_days = count(AttendanceStatus::HalfDay);
        let absent_days = working_days - present_days - late_days - leave_days - half_days;

        let daily_rate = salary / Decimal::from(working_days);

        let absent_deduction = round_half_up(Decimal::from(absent_days) * daily_rate);
        let late_penalty = round_half_up(Decimal::from(late_days) * daily_rate * dec!(0.25));
        let half_day_penalty = round_half_up(Decimal::from(half_days) * daily_rate * dec!(0.5));

        let overtime_hours: Decimal = attendance.iter().map(|a| a.overtime_hours).sum();
        let overtime_pay = round_half_up(overtime_hours * (daily_rate / dec!(8)) * dec!(1.5));

        let loan_deduction: Decimal = loans
            .iter()
            .filter(|l| l.status == LoanStatus::Approved && l.remaining_amount > Decimal::ZERO)
            .map(|l| l.monthly_deduction)
            .sum();

        let total_deductions = absent_deduction + late_penalty + half_day_penalty + loan_deduction;
        let net_salary = (salary - total_deductions + overtime_pay).max(Decimal::ZERO);

        SalaryBreakdown {
            working_days,
            basic_salary: salary,
            gross_salary: salary,
            present_days: present_days + late_days,
            absent_days,
            late_days,
            leave_days,
            half_days,
            absent_deduction,
            late_deduction: late_penalty + half_day_penalty,
            overtime_pay,
            loan_deduction,
            net_salary,
        }
    }

    /// Balance left after one installment, and the status it leaves the loan in.
    pub fn apply_installment(remaining: Decimal, monthly_deduction: Decimal) -> (Decimal, LoanStatus) {
        let left = (remaining - monthly_deduction).max(Decimal::ZERO);
        let status = if left.is_zero() {
            LoanStatus::Completed
        } else {
            LoanStatus::Approved
        };
        (left, status)
    }
}

/// A loan as payroll sees it for one month. Loans already charged for the
/// month are restored to their pre-installment balance so a replayed run
/// computes the same snapshot without charging them again.
struct LoanView {
    loan: StaffLoan,
    already_charged: bool,
}

fn loan_views(loans: Vec<StaffLoan>, charged: &HashMap<Uuid, Decimal>) -> Vec<LoanView> {
    loans
        .into_iter()
        .map(|mut loan| match charged.get(&loan.id) {
            Some(remaining_before) => {
                loan.remaining_amount = *remaining_before;
                loan.status = LoanStatus::Approved;
                LoanView {
                    loan,
                    already_charged: true,
                }
            }
            None => LoanView {
                loan,
                already_charged: false,
            },
        })
        .collect()
}

/// Processes payroll for every active staff member of a tenant for one month.
///
/// The whole run is one transaction. The upsert on the run row takes a row
/// lock, so concurrent runs for the same month serialize, and the
/// `loan_deductions` ledger ensures each loan is charged at most once per month.
pub async fn run_payroll(db: &PgPool, tenant_id: Uuid, period: &PayPeriod) -> AppResult<PayrollRun> {
    info!("Starting payroll run for tenant {} month {}", tenant_id, period.month);

    let mut tx = db.begin().await?;

    let run = sqlx::query_as::<_, PayrollRun>(
        r#"INSERT INTO payroll_runs (id, tenant_id, month, status, total_staff, created_at)
           VALUES ($1, $2, $3, 'processing',
                   (SELECT COUNT(*)::int FROM staff WHERE tenant_id = $2 AND is_active = true),
                   NOW())
           ON CONFLICT (tenant_id, month) DO UPDATE
           SET status = 'processing', total_staff = EXCLUDED.total_staff
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(tenant_id)
    .bind(&period.month)
    .fetch_one(&mut *tx)
    .await?;

    let staff = sqlx::query_as::<_, Staff>(
        "SELECT * FROM staff WHERE tenant_id = $1 AND is_active = true ORDER BY name",
    )
    .bind(tenant_id)
    .fetch_all(&mut *tx)
    .await?;

    let mut attendance_by_staff: HashMap<Uuid, Vec<Attendance>> = HashMap::new();
    for row in sqlx::query_as::<_, Attendance>(
        "SELECT * FROM attendance WHERE tenant_id = $1 AND date BETWEEN $2 AND $3",
    )
    .bind(tenant_id)
    .bind(period.start)
    .bind(period.end)
    .fetch_all(&mut *tx)
    .await?
    {
        attendance_by_staff.entry(row.staff_id).or_default().push(row);
    }

    let charged: HashMap<Uuid, Decimal> = sqlx::query_as::<_, (Uuid, Decimal)>(
        r#"SELECT d.loan_id, d.remaining_before
           FROM loan_deductions d
           JOIN staff_loans l ON l.id = d.loan_id
           WHERE l.tenant_id = $1 AND d.month = $2"#,
    )
    .bind(tenant_id)
    .bind(&period.month)
    .fetch_all(&mut *tx)
    .await?
    .into_iter()
    .collect();

    let loans = sqlx::query_as::<_, StaffLoan>(
        r#"SELECT * FROM staff_loans
           WHERE tenant_id = $1
             AND ((status = 'approved' AND remaining_amount > 0)
                  OR id IN (SELECT loan_id FROM loan_deductions WHERE month = $2))
           FOR UPDATE"#,
    )
    .bind(tenant_id)
    .bind(&period.month)
    .fetch_all(&mut *tx)
    .await?;

    let mut loans_by_staff: HashMap<Uuid, Vec<LoanView>> = HashMap::new();
    for view in loan_views(loans, &charged) {
        loans_by_staff.entry(view.loan.staff_id).or_default().push(view);
    }

    let mut total_gross = dec!(0);
    let mut total_deductions = dec!(0);
    let mut total_net = dec!(0);

    for member in &staff {
        let attendance = attendance_by_staff.remove(&member.id).unwrap_or_default();
        let views = loans_by_staff.remove(&member.id).unwrap_or_default();
        let loans: Vec<StaffLoan> = views.iter().map(|v| v.loan.clone()).collect();

        let breakdown = PayrollService::calculate(member.salary, period, &attendance, &loans);
        save_salary_payment(&mut tx, tenant_id, member.id, &period.month, &breakdown).await?;

        for view in views.iter().filter(|v| !v.already_charged) {
            charge_loan(&mut tx, run.id, &period.month, &view.loan).await?;
        }

        debug!(
            "Staff {} net salary {} for {}",
            member.id, breakdown.net_salary, period.month
        );

        total_gross += breakdown.gross_salary;
        total_deductions += breakdown.total_deductions();
        total_net += breakdown.net_salary;
    }

    let run = sqlx::query_as::<_, PayrollRun>(
        r#"UPDATE payroll_runs
           SET status = 'completed',
               total_gross = $1,
               total_deductions = $2,
               total_net = $3,
               processed_at = NOW()
           WHERE id = $4
           RETURNING *"#,
    )
    .bind(total_gross)
    .bind(total_deductions)
    .bind(total_net)
    .bind(run.id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(
        "Payroll run {} complete. {} staff processed. Total net: ৳{}",
        run.id, run.total_staff, run.total_net
    );

    Ok(run)
}

/// Upserts the month's snapshot. A row already marked paid is left untouched.
async fn save_salary_payment(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    staff_id: Uuid,
    month: &str,
    b: &SalaryBreakdown,
) -> AppResult<()> {
    sqlx::query(
        r#"INSERT INTO salary_payments (
            id, tenant_id, staff_id, month,
            basic_salary, gross_salary, present_days, absent_days, late_days,
            absent_deduction, late_deduction, overtime_pay, loan_deduction, net_salary,
            status, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,'pending',NOW(),NOW())
        ON CONFLICT (tenant_id, staff_id, month) DO UPDATE
        SET basic_salary = EXCLUDED.basic_salary,
            gross_salary = EXCLUDED.gross_salary,
            present_days = EXCLUDED.present_days,
            absent_days = EXCLUDED.absent_days,
            late_days = EXCLUDED.late_days,
            absent_deduction = EXCLUDED.absent_deduction,
            late_deduction = EXCLUDED.late_deduction,
            overtime_pay = EXCLUDED.overtime_pay,
            loan_deduction = EXCLUDED.loan_deduction,
            net_salary = EXCLUDED.net_salary,
            updated_at = NOW()
        WHERE salary_payments.status = 'pending'"#,
    )
    .bind(Uuid::new_v4())
    .bind(tenant_id)
    .bind(staff_id)
    .bind(month)
    .bind(b.basic_salary)
    .bind(b.gross_salary)
    .bind(b.present_days)
    .bind(b.absent_days)
    .bind(b.late_days)
    .bind(b.absent_deduction)
    .bind(b.late_deduction)
    .bind(b.overtime_pay)
    .bind(b.loan_deduction)
    .bind(b.net_salary)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Records the month's installment in the ledger and, only if that insert
/// won, decrements the loan balance. The balance is re-read under a row lock
/// so runs for different months never overwrite each other's decrement.
async fn charge_loan(
    tx: &mut Transaction<'_, Postgres>,
    run_id: Uuid,
    month: &str,
    loan: &StaffLoan,
) -> AppResult<()> {
    let (remaining_before, status) = sqlx::query_as::<_, (Decimal, LoanStatus)>(
        "SELECT remaining_amount, status FROM staff_loans WHERE id = $1 FOR UPDATE",
    )
    .bind(loan.id)
    .fetch_one(&mut **tx)
    .await?;

    if status != LoanStatus::Approved || remaining_before <= Decimal::ZERO {
        return Ok(());
    }

    let recorded = sqlx::query_scalar::<_, Uuid>(
        r#"INSERT INTO loan_deductions (id, loan_id, payroll_run_id, month, amount, remaining_before, created_at)
           VALUES ($1, $2, $3, $4, $5, $6, NOW())
           ON CONFLICT (loan_id, month) DO NOTHING
           RETURNING id"#,
    )
    .bind(Uuid::new_v4())
    .bind(loan.id)
    .bind(run_id)
    .bind(month)
    .bind(loan.monthly_deduction)
    .bind(remaining_before)
    .fetch_optional(&mut **tx)
    .await?;

    if recorded.is_none() {
        return Ok(());
    }

    let (remaining, status) =
        PayrollService::apply_installment(remaining_before, loan.monthly_deduction);

    sqlx::query(
        "UPDATE staff_loans SET remaining_amount = $1, status = $2, updated_at = NOW() WHERE id = $3",
    )
    .bind(remaining)
    .bind(status)
    .bind(loan.id)
    .execute(&mut **tx)
    .await?;

    if status == LoanStatus::Completed {
        info!("Loan {} fully repaid", loan.id);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::LoanType, services::fixtures};
    use chrono::{Datelike, NaiveDate, Utc};

    fn april() -> PayPeriod {
        PayPeriod::parse("2024-04").unwrap()
    }

    fn mark(staff_id: Uuid, day: u32, status: AttendanceStatus, overtime: Decimal) -> Attendance {
        Attendance {
            id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            staff_id,
            date: NaiveDate::from_ymd_opt(2024, 4, day).unwrap(),
            status,
            check_in: None,
            check_out: None,
            overtime_hours: overtime,
            notes: None,
            created_at: Utc::now(),
        }
    }

    /// One row per April 2024 weekday, first `absent` days left unmarked,
    /// the next `late` marked late and the rest present.
    fn month_of(staff_id: Uuid, absent: usize, late: usize) -> Vec<Attendance> {
        let period = april();
        crate::services::calendar::working_dates_between(period.start, period.end)
            .into_iter()
            .skip(absent)
            .enumerate()
            .map(|(i, d)| {
                let status = if i < late {
                    AttendanceStatus::Late
                } else {
                    AttendanceStatus::Present
                };
                mark(staff_id, d.day(), status, dec!(0))
            })
            .collect()
    }

    fn loan(status: LoanStatus, remaining: Decimal, monthly: Decimal) -> StaffLoan {
        StaffLoan {
            id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            staff_id: Uuid::nil(),
            loan_type: LoanType::Loan,
            amount: dec!(10000),
            remaining_amount: remaining,
            monthly_deduction: monthly,
            status,
            reason: None,
            approved_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn full_attendance_pays_full_salary() {
        let staff = Uuid::new_v4();
        for salary in [dec!(15000), dec!(30000), dec!(47123.50)] {
            let b = PayrollService::calculate(salary, &april(), &month_of(staff, 0, 0), &[]);
            assert_eq!(b.net_salary, salary);
            assert_eq!(b.absent_days, 0);
            assert_eq!(b.gross_salary, salary);
        }
    }

    #[test]
    fn worked_example_two_absent_one_late() {
        let staff = Uuid::new_v4();
        let b = PayrollService::calculate(dec!(30000), &april(), &month_of(staff, 2, 1), &[]);

        assert_eq!(b.working_days, 22);
        assert_eq!(b.absent_days, 2);
        assert_eq!(b.late_days, 1);
        assert_eq!(b.present_days, 20);
        assert_eq!(b.absent_deduction, dec!(2727));
        assert_eq!(b.late_deduction, dec!(341));
        assert_eq!(b.overtime_pay, dec!(0));
        assert_eq!(b.net_salary, dec!(26932));
    }

    #[test]
    fn partition_adds_up_to_working_days() {
        let staff = Uuid::new_v4();
        let rows = vec![
            mark(staff, 1, AttendanceStatus::Present, dec!(0)),
            mark(staff, 2, AttendanceStatus::Late, dec!(0)),
            mark(staff, 3, AttendanceStatus::Leave, dec!(0)),
            mark(staff, 4, AttendanceStatus::HalfDay, dec!(0)),
        ];
        let b = PayrollService::calculate(dec!(22000), &april(), &rows, &[]);

        let marked = (b.present_days - b.late_days) + b.late_days + b.leave_days + b.half_days;
        assert_eq!(marked + b.absent_days, b.working_days);
        // 1000/day: 18 absent, quarter-day late, half-day
        assert_eq!(b.absent_deduction, dec!(18000));
        assert_eq!(b.late_deduction, dec!(750));
    }

    #[test]
    fn over_marked_month_yields_negative_absence() {
        let staff = Uuid::new_v4();
        let mut rows = month_of(staff, 0, 0);
        // weekend rows are counted as well
        rows.push(mark(staff, 6, AttendanceStatus::Present, dec!(0)));
        rows.push(mark(staff, 7, AttendanceStatus::Present, dec!(0)));

        let b = PayrollService::calculate(dec!(22000), &april(), &rows, &[]);
        assert_eq!(b.absent_days, -2);
        assert_eq!(b.absent_deduction, dec!(-2000));
        assert_eq!(b.net_salary, dec!(24000));
    }

    #[test]
    fn net_salary_never_negative() {
        let heavy = loan(LoanStatus::Approved, dec!(90000), dec!(50000));
        let b = PayrollService::calculate(dec!(10000), &april(), &[], &[heavy]);
        assert_eq!(b.absent_days, 22);
        assert_eq!(b.net_salary, dec!(0));
    }

    #[test]
    fn overtime_is_time_and_a_half() {
        let staff = Uuid::new_v4();
        let mut rows = month_of(staff, 0, 0);
        rows[0].overtime_hours = dec!(3);
        rows[1].overtime_hours = dec!(1);

        // 22000 / 22 = 1000 per day, 125 per hour, 187.5 overtime hourly
        let b = PayrollService::calculate(dec!(22000), &april(), &rows, &[]);
        assert_eq!(b.overtime_pay, dec!(750));
        assert_eq!(b.net_salary, dec!(22750));
    }

    #[test]
    fn only_active_approved_loans_are_deducted() {
        let loans = vec![
            loan(LoanStatus::Approved, dec!(5000), dec!(1000)),
            loan(LoanStatus::Approved, dec!(300), dec!(500)),
            loan(LoanStatus::Pending, dec!(5000), dec!(1000)),
            loan(LoanStatus::Completed, dec!(0), dec!(1000)),
            loan(LoanStatus::Approved, dec!(0), dec!(1000)),
        ];
        let staff = Uuid::new_v4();
        let b = PayrollService::calculate(dec!(22000), &april(), &month_of(staff, 0, 0), &loans);
        assert_eq!(b.loan_deduction, dec!(1500));
        assert_eq!(b.net_salary, dec!(20500));
        assert_eq!(b.total_deductions(), dec!(1500));
    }

    #[test]
    fn calculation_is_deterministic() {
        let staff = Uuid::new_v4();
        let rows = month_of(staff, 3, 2);
        let loans = vec![loan(LoanStatus::Approved, dec!(5000), dec!(1000))];
        let a = PayrollService::calculate(dec!(31337), &april(), &rows, &loans);
        let b = PayrollService::calculate(dec!(31337), &april(), &rows, &loans);
        assert_eq!(a, b);
    }

    #[test]
    fn installment_floors_at_zero_and_completes() {
        assert_eq!(
            PayrollService::apply_installment(dec!(5000), dec!(1000)),
            (dec!(4000), LoanStatus::Approved)
        );
        assert_eq!(
            PayrollService::apply_installment(dec!(300), dec!(500)),
            (dec!(0), LoanStatus::Completed)
        );
        assert_eq!(
            PayrollService::apply_installment(dec!(1000), dec!(1000)),
            (dec!(0), LoanStatus::Completed)
        );
    }

    #[test]
    fn replayed_month_restores_pre_installment_view() {
        let charged_loan = loan(LoanStatus::Completed, dec!(0), dec!(500));
        let fresh_loan = loan(LoanStatus::Approved, dec!(4000), dec!(1000));
        let charged = HashMap::from([(charged_loan.id, dec!(500))]);

        let views = loan_views(vec![charged_loan, fresh_loan], &charged);
        assert!(views[0].already_charged);
        assert_eq!(views[0].loan.status, LoanStatus::Approved);
        assert_eq!(views[0].loan.remaining_amount, dec!(500));
        assert!(!views[1].already_charged);

        let loans: Vec<StaffLoan> = views.into_iter().map(|v| v.loan).collect();
        let b = PayrollService::calculate(dec!(22000), &april(), &[], &loans);
        assert_eq!(b.loan_deduction, dec!(1500));
    }

    async fn loan_balance(db: &PgPool, loan_id: Uuid) -> (Decimal, LoanStatus) {
        sqlx::query_as("SELECT remaining_amount, status FROM staff_loans WHERE id = $1")
            .bind(loan_id)
            .fetch_one(db)
            .await
            .unwrap()
    }

    async fn ledger(db: &PgPool, loan_id: Uuid) -> Vec<(String, Decimal)> {
        sqlx::query_as(
            "SELECT month, remaining_before FROM loan_deductions WHERE loan_id = $1 ORDER BY month",
        )
        .bind(loan_id)
        .fetch_all(db)
        .await
        .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn rerunning_a_month_charges_the_loan_once(pool: PgPool) {
        let tenant = fixtures::tenant(&pool).await;
        let staff = fixtures::staff(&pool, tenant, dec!(22000)).await;
        let loan_id = fixtures::approved_loan(&pool, tenant, staff, dec!(5000), dec!(1000)).await;

        let first = run_payroll(&pool, tenant, &april()).await.unwrap();
        let second = run_payroll(&pool, tenant, &april()).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.total_net, second.total_net);
        assert_eq!(loan_balance(&pool, loan_id).await, (dec!(4000), LoanStatus::Approved));
        assert_eq!(ledger(&pool, loan_id).await, vec![("2024-04".to_string(), dec!(5000))]);

        let deduction: Decimal = sqlx::query_scalar(
            "SELECT loan_deduction FROM salary_payments WHERE staff_id = $1 AND month = '2024-04'",
        )
        .bind(staff)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(deduction, dec!(1000));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn paid_salary_survives_a_rerun(pool: PgPool) {
        let tenant = fixtures::tenant(&pool).await;
        let staff = fixtures::staff(&pool, tenant, dec!(22000)).await;

        run_payroll(&pool, tenant, &april()).await.unwrap();
        sqlx::query("UPDATE salary_payments SET status = 'paid', paid_at = NOW() WHERE staff_id = $1")
            .bind(staff)
            .execute(&pool)
            .await
            .unwrap();
        let paid: (Decimal, Decimal) = sqlx::query_as(
            "SELECT basic_salary, net_salary FROM salary_payments WHERE staff_id = $1",
        )
        .bind(staff)
        .fetch_one(&pool)
        .await
        .unwrap();

        sqlx::query("UPDATE staff SET salary = 30000 WHERE id = $1")
            .bind(staff)
            .execute(&pool)
            .await
            .unwrap();
        run_payroll(&pool, tenant, &april()).await.unwrap();

        let after: (Decimal, Decimal) = sqlx::query_as(
            "SELECT basic_salary, net_salary FROM salary_payments WHERE staff_id = $1",
        )
        .bind(staff)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(after, paid);
        assert_eq!(after.0, dec!(22000));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn installment_uses_the_current_balance_not_a_stale_read(pool: PgPool) {
        let tenant = fixtures::tenant(&pool).await;
        let staff = fixtures::staff(&pool, tenant, dec!(22000)).await;
        let loan_id = fixtures::approved_loan(&pool, tenant, staff, dec!(5000), dec!(1000)).await;

        let stale: StaffLoan = sqlx::query_as("SELECT * FROM staff_loans WHERE id = $1")
            .bind(loan_id)
            .fetch_one(&pool)
            .await
            .unwrap();

        // another month's run commits between the read and the charge
        run_payroll(&pool, tenant, &PayPeriod::parse("2024-05").unwrap())
            .await
            .unwrap();

        let mut tx = pool.begin().await.unwrap();
        charge_loan(&mut tx, Uuid::new_v4(), "2024-06", &stale)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(loan_balance(&pool, loan_id).await, (dec!(3000), LoanStatus::Approved));
        assert_eq!(
            ledger(&pool, loan_id).await,
            vec![
                ("2024-05".to_string(), dec!(5000)),
                ("2024-06".to_string(), dec!(4000)),
            ]
        );
    }
}
