use crate::{config::SmtpConfig, errors::AppError, models::SalaryPayment};
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use rust_decimal::Decimal;
use tokio::task::JoinHandle;
use tracing::{error, info};

#[derive(Clone)]
pub struct EmailService {
    smtp: SmtpConfig,
}

impl EmailService {
    pub fn new(smtp: SmtpConfig) -> Self {
        Self { smtp }
    }

    fn build_transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, AppError> {
        let creds = Credentials::new(self.smtp.username.clone(), self.smtp.password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.smtp.host)
            .map_err(|e| AppError::EmailError(e.to_string()))?
            .credentials(creds)
            .port(self.smtp.port)
            .build();

        Ok(transport)
    }

    /// Sends the payslip in the background. Any failure, including a bad
    /// address, is logged against the slip.
    pub fn spawn_payslip_email(
        self,
        staff_email: String,
        staff_name: String,
        tenant_name: String,
        slip: SalaryPayment,
    ) -> JoinHandle<Result<(), AppError>> {
        tokio::spawn(async move {
            let sent = self
                .send_payslip_email(&staff_email, &staff_name, &tenant_name, &slip)
                .await;
            if let Err(e) = &sent {
                error!("Payslip {} for {} was not emailed: {}", slip.id, staff_email, e);
            }
            sent
        })
    }

    /// Send a payslip email to a staff member once their salary is marked paid
    pub async fn send_payslip_email(
        &self,
        staff_email: &str,
        staff_name: &str,
        tenant_name: &str,
        slip: &SalaryPayment,
    ) -> Result<(), AppError> {
        let subject = format!("Your Payslip for {} - {}", slip.month, tenant_name);

        let from_mailbox = format!("{} <{}>", self.smtp.from_name, self.smtp.from_address)
            .parse()
            .map_err(|e: lettre::address::AddressError| AppError::EmailError(e.to_string()))?;

        let to_mailbox = format!("{} <{}>", staff_name, staff_email)
            .parse()
            .map_err(|e: lettre::address::AddressError| AppError::EmailError(e.to_string()))?;

        let email = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(build_payslip_text(staff_name, tenant_name, slip)),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(build_payslip_html(staff_name, tenant_name, slip)),
                    ),
            )
            .map_err(|e| AppError::EmailError(e.to_string()))?;

        let transport = self.build_transport()?;

        match transport.send(email).await {
            Ok(_) => {
                info!("Payslip email sent to {}", staff_email);
                Ok(())
            }
            Err(e) => {
                error!("Failed to send payslip email to {}: {}", staff_email, e);
                Err(AppError::EmailError(e.to_string()))
            }
        }
    }
}

fn format_amount(amount: Decimal) -> String {
    format!("৳{:.2}", amount)
}

fn total_deductions(slip: &SalaryPayment) -> Decimal {
    slip.absent_deduction + slip.late_deduction + slip.loan_deduction
}

fn build_payslip_html(staff_name: &str, tenant_name: &str, slip: &SalaryPayment) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <style>
    body {{ font-family: Arial, sans-serif; background: #f4f4f4; color: #333; }}
    .container {{ max-width: 600px; margin: 30px auto; background: #fff; border-radius: 8px; overflow: hidden; box-shadow: 0 2px 8px rgba(0,0,0,0.1); }}
    .header {{ background: #0f766e; color: #fff; padding: 24px 32px; }}
    .header h1 {{ margin: 0; font-size: 22px; }}
    .header p {{ margin: 4px 0 0; opacity: 0.85; }}
    .body {{ padding: 24px 32px; }}
    h2 {{ color: #0f766e; border-bottom: 2px solid #e5e7eb; padding-bottom: 6px; }}
    table {{ width: 100%; border-collapse: collapse; margin-bottom: 16px; }}
    td {{ padding: 8px 4px; border-bottom: 1px solid #f1f1f1; }}
    td:last-child {{ text-align: right; font-weight: 600; }}
    .total-row td {{ font-size: 16px; color: #0f766e; border-top: 2px solid #0f766e; border-bottom: none; }}
    .deductions td {{ color: #dc2626; }}
    .footer {{ background: #f9fafb; padding: 16px 32px; font-size: 12px; color: #6b7280; text-align: center; }}
  </style>
</head>
<body>
<div class="container">
  <div class="header">
    <h1>{tenant_name}</h1>
    <p>Payslip for {month}</p>
  </div>
  <div class="body">
    <p>Dear <strong>{staff_name}</strong>,</p>
    <p>Your salary for <strong>{month}</strong> has been paid. Please find your payslip details below.</p>

    <h2>Attendance</h2>
    <table>
      <tr><td>Days Present</td><td>{present_days}</td></tr>
      <tr><td>Days Absent</td><td>{absent_days}</td></tr>
      <tr><td>Late Marks</td><td>{late_days}</td></tr>
    </table>

    <h2>Earnings</h2>
    <table>
      <tr><td>Basic Salary</td><td>{basic_salary}</td></tr>
      <tr><td>Overtime</td><td>{overtime_pay}</td></tr>
      <tr class="total-row"><td>Gross Salary</td><td>{gross_salary}</td></tr>
    </table>

    <h2>Deductions</h2>
    <table class="deductions">
      <tr><td>Absence</td><td>- {absent_deduction}</td></tr>
      <tr><td>Late / Half Day</td><td>- {late_deduction}</td></tr>
      <tr><td>Loan Installment</td><td>- {loan_deduction}</td></tr>
      <tr class="total-row"><td>Total Deductions</td><td>- {total_deductions}</td></tr>
    </table>

    <h2>Net Pay</h2>
    <table>
      <tr class="total-row"><td>Amount Paid</td><td>{net_salary}</td></tr>
    </table>

    <p style="margin-top:16px; font-size:13px; color:#6b7280;">Payment Method: <code>{payment_method}</code></p>
  </div>
  <div class="footer">
    <p>This is an automated payslip from {tenant_name}. Please do not reply to this email.</p>
  </div>
</div>
</body>
</html>"#,
        tenant_name = tenant_name,
        month = slip.month,
        staff_name = staff_name,
        present_days = slip.present_days,
        absent_days = slip.absent_days,
        late_days = slip.late_days,
        basic_salary = format_amount(slip.basic_salary),
        overtime_pay = format_amount(slip.overtime_pay),
        gross_salary = format_amount(slip.gross_salary),
        absent_deduction = format_amount(slip.absent_deduction),
        late_deduction = format_amount(slip.late_deduction),
        loan_deduction = format_amount(slip.loan_deduction),
        total_deductions = format_amount(total_deductions(slip)),
        net_salary = format_amount(slip.net_salary),
        payment_method = slip.payment_method.as_deref().unwrap_or("N/A"),
    )
}

fn build_payslip_text(staff_name: &str, tenant_name: &str, slip: &SalaryPayment) -> String {
    format!(
        "Dear {staff_name},\n\n\
        Your salary for {month} has been paid by {tenant_name}.\n\n\
        ATTENDANCE\n\
        Present:             {present_days}\n\
        Absent:              {absent_days}\n\
        Late:                {late_days}\n\n\
        EARNINGS\n\
        Basic Salary:        {basic_salary}\n\
        Overtime:            {overtime_pay}\n\
        Gross Salary:        {gross_salary}\n\n\
        DEDUCTIONS\n\
        Absence:             {absent_deduction}\n\
        Late / Half Day:     {late_deduction}\n\
        Loan Installment:    {loan_deduction}\n\
        Total Deductions:    {total_deductions}\n\n\
        NET PAY:             {net_salary}\n\n\
        Payment Method: {payment_method}\n\n\
        This is an automated message from {tenant_name}.",
        staff_name = staff_name,
        month = slip.month,
        tenant_name = tenant_name,
        present_days = slip.present_days,
        absent_days = slip.absent_days,
        late_days = slip.late_days,
        basic_salary = format_amount(slip.basic_salary),
        overtime_pay = format_amount(slip.overtime_pay),
        gross_salary = format_amount(slip.gross_salary),
        absent_deduction = format_amount(slip.absent_deduction),
        late_deduction = format_amount(slip.late_deduction),
        loan_deduction = format_amount(slip.loan_deduction),
        total_deductions = format_amount(total_deductions(slip)),
        net_salary = format_amount(slip.net_salary),
        payment_method = slip.payment_method.as_deref().unwrap_or("N/A"),
    )
}
