// src/openapi.rs

use crate::models::{
    AllocateLeaveBalanceRequest, Attendance, AttendanceStatus, AuthResponse, BandwidthInfo,
    BillStatus, ChangePackageRequest, ConfirmManualPaymentRequest, CreateBillRequest,
    CreateCustomerRequest, CreateLeaveTypeRequest, CreateLoanRequest, CreatePackageRequest,
    CreateProductRequest, CreateStaffRequest, CreateTicketRequest, Customer,
    CustomerAuthResponse, CustomerBill, CustomerLoginRequest, DeviceAction, GatewayKind,
    InitiatePaymentRequest, InitiatePaymentResponse, LeaveBalance, LeaveRequest, LeaveStatus,
    LeaveType, LoanStatus, LoanType, LoginRequest, MarkAttendanceRequest, MarkSalaryPaidRequest,
    NetworkStatus, OnuDevice, Package, PayBillRequest, Payment, PaymentGatewayConfig,
    PaymentPurpose, PaymentStatus, PayrollRun, PayrollRunStatus, Product, RechargeRequest,
    RegisterTenantRequest, RejectLeaveRequest, RunPayrollRequest, SalaryBreakdown,
    SalaryPayment, SalaryPaymentStatus, Staff, StaffLoan, SubmitLeaveRequest, SupportTicket,
    TenantPublic, UpdateProfileRequest, UpdateStaffRequest, UpsertGatewayConfigRequest,
    VerifyTokenRequest,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "ISP Back-Office API",
        version = "1.0.0",
        description = "Back-office API for internet service providers. \
            Covers staff attendance, leave and loans, monthly payroll with emailed payslips, \
            subscriber billing through local payment gateways, a customer self-service API, \
            ONU device export and printable inventory reports.",
        license(name = "MIT")
    ),
    paths(
        // Tenants
        crate::handlers::tenant::register_tenant,
        crate::handlers::tenant::login_tenant,
        crate::handlers::tenant::get_tenant_profile,
        // Staff
        crate::handlers::staff::create_staff,
        crate::handlers::staff::list_staff,
        crate::handlers::staff::get_staff,
        crate::handlers::staff::update_staff,
        crate::handlers::staff::deactivate_staff,
        // Attendance
        crate::handlers::attendance::mark_attendance,
        crate::handlers::attendance::list_attendance,
        // Leave
        crate::handlers::leave::create_leave_type,
        crate::handlers::leave::list_leave_types,
        crate::handlers::leave::deactivate_leave_type,
        crate::handlers::leave::allocate_leave_balance,
        crate::handlers::leave::list_leave_balances,
        crate::handlers::leave::submit_leave_request,
        crate::handlers::leave::list_leave_requests,
        crate::handlers::leave::approve_leave_request,
        crate::handlers::leave::reject_leave_request,
        crate::handlers::leave::cancel_leave_request,
        // Loans
        crate::handlers::loans::create_loan,
        crate::handlers::loans::list_loans,
        crate::handlers::loans::approve_loan,
        crate::handlers::loans::reject_loan,
        // Payroll
        crate::handlers::payroll::preview_salary,
        crate::handlers::payroll::run_payroll,
        crate::handlers::payroll::list_payroll_runs,
        crate::handlers::payroll::get_payroll_run,
        crate::handlers::payroll::list_salary_payments,
        crate::handlers::payroll::mark_salary_paid,
        // Payments
        crate::handlers::payments::initiate_payment,
        crate::handlers::payments::upsert_gateway_config,
        crate::handlers::payments::list_gateway_configs,
        crate::handlers::payments::list_payments,
        crate::handlers::payments::confirm_manual_payment,
        // Customers
        crate::handlers::customers::create_package,
        crate::handlers::customers::list_packages,
        crate::handlers::customers::create_customer,
        crate::handlers::customers::list_customers,
        crate::handlers::customers::create_bill,
        crate::handlers::customers::list_customer_bills,
        // Customer API
        crate::handlers::customer_api::login,
        crate::handlers::customer_api::verify_token,
        crate::handlers::customer_api::get_profile,
        crate::handlers::customer_api::update_profile,
        crate::handlers::customer_api::network_status,
        crate::handlers::customer_api::bandwidth,
        crate::handlers::customer_api::list_bills,
        crate::handlers::customer_api::get_bill,
        crate::handlers::customer_api::list_payments,
        crate::handlers::customer_api::initiate_bill_payment,
        crate::handlers::customer_api::recharge,
        crate::handlers::customer_api::reboot_router,
        crate::handlers::customer_api::reboot_onu,
        crate::handlers::customer_api::disconnect,
        crate::handlers::customer_api::list_packages,
        crate::handlers::customer_api::change_package,
        crate::handlers::customer_api::list_tickets,
        crate::handlers::customer_api::create_ticket,
        // Devices
        crate::handlers::devices::list_onu_devices,
        crate::handlers::devices::export_onu_devices,
        // Inventory
        crate::handlers::inventory::create_product,
        crate::handlers::inventory::list_products,
        crate::handlers::inventory::inventory_report,
        crate::handlers::inventory::product_labels,
    ),
    components(
        schemas(
            RegisterTenantRequest, LoginRequest, AuthResponse, TenantPublic,
            Staff, CreateStaffRequest, UpdateStaffRequest,
            Attendance, AttendanceStatus, MarkAttendanceRequest,
            LeaveType, CreateLeaveTypeRequest, LeaveBalance, AllocateLeaveBalanceRequest,
            LeaveRequest, LeaveStatus, SubmitLeaveRequest, RejectLeaveRequest,
            StaffLoan, LoanType, LoanStatus, CreateLoanRequest,
            PayrollRun, PayrollRunStatus, RunPayrollRequest, SalaryBreakdown,
            SalaryPayment, SalaryPaymentStatus, MarkSalaryPaidRequest,
            GatewayKind, PaymentGatewayConfig, UpsertGatewayConfigRequest,
            Payment, PaymentStatus, PaymentPurpose,
            InitiatePaymentRequest, InitiatePaymentResponse, ConfirmManualPaymentRequest,
            Package, CreatePackageRequest, Customer, CreateCustomerRequest,
            CustomerBill, BillStatus, CreateBillRequest,
            CustomerLoginRequest, CustomerAuthResponse, VerifyTokenRequest, UpdateProfileRequest,
            NetworkStatus, BandwidthInfo, PayBillRequest, RechargeRequest, ChangePackageRequest,
            DeviceAction, SupportTicket, CreateTicketRequest,
            OnuDevice, Product, CreateProductRequest,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Tenants", description = "Register and log in as an ISP administrator"),
        (name = "Staff", description = "Manage staff members"),
        (name = "Attendance", description = "Daily attendance records"),
        (name = "Leave", description = "Leave types, balances and requests"),
        (name = "Loans", description = "Staff loans and salary advances"),
        (name = "Payroll", description = "Salary previews, payroll runs and payslips"),
        (name = "Payments", description = "Gateway configuration and payment initiation"),
        (name = "Customers", description = "Packages, subscribers and bills"),
        (name = "Customer API", description = "Self-service API for subscribers"),
        (name = "Devices", description = "ONU inventory and CSV export"),
        (name = "Inventory", description = "Products and printable reports"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_both_apis() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/payroll/run"));
        assert!(doc.paths.paths.contains_key("/customer-api/network/status"));
        assert!(doc.paths.paths.contains_key("/api/v1/onu-devices/export"));
    }
}
