use crate::api::attendance::{AttendanceQuery, CheckPayload};
use crate::api::company::{CreateCompany, GenerateInvite, JoinCompany, Member};
use crate::api::department::{CreateDepartment, DepartmentQuery};
use crate::api::geofence::{CreateGeofence, GeofenceQuery};
use crate::api::leave_request::{CreateLeave, LeaveFilter, LeaveType};
use crate::api::payroll::{CreatePayroll, PaginatedPayrollResponse, PayrollQuery};
use crate::api::report::{AttendanceStats, LeaveStats, ReportRequest};
use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use crate::model::company::{Company, InviteCode};
use crate::model::department::Department;
use crate::model::geofence::Geofence;
use crate::model::leave_request::LeaveRequest;
use crate::model::payroll::Payroll;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Workforce Management API",
        version = "1.0.0",
        description = r#"
## Multi-tenant workforce management

This API powers a multi-tenant workforce management system: companies,
role-gated membership, and geofenced, face-verified attendance.

### Key Features
- **Attendance**
  - Check-in gated by geofence validation and AI face verification
  - Check-out with derived hours worked
- **Companies**
  - Create a company, invite members by code, per-company roles
- **Geofences & Departments**
  - Admin-managed site boundaries and departments
- **Leave & Payroll**
  - Leave requests with approval flow, monthly payroll records
- **Reports**
  - Attendance and leave statistics over a date range

### Security
Endpoints are protected with **JWT Bearer authentication**; company-scoped
operations additionally check the caller's role within that company.
"#,
    ),
    paths(
        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::list_attendance,

        crate::api::company::create_company,
        crate::api::company::list_members,
        crate::api::company::generate_invite,
        crate::api::company::join_company,

        crate::api::geofence::create_geofence,
        crate::api::geofence::list_geofences,
        crate::api::geofence::update_geofence,
        crate::api::geofence::delete_geofence,

        crate::api::department::create_department,
        crate::api::department::list_departments,
        crate::api::department::delete_department,

        crate::api::leave_request::leave_list,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::create_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,

        crate::api::payroll::create_payroll,
        crate::api::payroll::list_payrolls,

        crate::api::report::generate_report,
    ),
    components(
        schemas(
            CheckPayload,
            AttendanceQuery,
            AttendanceRecord,
            AttendanceStatus,
            Company,
            InviteCode,
            CreateCompany,
            GenerateInvite,
            JoinCompany,
            Member,
            Geofence,
            CreateGeofence,
            GeofenceQuery,
            Department,
            CreateDepartment,
            DepartmentQuery,
            LeaveType,
            CreateLeave,
            LeaveFilter,
            LeaveRequest,
            Payroll,
            CreatePayroll,
            PayrollQuery,
            PaginatedPayrollResponse,
            ReportRequest,
            AttendanceStats,
            LeaveStats,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Geofenced, face-verified attendance APIs"),
        (name = "Company", description = "Company and membership APIs"),
        (name = "Geofence", description = "Site boundary administration APIs"),
        (name = "Department", description = "Department administration APIs"),
        (name = "Leave", description = "Leave management APIs"),
        (name = "Payroll", description = "Payroll management APIs"),
        (name = "Report", description = "Aggregate reporting APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
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
            );
        }
    }
}
