use crate::api::attendance::{
    AttendanceListResponse, AttendanceQuery, AttendanceReportRow, DetectRequest, PunchRequest,
    UpdateAttendance,
};
use crate::api::employee::{CreateEmployee, EmployeeListResponse, UpdateEmployee};
use crate::api::organization::CreateOrganization;
use crate::api::shift::{CreateShift, ShiftQuery};
use crate::model::attendance::Attendance;
use crate::model::employee::Employee;
use crate::model::organization::Organization;
use crate::model::shift::Shift;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "ATMS API",
        version = "1.0.0",
        description = r#"
## Attendance Management System

Face-recognition-backed employee attendance platform.

### Key Features
- **Punch Processing**
  - Shift-window detection with grace periods and overnight wraparound
  - Presence debouncing against single-frame spoofing
  - Delay / extra time / overtime computation on check-out
- **Background Jobs**
  - Auto-checkout sweeper for records left open past shift end
  - Hourly absence marking per shift
- **Administration**
  - Organization, employee, and shift CRUD
  - Manual attendance edits with audit trail and OT override

### Security
Endpoints are protected with **JWT Bearer authentication**; punch endpoints
accept recognition-device credentials.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::detect,
        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::list_attendance,
        crate::api::attendance::update_attendance,
        crate::api::attendance::delete_attendance,

        crate::api::employee::create_employee,
        crate::api::employee::get_employee,
        crate::api::employee::list_employees,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,

        crate::api::shift::create_shift,
        crate::api::shift::list_shifts,
        crate::api::shift::get_shift,
        crate::api::shift::update_shift,
        crate::api::shift::delete_shift,

        crate::api::organization::create_organization,
        crate::api::organization::list_organizations,
        crate::api::organization::get_organization,
        crate::api::organization::update_organization,
        crate::api::organization::delete_organization
    ),
    components(
        schemas(
            PunchRequest,
            DetectRequest,
            AttendanceQuery,
            UpdateAttendance,
            Attendance,
            AttendanceReportRow,
            AttendanceListResponse,
            CreateEmployee,
            UpdateEmployee,
            Employee,
            EmployeeListResponse,
            CreateShift,
            ShiftQuery,
            Shift,
            CreateOrganization,
            Organization
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Punch processing and attendance records"),
        (name = "Employee", description = "Employee management APIs"),
        (name = "Shift", description = "Shift definition APIs"),
        (name = "Organization", description = "Organization management APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
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
