//! Entity records served by the attendance backend, their create/update
//! payloads, and the descriptor wiring each one to its endpoints.
use serde::{Deserialize, Serialize};

use crate::resource::{Descriptor, Resource, ResourceKind, RouteStyle, UpdateMethod};
use crate::validate::{self, Validate, ValidationErrors};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BranchStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CalculationType {
    #[serde(rename = "Auto Deduct")]
    AutoDeduct,
    #[serde(rename = "Manual")]
    Manual,
}

// ---------- Branch ----------

pub static BRANCH: Descriptor = Descriptor {
    kind: ResourceKind::Branch,
    base_path: "/branch",
    noun: "branch",
    label: "branches",
    collection_key: "branches",
    filter_keys: &[],
    routes: RouteStyle::Rest,
    update_method: UpdateMethod::Put,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superior: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<BranchStatus>,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BranchCreate {
    pub name: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superior: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<BranchStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BranchUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<BranchStatus>,
}

impl Validate for BranchCreate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = ValidationErrors::new();
        errs.require("name", &self.name, "Branch name is required");
        errs.require("code", &self.code, "Branch code is required");
        if let Some(phone) = self.phone.as_deref().filter(|p| !p.trim().is_empty()) {
            if !validate::is_phone(phone) {
                errs.push("phone", "Invalid phone number");
            }
        }
        errs.into_result()
    }
}

impl Resource for Branch {
    type Create = BranchCreate;
    type Update = BranchUpdate;

    fn descriptor() -> &'static Descriptor {
        &BRANCH
    }

    fn id(&self) -> &str {
        &self.id
    }
}

// ---------- Department ----------

pub static DEPARTMENT: Descriptor = Descriptor {
    kind: ResourceKind::Department,
    base_path: "/department",
    noun: "department",
    label: "departments",
    collection_key: "departments",
    filter_keys: &[],
    routes: RouteStyle::Rest,
    update_method: UpdateMethod::Put,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DepartmentCreate {
    pub name: String,
    pub code: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DepartmentUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl Validate for DepartmentCreate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = ValidationErrors::new();
        errs.require("name", &self.name, "Department name is required");
        errs.require("code", &self.code, "Department code is required");
        errs.into_result()
    }
}

impl Resource for Department {
    type Create = DepartmentCreate;
    type Update = DepartmentUpdate;

    fn descriptor() -> &'static Descriptor {
        &DEPARTMENT
    }

    fn id(&self) -> &str {
        &self.id
    }
}

// ---------- Position ----------

pub static POSITION: Descriptor = Descriptor {
    kind: ResourceKind::Position,
    base_path: "/position",
    noun: "position",
    label: "positions",
    collection_key: "positions",
    filter_keys: &[],
    routes: RouteStyle::Rest,
    update_method: UpdateMethod::Put,
};

/// `department_id` is not checked against existing departments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub code: String,
    pub department_id: String,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PositionCreate {
    pub name: String,
    pub code: String,
    pub department_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PositionUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department_id: Option<String>,
}

impl Validate for PositionCreate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = ValidationErrors::new();
        errs.require("name", &self.name, "Position name is required");
        errs.require("code", &self.code, "Position code is required");
        errs.require("departmentId", &self.department_id, "Department is required");
        errs.into_result()
    }
}

impl Resource for Position {
    type Create = PositionCreate;
    type Update = PositionUpdate;

    fn descriptor() -> &'static Descriptor {
        &POSITION
    }

    fn id(&self) -> &str {
        &self.id
    }
}

// ---------- Document type ----------

pub static DOCUMENT_TYPE: Descriptor = Descriptor {
    kind: ResourceKind::DocumentType,
    base_path: "/document-type",
    noun: "document type",
    label: "document types",
    collection_key: "documentTypes",
    filter_keys: &[],
    routes: RouteStyle::Rest,
    update_method: UpdateMethod::Patch,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentType {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub code: String,
    pub branch: String,
    pub department: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department_name: Option<String>,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// One request registers several document type names for a branch/department pair.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentTypeCreate {
    pub branch: String,
    pub department: String,
    pub document_types: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentTypeUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_types: Option<Vec<String>>,
}

impl Validate for DocumentTypeCreate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = ValidationErrors::new();
        errs.require("branch", &self.branch, "Branch is required");
        errs.require("department", &self.department, "Department is required");
        if self.document_types.is_empty() {
            errs.push("documentTypes", "At least one document type is required");
        }
        for name in &self.document_types {
            let len = name.trim().chars().count();
            if len < 2 {
                errs.push("documentTypes", "Document type must be at least 2 characters");
            } else if len > 50 {
                errs.push("documentTypes", "Document type must be at most 50 characters");
            }
        }
        errs.into_result()
    }
}

impl Resource for DocumentType {
    type Create = DocumentTypeCreate;
    type Update = DocumentTypeUpdate;

    fn descriptor() -> &'static Descriptor {
        &DOCUMENT_TYPE
    }

    fn id(&self) -> &str {
        &self.id
    }
}

// ---------- Device ----------

pub static DEVICE: Descriptor = Descriptor {
    kind: ResourceKind::Device,
    base_path: "/device",
    noun: "device",
    label: "devices",
    collection_key: "devices",
    filter_keys: &["state", "city"],
    routes: RouteStyle::Verb,
    update_method: UpdateMethod::Put,
};

/// A biometric attendance terminal registered with the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    #[serde(rename = "_id")]
    pub id: String,
    pub device_name: String,
    pub attendance_device: String,
    #[serde(rename = "deviceIP")]
    pub device_ip: String,
    pub registration_device: String,
    pub serial_no: String,
    pub request_method: String,
    pub time_zone: String,
    pub transfer_mode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCreate {
    pub device_name: String,
    pub attendance_device: String,
    #[serde(rename = "deviceIP")]
    pub device_ip: String,
    pub registration_device: String,
    pub serial_no: String,
    pub request_method: String,
    pub time_zone: String,
    pub transfer_mode: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attendance_device: Option<String>,
    #[serde(default, rename = "deviceIP", skip_serializing_if = "Option::is_none")]
    pub device_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_device: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_mode: Option<String>,
}

impl Validate for DeviceCreate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = ValidationErrors::new();
        errs.require("deviceName", &self.device_name, "Device name is required");
        errs.require("attendanceDevice", &self.attendance_device, "Attendance device is required");
        errs.require("deviceIP", &self.device_ip, "Device IP is required");
        errs.require("registrationDevice", &self.registration_device, "Registration device is required");
        errs.require("serialNo", &self.serial_no, "Serial number is required");
        errs.require("requestMethod", &self.request_method, "Request method is required");
        errs.require("timeZone", &self.time_zone, "Time zone is required");
        errs.require("transferMode", &self.transfer_mode, "Transfer mode is required");
        if !self.device_ip.trim().is_empty() && !validate::is_ipv4(&self.device_ip) {
            errs.push("deviceIP", "Device IP must be an IPv4 address");
        }
        errs.into_result()
    }
}

impl Resource for Device {
    type Create = DeviceCreate;
    type Update = DeviceUpdate;

    fn descriptor() -> &'static Descriptor {
        &DEVICE
    }

    fn id(&self) -> &str {
        &self.id
    }
}

// ---------- Break time ----------

pub static BREAK_TIME: Descriptor = Descriptor {
    kind: ResourceKind::BreakTime,
    base_path: "/break-time",
    noun: "break time",
    label: "break times",
    collection_key: "breakTimes",
    filter_keys: &["name", "startTime", "calculationType"],
    routes: RouteStyle::Verb,
    update_method: UpdateMethod::Put,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BreakTime {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub start_time: String,
    pub end_time: String,
    pub duration: String,
    pub with_salary: bool,
    pub calculation_type: CalculationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BreakTimeCreate {
    pub name: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub duration: String,
    pub with_salary: bool,
    pub calculation_type: CalculationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl BreakTimeCreate {
    /// Builds a payload with `duration` derived from the start and end times.
    pub fn new(
        name: impl Into<String>,
        start_time: impl Into<String>,
        end_time: impl Into<String>,
        with_salary: bool,
        calculation_type: CalculationType,
    ) -> Self {
        Self {
            name: name.into(),
            start_time: start_time.into(),
            end_time: end_time.into(),
            duration: String::new(),
            with_salary,
            calculation_type,
            description: None,
        }
        .with_computed_duration()
    }

    /// Recomputes `duration`; an end time not after the start leaves it empty.
    pub fn with_computed_duration(mut self) -> Self {
        self.duration = validate::break_duration(&self.start_time, &self.end_time).unwrap_or_default();
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BreakTimeUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub with_salary: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculation_type: Option<CalculationType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Validate for BreakTimeCreate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = ValidationErrors::new();
        errs.require("name", &self.name, "Name is required");
        errs.require("startTime", &self.start_time, "Start time is required");
        errs.require("endTime", &self.end_time, "End time is required");
        errs.require("duration", &self.duration, "Duration is required");
        if !self.start_time.trim().is_empty() && !validate::is_clock_time(&self.start_time) {
            errs.push("startTime", "Start time must be HH:MM");
        }
        if !self.end_time.trim().is_empty() && !validate::is_clock_time(&self.end_time) {
            errs.push("endTime", "End time must be HH:MM");
        }
        errs.into_result()
    }
}

impl Resource for BreakTime {
    type Create = BreakTimeCreate;
    type Update = BreakTimeUpdate;

    fn descriptor() -> &'static Descriptor {
        &BREAK_TIME
    }

    fn id(&self) -> &str {
        &self.id
    }
}

// ---------- Employee ----------

pub static EMPLOYEE: Descriptor = Descriptor {
    kind: ResourceKind::Employee,
    base_path: "/employee",
    noun: "employee",
    label: "employees",
    collection_key: "employees",
    filter_keys: &["branch", "department", "position", "gender"],
    routes: RouteStyle::Verb,
    update_method: UpdateMethod::Put,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    #[serde(rename = "_id")]
    pub id: String,
    pub employee_id: String,
    pub name: String,
    pub branch: String,
    pub department: String,
    pub position: String,
    pub gender: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeDocument {
    pub name: String,
    #[serde(rename = "type")]
    pub doc_type: String,
}

/// Onboarding form: personal details, work info, device access and legal documents.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeCreate {
    pub employee_id: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub date_of_birth: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_optional: Option<String>,
    pub email: String,
    pub nationality: String,
    pub branch: String,
    pub department: String,
    pub position: String,
    pub superior: String,
    pub date_of_join: String,
    pub salary: String,
    pub verify_mode: String,
    pub device_privilege: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enroll_device: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub documents: Vec<EmployeeDocument>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Validate for EmployeeCreate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = ValidationErrors::new();
        errs.require("employeeId", &self.employee_id, "Employee ID is required");
        errs.require("firstName", &self.first_name, "First name is required");
        errs.require("lastName", &self.last_name, "Last name is required");
        errs.require("gender", &self.gender, "Gender is required");
        errs.require("dateOfBirth", &self.date_of_birth, "Date of birth is required");
        errs.require("nationality", &self.nationality, "Nationality is required");
        errs.require("branch", &self.branch, "Branch is required");
        errs.require("department", &self.department, "Department is required");
        errs.require("position", &self.position, "Position is required");
        errs.require("superior", &self.superior, "Superior is required");
        errs.require("dateOfJoin", &self.date_of_join, "Date of join is required");
        errs.require("salary", &self.salary, "Salary is required");
        errs.require("verifyMode", &self.verify_mode, "Verify mode is required");
        errs.require("devicePrivilege", &self.device_privilege, "Device privilege is required");
        if !validate::is_phone(&self.phone) {
            errs.push("phone", "Invalid phone number");
        }
        if let Some(alt) = self.phone_optional.as_deref().filter(|p| !p.trim().is_empty()) {
            if !validate::is_phone(alt) {
                errs.push("phoneOptional", "Invalid phone number");
            }
        }
        if !validate::is_email(&self.email) {
            errs.push("email", "Invalid email address");
        }
        for doc in &self.documents {
            if doc.name.trim().is_empty() {
                errs.push("documents", "Document name is required");
            }
            if doc.doc_type.trim().is_empty() {
                errs.push("documents", "Document type is required");
            }
        }
        errs.into_result()
    }
}

impl Resource for Employee {
    type Create = EmployeeCreate;
    type Update = EmployeeUpdate;

    fn descriptor() -> &'static Descriptor {
        &EMPLOYEE
    }

    fn id(&self) -> &str {
        &self.id
    }
}

pub fn descriptor_for(kind: ResourceKind) -> &'static Descriptor {
    match kind {
        ResourceKind::Branch => &BRANCH,
        ResourceKind::Department => &DEPARTMENT,
        ResourceKind::Position => &POSITION,
        ResourceKind::Device => &DEVICE,
        ResourceKind::BreakTime => &BREAK_TIME,
        ResourceKind::DocumentType => &DOCUMENT_TYPE,
        ResourceKind::Employee => &EMPLOYEE,
    }
}
