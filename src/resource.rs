use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::validate::Validate;

/// The manageable entity types of the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Branch,
    Department,
    Position,
    Device,
    BreakTime,
    DocumentType,
    Employee,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 7] = [
        ResourceKind::Branch,
        ResourceKind::Department,
        ResourceKind::Position,
        ResourceKind::Device,
        ResourceKind::BreakTime,
        ResourceKind::DocumentType,
        ResourceKind::Employee,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Branch => "branch",
            ResourceKind::Department => "department",
            ResourceKind::Position => "position",
            ResourceKind::Device => "device",
            ResourceKind::BreakTime => "break-time",
            ResourceKind::DocumentType => "document-type",
            ResourceKind::Employee => "employee",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        ResourceKind::ALL
            .into_iter()
            .find(|k| k.as_str() == normalized)
            .ok_or_else(|| format!("unknown resource '{}'", s))
    }
}

/// How a backend lays out the CRUD endpoints under a resource's base path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteStyle {
    /// `GET base`, `POST base`, `PUT base/{id}`, `DELETE base/{id}`.
    Rest,
    /// `GET base/list`, `POST base/create`, `PUT base/update/{id}`,
    /// `DELETE base/delete/{id}`.
    Verb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMethod {
    Put,
    Patch,
}

/// Static configuration of one paginated resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub kind: ResourceKind,
    pub base_path: &'static str,
    /// Human readable singular, used in mutation and detail fallback messages.
    pub noun: &'static str,
    /// Human readable plural, used in list fallback messages.
    pub label: &'static str,
    /// Plural key holding the records in a list response.
    pub collection_key: &'static str,
    pub filter_keys: &'static [&'static str],
    pub routes: RouteStyle,
    pub update_method: UpdateMethod,
}

impl Descriptor {
    pub fn list_path(&self) -> String {
        match self.routes {
            RouteStyle::Rest => self.base_path.to_string(),
            RouteStyle::Verb => format!("{}/list", self.base_path),
        }
    }

    pub fn create_path(&self) -> String {
        match self.routes {
            RouteStyle::Rest => self.base_path.to_string(),
            RouteStyle::Verb => format!("{}/create", self.base_path),
        }
    }

    pub fn update_path(&self, id: &str) -> String {
        match self.routes {
            RouteStyle::Rest => format!("{}/{}", self.base_path, id),
            RouteStyle::Verb => format!("{}/update/{}", self.base_path, id),
        }
    }

    pub fn delete_path(&self, id: &str) -> String {
        match self.routes {
            RouteStyle::Rest => format!("{}/{}", self.base_path, id),
            RouteStyle::Verb => format!("{}/delete/{}", self.base_path, id),
        }
    }

    pub fn detail_path(&self, id: &str) -> String {
        format!("{}/{}", self.base_path, id)
    }
}

/// A record type served by a paginated resource endpoint.
pub trait Resource: Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Creatable fields; never carries `id`, `createdAt` or `updatedAt`.
    type Create: Serialize + DeserializeOwned + Validate + Send + Sync;
    /// Partial update body.
    type Update: Serialize + DeserializeOwned + Send + Sync;

    fn descriptor() -> &'static Descriptor;

    fn id(&self) -> &str;
}
