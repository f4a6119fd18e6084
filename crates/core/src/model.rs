//! Inventory domain model
//!
//! Everything the explorer discovers ends up in these types. Records carry
//! their attributes in a generic [`Attributes`] mapping; only the fields the
//! traversal treats specially (memory size, subsystem collections) get a
//! named field.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::attributes::{AttributeFilter, Attributes, Scalar, GENERIC_EXCLUSIONS};
use crate::links::SERVICE_ROOT;
use crate::obscure::obscure_default;

// ============================================================================
// Subsystems
// ============================================================================

/// The kinds of hardware records hanging off a System.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubsystemKind {
    Processor,
    NetworkInterface,
    StorageController,
    Disk,
}

impl SubsystemKind {
    /// Key of the System field linking to this kind's collection.
    ///
    /// Disks are reported inline by storage controllers and have no
    /// collection of their own.
    pub fn link_key(self) -> Option<&'static str> {
        match self {
            SubsystemKind::Processor => Some("Processors"),
            SubsystemKind::NetworkInterface => Some("EthernetInterfaces"),
            SubsystemKind::StorageController => Some("SimpleStorage"),
            SubsystemKind::Disk => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SubsystemKind::Processor => "processor",
            SubsystemKind::NetworkInterface => "network interface",
            SubsystemKind::StorageController => "storage controller",
            SubsystemKind::Disk => "disk",
        }
    }

    /// Fields excluded for this kind on top of [`GENERIC_EXCLUSIONS`].
    pub fn extra_exclusions(self) -> &'static [&'static str] {
        match self {
            SubsystemKind::NetworkInterface => &["UefiDevicePath"],
            SubsystemKind::StorageController => &["Devices"],
            SubsystemKind::Processor | SubsystemKind::Disk => &[],
        }
    }

    /// Attribute filter for records of this kind.
    pub fn filter(self) -> AttributeFilter {
        AttributeFilter::new(GENERIC_EXCLUSIONS.iter().copied())
            .with_exclusions(self.extra_exclusions().iter().copied())
    }
}

impl fmt::Display for SubsystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One processor, network interface, storage controller or disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub kind: SubsystemKind,
    pub attributes: Attributes,
}

impl Record {
    pub fn new(kind: SubsystemKind, attributes: Attributes) -> Self {
        Self { kind, attributes }
    }

    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.attributes.get(key)
    }
}

// ============================================================================
// Systems
// ============================================================================

/// A computer system and the hardware discovered beneath it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct System {
    /// Last segment of the System's resource path.
    pub id: String,
    pub attributes: Attributes,
    /// `MemorySummary.TotalSystemMemoryGiB`, when reported.
    pub memory_gib: Option<f64>,
    pub processors: BTreeMap<String, Record>,
    pub network_interfaces: BTreeMap<String, Record>,
    pub storage_controllers: BTreeMap<String, Record>,
    /// Disks in discovery order. The controller supplies no identifier.
    pub disks: Vec<Record>,
}

impl System {
    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.attributes.get(key)
    }

    /// Records of an addressable subsystem kind. Disks live in [`System::disks`].
    pub fn subsystem(&self, kind: SubsystemKind) -> Option<&BTreeMap<String, Record>> {
        match kind {
            SubsystemKind::Processor => Some(&self.processors),
            SubsystemKind::NetworkInterface => Some(&self.network_interfaces),
            SubsystemKind::StorageController => Some(&self.storage_controllers),
            SubsystemKind::Disk => None,
        }
    }

    /// Service tag: the serial number when reported, the derived id otherwise.
    pub fn tag(&self) -> &str {
        self.attributes
            .get_str("SerialNumber")
            .filter(|serial| !serial.is_empty())
            .unwrap_or(&self.id)
    }
}

/// Result of one exploration run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    /// `RedfishVersion` advertised by the service root.
    pub api_version: Option<String>,
    pub systems: BTreeMap<String, System>,
    /// Ids of systems whose document could not be fetched.
    pub skipped: Vec<String>,
}

impl Inventory {
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }
}

// ============================================================================
// Controller
// ============================================================================

pub const DEFAULT_PORT: u16 = 443;
pub const DEFAULT_SCHEME: &str = "https";

/// Connection details for one management controller.
#[derive(Clone, PartialEq, Eq)]
pub struct Controller {
    host: String,
    user: String,
    password: String,
    port: u16,
    scheme: String,
}

impl Controller {
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            password: password.into(),
            port: DEFAULT_PORT,
            scheme: DEFAULT_SCHEME.to_string(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Service root URL, e.g. `https://10.0.0.5:443/redfish/v1/`.
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}{}", self.scheme, self.host, self.port, SERVICE_ROOT)
    }
}

impl fmt::Display for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}:{}/{}",
            self.user,
            self.host,
            self.port,
            obscure_default(&self.password)
        )
    }
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &obscure_default(&self.password))
            .field("port", &self.port)
            .field("scheme", &self.scheme)
            .finish()
    }
}
