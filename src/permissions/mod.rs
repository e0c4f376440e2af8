//! Permission handling
//!
//! Recording needs camera access plus coarse and fine location. The host
//! owns the actual prompt; the gate only checks grants, asks the host to
//! prompt for whatever is missing, and interprets the asynchronous answer.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Request code attached to the permission prompt
pub const PERMISSION_REQUEST_CODE: i32 = 101;

/// A capability the recorder depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    Camera,
    CoarseLocation,
    FineLocation,
}

impl Capability {
    /// Everything recording needs
    pub const REQUIRED: [Capability; 3] = [
        Capability::Camera,
        Capability::CoarseLocation,
        Capability::FineLocation,
    ];

    pub fn identifier(&self) -> &'static str {
        match self {
            Capability::Camera => "camera",
            Capability::CoarseLocation => "coarse-location",
            Capability::FineLocation => "fine-location",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

impl FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Capability::REQUIRED
            .into_iter()
            .find(|c| c.identifier() == s.trim())
            .ok_or_else(|| format!("Unknown capability: {}", s))
    }
}

/// Host-side permission store and prompt
pub trait PermissionProvider: Send {
    /// Whether the capability is currently granted
    fn is_granted(&self, capability: Capability) -> bool;

    /// Ask the host to prompt for `capabilities`. The answer comes back
    /// later through [`PermissionGate::on_result`].
    fn request(&mut self, capabilities: &[Capability], request_code: i32);

    /// Remember an answer the host delivered
    fn record(&mut self, _capability: Capability, _granted: bool) {}
}

/// Grants held in memory, seeded from configuration
#[derive(Debug, Default)]
pub struct ConfiguredPermissions {
    granted: HashSet<Capability>,
}

impl ConfiguredPermissions {
    pub fn new(granted: impl IntoIterator<Item = Capability>) -> Self {
        Self {
            granted: granted.into_iter().collect(),
        }
    }
}

impl PermissionProvider for ConfiguredPermissions {
    fn is_granted(&self, capability: Capability) -> bool {
        self.granted.contains(&capability)
    }

    fn request(&mut self, capabilities: &[Capability], request_code: i32) {
        tracing::info!(
            "Permission request {} for: {}",
            request_code,
            capabilities
                .iter()
                .map(Capability::identifier)
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    fn record(&mut self, capability: Capability, granted: bool) {
        if granted {
            self.granted.insert(capability);
        } else {
            self.granted.remove(&capability);
        }
    }
}

/// Outcome of a permission prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Every requested capability was granted
    Granted,
    /// At least one capability was refused
    Denied,
    /// The answer belonged to another request
    Ignored,
}

/// Checks and requests the capabilities recording depends on
pub struct PermissionGate {
    provider: Box<dyn PermissionProvider>,
}

impl PermissionGate {
    pub fn new(provider: Box<dyn PermissionProvider>) -> Self {
        Self { provider }
    }

    /// Capabilities still missing
    pub fn missing(&self) -> Vec<Capability> {
        Capability::REQUIRED
            .into_iter()
            .filter(|c| !self.provider.is_granted(*c))
            .collect()
    }

    pub fn all_granted(&self) -> bool {
        self.missing().is_empty()
    }

    /// Prompt for every required capability if any is missing.
    /// Returns whether a prompt was issued.
    pub fn request_missing(&mut self) -> bool {
        if self.all_granted() {
            return false;
        }
        self.provider
            .request(&Capability::REQUIRED, PERMISSION_REQUEST_CODE);
        true
    }

    /// Interpret the host's answer to a prompt
    pub fn on_result(&mut self, request_code: i32, results: &[(Capability, bool)]) -> GateDecision {
        if request_code != PERMISSION_REQUEST_CODE {
            tracing::debug!("Ignoring permission result for request {}", request_code);
            return GateDecision::Ignored;
        }

        for (capability, granted) in results {
            self.provider.record(*capability, *granted);
        }

        if !results.is_empty() && results.iter().all(|(_, granted)| *granted) {
            GateDecision::Granted
        } else {
            tracing::warn!("Permissions denied: {:?}", self.missing());
            GateDecision::Denied
        }
    }
}
