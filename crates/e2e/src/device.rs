//! Device profiles and per-session device context
//!
//! Checkout tests run parametrized across devices. A profile names the
//! device and its viewport; the context derived from it travels with
//! the session into the lifecycle fixture, which records the device
//! label and a `"WIDTHxHEIGHT"` resolution label on every outcome.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::HarnessResult;

/// A named browser device configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceProfile {
    /// Device label, e.g. `"iPhone X"`
    pub name: String,

    /// Viewport width in CSS pixels
    pub width: u32,

    /// Viewport height in CSS pixels
    pub height: u32,
}

impl DeviceProfile {
    pub fn context(&self) -> DeviceContext {
        DeviceContext::new(&self.name, self.width, self.height)
    }
}

/// Device/resolution metadata attached to one browser session.
///
/// Produced by provisioning together with the session handle and passed
/// into the lifecycle fixture explicitly, so concurrent test workers
/// can never observe each other's device context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceContext {
    pub device: String,
    pub viewport: Option<(u32, u32)>,
}

impl DeviceContext {
    pub fn new(device: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            device: device.into(),
            viewport: Some((width, height)),
        }
    }

    /// Context for a session whose viewport could not be resolved
    pub fn unknown(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            viewport: None,
        }
    }

    /// Resolution label as persisted: `"WIDTHxHEIGHT"` or `"unknown"`
    pub fn resolution_label(&self) -> String {
        match self.viewport {
            Some((w, h)) => format!("{}x{}", w, h),
            None => "unknown".to_string(),
        }
    }
}

/// The set of device profiles a suite runs against
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceCatalog {
    pub devices: Vec<DeviceProfile>,
}

impl DeviceCatalog {
    /// Built-in profiles used when no catalog file is provided
    pub fn builtin() -> Self {
        let devices = [
            ("desktop", 1920, 1080),
            ("laptop", 1280, 720),
            ("iPhone X", 375, 812),
            ("iPad", 768, 1024),
            ("Pixel 5", 393, 851),
        ]
        .iter()
        .map(|(name, width, height)| DeviceProfile {
            name: name.to_string(),
            width: *width,
            height: *height,
        })
        .collect();
        Self { devices }
    }

    /// Parse a catalog from YAML
    pub fn from_yaml(yaml: &str) -> HarnessResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a catalog from a YAML file
    pub fn from_file(path: &Path) -> HarnessResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Look up a profile by its device label
    pub fn get(&self, name: &str) -> Option<&DeviceProfile> {
        self.devices.iter().find(|d| d.name == name)
    }
}
