//! Target descriptors and shared runtime surface types.
//!
//! A target is a device class plus a set of capability flags. Targets parse
//! from the compact string form used on command lines:
//!
//! ```
//! use simconv::runtime::{DeviceClass, TargetDescriptor};
//! let target: TargetDescriptor = "cpu -libs=sim".parse().unwrap();
//! assert_eq!(target.device(), DeviceClass::Cpu);
//! assert!(target.has_capability("sim"));
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Capability flag that opts a target into the accelerator-simulator path.
pub const SIMULATOR_CAPABILITY: &str = "sim";

/// Capability flag advertising int8 dot-product instructions.
pub const INT8_DOT_CAPABILITY: &str = "int8-dot";

/// Logical device class of a compilation target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    #[default]
    Cpu,
    Gpu,
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceClass::Cpu => write!(f, "cpu"),
            DeviceClass::Gpu => write!(f, "gpu"),
        }
    }
}

/// Device class and capability flags for one compilation.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize)]
pub struct TargetDescriptor {
    device: DeviceClass,
    capabilities: BTreeSet<String>,
}

impl TargetDescriptor {
    pub fn new(device: DeviceClass) -> Self {
        Self {
            device,
            capabilities: BTreeSet::new(),
        }
    }

    pub fn cpu() -> Self {
        Self::new(DeviceClass::Cpu)
    }

    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.insert(capability.into());
        self
    }

    pub fn device(&self) -> DeviceClass {
        self.device
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }

    pub fn capabilities(&self) -> impl Iterator<Item = &str> {
        self.capabilities.iter().map(String::as_str)
    }
}

/// Errors raised while parsing a target string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetParseError {
    #[error("empty target string")]
    Empty,
    #[error("unknown target kind `{0}`")]
    UnknownKind(String),
    #[error("unsupported target option `{0}`")]
    UnknownOption(String),
}

impl FromStr for TargetDescriptor {
    type Err = TargetParseError;

    /// Parses `"<kind> [-libs=a,b] [-mattr=+x,+y]"`. `llvm` is accepted as an
    /// alias for `cpu`; `-mattr` entries lose their leading `+`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let kind = parts.next().ok_or(TargetParseError::Empty)?;
        let device = match kind {
            "cpu" | "llvm" => DeviceClass::Cpu,
            "gpu" | "cuda" => DeviceClass::Gpu,
            other => return Err(TargetParseError::UnknownKind(other.to_string())),
        };

        let mut target = TargetDescriptor::new(device);
        for option in parts {
            let (key, values) = option
                .split_once('=')
                .ok_or_else(|| TargetParseError::UnknownOption(option.to_string()))?;
            let strip_plus = match key {
                "-libs" => false,
                "-mattr" => true,
                _ => return Err(TargetParseError::UnknownOption(option.to_string())),
            };
            for value in values.split(',').map(str::trim).filter(|v| !v.is_empty()) {
                let value = if strip_plus {
                    value.trim_start_matches('+')
                } else {
                    value
                };
                target.capabilities.insert(value.to_string());
            }
        }
        Ok(target)
    }
}

impl fmt::Display for TargetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.device)?;
        if !self.capabilities.is_empty() {
            let libs: Vec<&str> = self.capabilities().collect();
            write!(f, " -libs={}", libs.join(","))?;
        }
        Ok(())
    }
}

/// Opaque handle to runtime-managed buffer storage.
pub type BufferHandle = usize;

/// Structured error returned by simulator backends.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// The call does not follow the simulator calling convention.
    #[error("malformed simulator call: {message}")]
    MalformedCall { message: String },
    /// Generic backend failure message.
    #[error("simulator error: {message}")]
    Message { message: String },
}
