use crate::error::{BerthError, Result};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use std::collections::BTreeMap;
use tracing::debug;

/// Resource map key for CPU
pub const RESOURCE_CPU: &str = "cpu";
/// Resource map key for memory
pub const RESOURCE_MEMORY: &str = "memory";

const MIB: i64 = 1024 * 1024;

const BINARY_SUFFIXES: [(&str, i64); 6] = [
    ("Ki", 1 << 10),
    ("Mi", 1 << 20),
    ("Gi", 1 << 30),
    ("Ti", 1 << 40),
    ("Pi", 1 << 50),
    ("Ei", 1 << 60),
];

const DECIMAL_SUFFIXES: [(&str, i64); 6] = [
    ("k", 1_000),
    ("M", 1_000_000),
    ("G", 1_000_000_000),
    ("T", 1_000_000_000_000),
    ("P", 1_000_000_000_000_000),
    ("E", 1_000_000_000_000_000_000),
];

/// CPU and memory normalized to fixed base units.
///
/// CPU is held in millicores and memory in mebibytes. A resource kind that was
/// never reported is `None`; the accessors treat it as zero so every comparison
/// happens on plain integers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceQuantities {
    cpu_millicores: Option<i64>,
    memory_mib: Option<i64>,
}

impl ResourceQuantities {
    /// Create quantities with both resources reported
    pub fn new(cpu_millicores: i64, memory_mib: i64) -> Self {
        Self {
            cpu_millicores: Some(cpu_millicores),
            memory_mib: Some(memory_mib),
        }
    }

    /// CPU in millicores (1000 = 1 core), zero when absent
    pub fn cpu_millicores(&self) -> i64 {
        self.cpu_millicores.unwrap_or(0)
    }

    /// Memory in MiB, zero when absent
    pub fn memory_mib(&self) -> i64 {
        self.memory_mib.unwrap_or(0)
    }

    /// True when neither CPU nor memory was reported
    pub fn is_empty(&self) -> bool {
        self.cpu_millicores.is_none() && self.memory_mib.is_none()
    }

    /// Parse CPU string (e.g., "2", "1000m", "0.5") into millicores
    pub fn parse_cpu(s: &str) -> Result<i64> {
        let s = s.trim();
        let millicores = if let Some(m) = s.strip_suffix('m') {
            m.parse::<i64>()
                .map_err(|e| BerthError::invalid_quantity(s, format!("invalid millicores: {}", e)))?
        } else {
            let cores = s
                .parse::<f64>()
                .map_err(|e| BerthError::invalid_quantity(s, format!("invalid cores: {}", e)))?;
            let millicores = (cores * 1000.0).round();
            if !millicores.is_finite() || millicores >= i64::MAX as f64 {
                return Err(BerthError::invalid_quantity(s, "quantity overflows"));
            }
            millicores as i64
        };

        if millicores < 0 {
            return Err(BerthError::invalid_quantity(s, "negative quantity"));
        }
        Ok(millicores)
    }

    /// Parse memory string (e.g., "128Mi", "1Gi", "1G", "1024") into bytes
    pub fn parse_memory(s: &str) -> Result<i64> {
        let s = s.trim();

        for (suffix, multiplier) in BINARY_SUFFIXES.iter().chain(DECIMAL_SUFFIXES.iter()) {
            if let Some(num) = s.strip_suffix(suffix) {
                return scale(s, num, *multiplier);
            }
        }

        if let Some(num) = s.strip_suffix('m') {
            // Millibytes: only meaningful for the floor to whole bytes
            return scale(s, num, 1).map(|b| b / 1000);
        }

        scale(s, s, 1)
    }

    /// Convert bytes to MiB, rounding down
    pub fn bytes_to_mib(bytes: i64) -> i64 {
        bytes.div_euclid(MIB)
    }

    /// Read CPU and memory from a k8s-openapi resource map.
    ///
    /// Unparseable entries are treated as absent.
    pub fn from_k8s_resource_map(resources: &BTreeMap<String, Quantity>) -> Self {
        let cpu_millicores = resources.get(RESOURCE_CPU).and_then(|q| {
            Self::parse_cpu(&q.0)
                .map_err(|e| debug!("Ignoring CPU quantity: {}", e))
                .ok()
        });

        let memory_mib = resources.get(RESOURCE_MEMORY).and_then(|q| {
            Self::parse_memory(&q.0)
                .map(Self::bytes_to_mib)
                .map_err(|e| debug!("Ignoring memory quantity: {}", e))
                .ok()
        });

        Self {
            cpu_millicores,
            memory_mib,
        }
    }
}

fn scale(original: &str, num: &str, multiplier: i64) -> Result<i64> {
    let value = if let Ok(whole) = num.parse::<i64>() {
        whole
            .checked_mul(multiplier)
            .ok_or_else(|| BerthError::invalid_quantity(original, "quantity overflows"))?
    } else {
        let fractional = num
            .parse::<f64>()
            .map_err(|e| BerthError::invalid_quantity(original, e.to_string()))?;
        let scaled = fractional * multiplier as f64;
        if !scaled.is_finite() || scaled >= i64::MAX as f64 {
            return Err(BerthError::invalid_quantity(original, "quantity overflows"));
        }
        scaled.floor() as i64
    };

    if value < 0 {
        return Err(BerthError::invalid_quantity(original, "negative quantity"));
    }
    Ok(value)
}
