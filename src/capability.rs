//! Compute capability selection.
//!
//! Resolves the device/precision pair used to parameterize model
//! construction. The probe runs once at startup; a process restart is
//! required to pick up hardware changes.

use crate::defaults;

/// Compute device used for model inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Gpu,
}

/// Numeric precision used for model inference.
///
/// `Int8` is never auto-selected; it is reserved for explicitly
/// configured quantized decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    Fp16,
    Fp32,
    Int8,
}

/// Resolved device/precision pair.
///
/// Fixed for the lifetime of the component that resolved it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityProfile {
    pub device: Device,
    pub precision: Precision,
}

impl CapabilityProfile {
    /// Human-readable label for logs, e.g. "gpu/fp16".
    pub fn label(&self) -> &'static str {
        match (self.device, self.precision) {
            (Device::Gpu, Precision::Fp16) => "gpu/fp16",
            (Device::Gpu, Precision::Fp32) => "gpu/fp32",
            (Device::Gpu, Precision::Int8) => "gpu/int8",
            (Device::Cpu, Precision::Fp16) => "cpu/fp16",
            (Device::Cpu, Precision::Fp32) => "cpu/fp32",
            (Device::Cpu, Precision::Int8) => "cpu/int8",
        }
    }
}

/// Select the execution profile for this build.
///
/// GPU acceleration compiled in selects `{Gpu, Fp16}`; otherwise `{Cpu, Fp32}`.
/// Pure and cheap, but callers resolve it once at construction rather than
/// re-probing per request.
pub fn select_profile() -> CapabilityProfile {
    if gpu_available() {
        CapabilityProfile {
            device: Device::Gpu,
            precision: Precision::Fp16,
        }
    } else {
        CapabilityProfile {
            device: Device::Cpu,
            precision: Precision::Fp32,
        }
    }
}

/// Whether a GPU backend was compiled into this build.
///
/// Mirrors `defaults::gpu_backend()`: the backend is a compile-time
/// property, so this is the whole probe.
fn gpu_available() -> bool {
    defaults::gpu_backend() != "CPU"
}
