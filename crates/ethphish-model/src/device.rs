//! Compute device selection

use candle_core::Device;
use ethphish_core::{Error, Result};
use std::str::FromStr;

/// Device to run training and inference on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceType {
    /// CPU (always available)
    #[default]
    Cpu,
    /// CUDA GPU by index
    Cuda(usize),
    /// Metal (Apple Silicon) by index
    Metal(usize),
}

impl DeviceType {
    /// Create the candle device
    pub fn create(self) -> Result<Device> {
        match self {
            Self::Cpu => Ok(Device::Cpu),
            Self::Cuda(idx) => Device::new_cuda(idx)
                .map_err(|e| Error::config(format!("Failed to create CUDA device: {}", e))),
            Self::Metal(idx) => Device::new_metal(idx)
                .map_err(|e| Error::config(format!("Failed to create Metal device: {}", e))),
        }
    }
}

impl FromStr for DeviceType {
    type Err = Error;

    /// `cpu`, `cuda`, `cuda:N`, `metal`, `metal:N`
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_ascii_lowercase();
        let (kind, index) = match s.split_once(':') {
            Some((kind, idx)) => {
                let idx = idx
                    .parse::<usize>()
                    .map_err(|_| Error::config(format!("invalid device index in '{}'", s)))?;
                (kind.to_string(), idx)
            }
            None => (s.clone(), 0),
        };

        match kind.as_str() {
            "cpu" => Ok(Self::Cpu),
            "cuda" | "gpu" => Ok(Self::Cuda(index)),
            "metal" | "mps" => Ok(Self::Metal(index)),
            _ => Err(Error::config(format!("unknown device '{}'", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_devices() {
        assert_eq!("cpu".parse::<DeviceType>().unwrap(), DeviceType::Cpu);
        assert_eq!("CUDA".parse::<DeviceType>().unwrap(), DeviceType::Cuda(0));
        assert_eq!("cuda:2".parse::<DeviceType>().unwrap(), DeviceType::Cuda(2));
        assert_eq!("mps".parse::<DeviceType>().unwrap(), DeviceType::Metal(0));
        assert!("tpu".parse::<DeviceType>().is_err());
        assert!("cuda:x".parse::<DeviceType>().is_err());
    }

    #[test]
    fn test_cpu_always_available() {
        assert!(DeviceType::Cpu.create().unwrap().is_cpu());
    }
}
