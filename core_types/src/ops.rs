//! Operation codes
//!
//! Two separate numeric spaces exist: generic CRUD intents understood by
//! the persistence driver ([`DriverOp`]) and device-specific ioctl requests
//! ([`DeviceRequest`]). Both travel as raw `u32` values through the kernel
//! and are decoded by the consumer that owns the space.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Generic CRUD intent shared by every resource kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum DriverOp {
    GetById = 1,
    GetAll = 2,
    Create = 3,
    Update = 4,
    Delete = 5,
    Query = 6,
}

impl DriverOp {
    /// Returns the stable numeric code
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Decodes a numeric code
    pub fn from_code(code: u32) -> Option<Self> {
        let op = match code {
            1 => DriverOp::GetById,
            2 => DriverOp::GetAll,
            3 => DriverOp::Create,
            4 => DriverOp::Update,
            5 => DriverOp::Delete,
            6 => DriverOp::Query,
            _ => return None,
        };
        Some(op)
    }

    /// True for operations that address a single entity by id
    pub fn requires_id(self) -> bool {
        matches!(self, DriverOp::GetById | DriverOp::Update | DriverOp::Delete)
    }
}

impl fmt::Display for DriverOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DriverOp::GetById => "GET_BY_ID",
            DriverOp::GetAll => "GET_ALL",
            DriverOp::Create => "CREATE",
            DriverOp::Update => "UPDATE",
            DriverOp::Delete => "DELETE",
            DriverOp::Query => "QUERY",
        };
        write!(f, "{}", name)
    }
}

/// Device ioctl request codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum DeviceRequest {
    Initialize = 0,
    SetCharacter = 1,
    CalcAbility = 2,
    CalcSkill = 3,
    CalcSave = 4,
    CalcCombat = 5,
    ApplyBonus = 6,
    ApplyCondition = 7,
}

impl DeviceRequest {
    /// Returns the stable numeric code
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Decodes a numeric code
    pub fn from_code(code: u32) -> Option<Self> {
        let request = match code {
            0 => DeviceRequest::Initialize,
            1 => DeviceRequest::SetCharacter,
            2 => DeviceRequest::CalcAbility,
            3 => DeviceRequest::CalcSkill,
            4 => DeviceRequest::CalcSave,
            5 => DeviceRequest::CalcCombat,
            6 => DeviceRequest::ApplyBonus,
            7 => DeviceRequest::ApplyCondition,
            _ => return None,
        };
        Some(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_op_codes() {
        assert_eq!(DriverOp::GetById.code(), 1);
        assert_eq!(DriverOp::from_code(5), Some(DriverOp::Delete));
        assert_eq!(DriverOp::from_code(0), None);
    }

    #[test]
    fn test_device_request_codes() {
        assert_eq!(DeviceRequest::Initialize.code(), 0);
        assert_eq!(DeviceRequest::ApplyCondition.code(), 7);
        assert_eq!(DeviceRequest::from_code(2), Some(DeviceRequest::CalcAbility));
        assert_eq!(DeviceRequest::from_code(8), None);
    }

    #[test]
    fn test_requires_id() {
        assert!(DriverOp::GetById.requires_id());
        assert!(DriverOp::Update.requires_id());
        assert!(DriverOp::Delete.requires_id());
        assert!(!DriverOp::GetAll.requires_id());
        assert!(!DriverOp::Create.requires_id());
    }
}
