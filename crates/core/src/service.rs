//! Downstream service identifiers.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// One of the fixed downstream RPC services behind the gateway.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceName {
    Auth,
    Admin,
    Vendor,
    Client,
}

impl ServiceName {
    /// Every downstream service, in a stable order.
    pub const ALL: [ServiceName; 4] = [
        ServiceName::Auth,
        ServiceName::Admin,
        ServiceName::Vendor,
        ServiceName::Client,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceName::Auth => "auth",
            ServiceName::Admin => "admin",
            ServiceName::Vendor => "vendor",
            ServiceName::Client => "client",
        }
    }
}

impl core::fmt::Display for ServiceName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceName {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auth" => Ok(ServiceName::Auth),
            "admin" => Ok(ServiceName::Admin),
            "vendor" => Ok(ServiceName::Vendor),
            "client" => Ok(ServiceName::Client),
            other => Err(CoreError::UnknownService(other.to_string())),
        }
    }
}
