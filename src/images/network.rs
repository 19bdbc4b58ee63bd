//! Network-adaptive size policy.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::size::SizeToken;

/// Connection class as reported by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NetworkClass {
    Slow2g,
    Cellular2g,
    Cellular3g,
    Cellular4g,
    Wifi,
    Ethernet,
    #[default]
    Unknown,
}

impl NetworkClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkClass::Slow2g => "slow-2g",
            NetworkClass::Cellular2g => "2g",
            NetworkClass::Cellular3g => "3g",
            NetworkClass::Cellular4g => "4g",
            NetworkClass::Wifi => "wifi",
            NetworkClass::Ethernet => "ethernet",
            NetworkClass::Unknown => "unknown",
        }
    }
}

impl FromStr for NetworkClass {
    type Err = Infallible;

    /// Never fails: unrecognised classes map to `Unknown`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "slow-2g" => NetworkClass::Slow2g,
            "2g" => NetworkClass::Cellular2g,
            "3g" => NetworkClass::Cellular3g,
            "4g" => NetworkClass::Cellular4g,
            "wifi" => NetworkClass::Wifi,
            "ethernet" => NetworkClass::Ethernet,
            _ => NetworkClass::Unknown,
        })
    }
}

impl From<String> for NetworkClass {
    fn from(s: String) -> Self {
        s.parse::<NetworkClass>().unwrap_or_default()
    }
}

impl From<NetworkClass> for String {
    fn from(class: NetworkClass) -> Self {
        class.as_str().to_string()
    }
}

impl fmt::Display for NetworkClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Picks the image size to request on a given connection.
pub fn preferred_size(class: NetworkClass) -> SizeToken {
    match class {
        NetworkClass::Slow2g | NetworkClass::Cellular2g => SizeToken::SMALL,
        NetworkClass::Cellular3g => SizeToken::MEDIUM,
        NetworkClass::Cellular4g | NetworkClass::Wifi => SizeToken::LARGE,
        NetworkClass::Ethernet => SizeToken::XLARGE,
        NetworkClass::Unknown => SizeToken::MEDIUM,
    }
}
