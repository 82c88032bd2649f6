use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fixed recipient of every donation.
pub const RECIPIENT_ADDRESS: &str = "0xc707EF9aaD513Ff3E35033fA1863268f879f9Fa0";
pub const RECIPIENT_NAME: &str = "Joshua";
pub const CURRENCY: &str = "USDC";

pub const DEFAULT_AMOUNT: &str = "10.00";
pub const QUICK_AMOUNTS: [&str; 4] = ["5.00", "10.00", "25.00", "50.00"];

macro_rules! string_id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id_newtype!(TransactionId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttemptId(pub Uuid);

impl AttemptId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AttemptId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Network {
    #[default]
    Testnet,
    Mainnet,
}

impl Network {
    pub fn from_testnet_flag(testnet: bool) -> Self {
        if testnet {
            Self::Testnet
        } else {
            Self::Mainnet
        }
    }

    pub fn is_testnet(self) -> bool {
        self == Self::Testnet
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Testnet => "Base Sepolia Testnet",
            Self::Mainnet => "Base Mainnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Testnet => f.write_str("testnet"),
            Self::Mainnet => f.write_str("mainnet"),
        }
    }
}

impl std::str::FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "testnet" | "test" | "sepolia" => Ok(Self::Testnet),
            "mainnet" | "main" => Ok(Self::Mainnet),
            other => Err(format!("unknown network '{other}', expected testnet or mainnet")),
        }
    }
}

/// Four-state status of the current donation attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DonationStatus {
    #[default]
    Idle,
    Processing,
    Completed,
    Failed,
}

impl DonationStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for DonationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// `0xc707...9Fa0` style abbreviation used wherever the address is displayed.
pub fn short_address(address: &str) -> String {
    if address.len() <= 10 || !address.is_ascii() {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipient_is_abbreviated_for_display() {
        assert_eq!(short_address(RECIPIENT_ADDRESS), "0xc707...9Fa0");
        assert_eq!(short_address("0xabc"), "0xabc");
    }

    #[test]
    fn network_round_trips_through_testnet_flag() {
        assert_eq!(Network::from_testnet_flag(true), Network::Testnet);
        assert_eq!(Network::from_testnet_flag(false), Network::Mainnet);
        assert!(Network::default().is_testnet());
        assert_eq!("Mainnet".parse::<Network>(), Ok(Network::Mainnet));
        assert!("devnet".parse::<Network>().is_err());
    }

    #[test]
    fn only_completed_and_failed_are_terminal() {
        assert!(!DonationStatus::Idle.is_terminal());
        assert!(!DonationStatus::Processing.is_terminal());
        assert!(DonationStatus::Completed.is_terminal());
        assert!(DonationStatus::Failed.is_terminal());
    }
}
