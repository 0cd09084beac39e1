//! Address canonicalisation and validation.
//!
//! Every id that enters the graph goes through [`canonical_id`], so two spellings of the
//! same address can never become two nodes.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Solana,
    Ethereum,
    Base,
    Arbitrum,
    Polygon,
    Bnb,
}

impl Chain {
    pub const ALL: [Chain; 6] = [
        Self::Solana,
        Self::Ethereum,
        Self::Base,
        Self::Arbitrum,
        Self::Polygon,
        Self::Bnb,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Solana => "solana",
            Self::Ethereum => "ethereum",
            Self::Base => "base",
            Self::Arbitrum => "arbitrum",
            Self::Polygon => "polygon",
            Self::Bnb => "bnb",
        }
    }

    pub fn is_evm(self) -> bool {
        !matches!(self, Self::Solana)
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Chain {
    type Err = AddressError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lowered = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|chain| chain.as_str() == lowered)
            .ok_or_else(|| AddressError::UnknownChain(value.to_owned()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressKind {
    Evm,
    Solana,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("Please enter a token address")]
    Empty,
    #[error("Invalid address format. Must be either an Ethereum (0x...) or Solana address")]
    Malformed(String),
    #[error("Address {address} is not valid on {chain}")]
    WrongChain { address: String, chain: Chain },
    #[error("Unknown chain: {0}")]
    UnknownChain(String),
}

/// Lowercased, trimmed form used as node identity.
pub fn canonical_id(address: &str) -> String {
    address.trim().to_lowercase()
}

/// Classifies a user-supplied address and returns the trimmed form.
pub fn validate_address(address: &str) -> Result<(String, AddressKind), AddressError> {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return Err(AddressError::Empty);
    }

    if let Some(hex) = trimmed.strip_prefix("0x") {
        if hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Ok((trimmed.to_owned(), AddressKind::Evm));
        }
        return Err(AddressError::Malformed(trimmed.to_owned()));
    }

    let base58 = trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() && !matches!(c, '0' | 'O' | 'I' | 'l'));
    if (32..=44).contains(&trimmed.len()) && base58 {
        Ok((trimmed.to_owned(), AddressKind::Solana))
    } else {
        Err(AddressError::Malformed(trimmed.to_owned()))
    }
}

/// Validates an address against the chain it is going to be queried on.
pub fn validate_for_chain(address: &str, chain: Chain) -> Result<String, AddressError> {
    let (address, kind) = validate_address(address)?;
    match (kind, chain.is_evm()) {
        (AddressKind::Evm, true) | (AddressKind::Solana, false) => Ok(address),
        _ => Err(AddressError::WrongChain { address, chain }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOL: &str = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";
    const ETH: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";

    #[test]
    fn case_variants_collapse_to_one_id() {
        let variants = vec![
            ETH.to_owned(),
            ETH.to_lowercase(),
            ETH.to_uppercase().replace("0X", "0x"),
        ];
        let ids: std::collections::HashSet<_> = variants.iter().map(|a| canonical_id(a)).collect();
        assert_eq!(ids.len(), 1);
        assert_eq!(canonical_id(&format!("  {SOL} ")), SOL.to_lowercase());
    }

    #[test]
    fn validates_both_families() {
        assert_eq!(validate_address(ETH).map(|(_, kind)| kind), Ok(AddressKind::Evm));
        assert_eq!(validate_address(SOL).map(|(_, kind)| kind), Ok(AddressKind::Solana));
        assert_eq!(validate_address("   "), Err(AddressError::Empty));
        assert!(matches!(validate_address("0x1234"), Err(AddressError::Malformed(_))));
        assert!(matches!(validate_address("hello"), Err(AddressError::Malformed(_))));
    }

    #[test]
    fn rejects_address_from_other_family() {
        assert!(validate_for_chain(SOL, Chain::Solana).is_ok());
        assert!(matches!(
            validate_for_chain(SOL, Chain::Ethereum),
            Err(AddressError::WrongChain { .. })
        ));
    }

    #[test]
    fn parses_chain_names() {
        assert_eq!("Solana".parse::<Chain>(), Ok(Chain::Solana));
        assert!("dogechain".parse::<Chain>().is_err());
    }
}
