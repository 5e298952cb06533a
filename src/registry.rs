//! Contract set resolution
//!
//! A router instance is only as valid as the contract addresses it talks
//! to, and those differ per exchange, per network and per protocol version.
//! The [`ContractRegistry`] trait is the lookup seam: implementations may
//! read a bundled table, a config file or an on-chain source. The crate
//! ships [`StaticRegistry`], an in-memory table preloaded with the
//! production Ethereum deployment.

use crate::error::RouterError;
use crate::types::ProtocolVersion;
use async_trait::async_trait;
use clarity::Address;
use std::collections::HashMap;

lazy_static! {
    /// Uniswap V3's SwapRouter on prod Ethereum
    pub static ref UNISWAP_V3_ROUTER_ADDRESS: Address =
        Address::parse_and_validate("0xE592427A0AEce92De3Edee1F18E0157C05861564").unwrap();
    /// Uniswap V3's factory on prod Ethereum
    pub static ref UNISWAP_V3_FACTORY_ADDRESS: Address =
        Address::parse_and_validate("0x1F98431c8aD98523631AE4a59f267346ea31F984").unwrap();
    /// Uniswap V3's QuoterV2 on prod Ethereum
    pub static ref UNISWAP_V3_QUOTER_ADDRESS: Address =
        Address::parse_and_validate("0x61fFE014bA17989E743c5F6cB21bF9697530B21e").unwrap();
    /// Uniswap V3's NonfungiblePositionManager on prod Ethereum
    pub static ref UNISWAP_V3_POSITION_MANAGER_ADDRESS: Address =
        Address::parse_and_validate("0xC36442b4a4522E871399CD717aBDD847Ab11FE88").unwrap();
    /// Uniswap V2's Router02 on prod Ethereum
    pub static ref UNISWAP_V2_ROUTER_ADDRESS: Address =
        Address::parse_and_validate("0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D").unwrap();
    /// Uniswap V2's factory on prod Ethereum
    pub static ref UNISWAP_V2_FACTORY_ADDRESS: Address =
        Address::parse_and_validate("0x5C69bEe701ef814a2B6a3EDD4B1652CB9cc5aA6f").unwrap();
}

/// The deployed contract addresses a router instance operates against
///
/// The quoter and position manager only exist for v3 deployments, v2
/// entries leave them unset. A pool contract needs no entry of its own, the
/// factory hands out pool addresses and pool calls go by signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractSet {
    pub router: Address,
    pub factory: Address,
    pub quoter: Option<Address>,
    pub position_manager: Option<Address>,
}

/// Resolves (exchange, network, version) to a deployed contract set
#[async_trait]
pub trait ContractRegistry: Send + Sync {
    /// Fails with [`RouterError::ContractNotFound`] listing the networks the
    /// exchange does support when the requested network has no deployment
    async fn resolve(
        &self,
        exchange: &str,
        network: u64,
        version: ProtocolVersion,
    ) -> Result<ContractSet, RouterError>;
}

/// An in-memory contract registry
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    entries: HashMap<(String, u64, ProtocolVersion), ContractSet>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        StaticRegistry {
            entries: HashMap::new(),
        }
    }

    /// A registry holding the production Ethereum Uniswap deployment under
    /// the exchange name "uniswap"
    pub fn uniswap_ethereum() -> Self {
        let mut registry = StaticRegistry::new();
        registry.insert(
            "uniswap",
            1,
            ProtocolVersion::V2,
            ContractSet {
                router: *UNISWAP_V2_ROUTER_ADDRESS,
                factory: *UNISWAP_V2_FACTORY_ADDRESS,
                quoter: None,
                position_manager: None,
            },
        );
        registry.insert(
            "uniswap",
            1,
            ProtocolVersion::V3,
            ContractSet {
                router: *UNISWAP_V3_ROUTER_ADDRESS,
                factory: *UNISWAP_V3_FACTORY_ADDRESS,
                quoter: Some(*UNISWAP_V3_QUOTER_ADDRESS),
                position_manager: Some(*UNISWAP_V3_POSITION_MANAGER_ADDRESS),
            },
        );
        registry
    }

    pub fn insert(
        &mut self,
        exchange: &str,
        network: u64,
        version: ProtocolVersion,
        contracts: ContractSet,
    ) {
        self.entries
            .insert((exchange.to_string(), network, version), contracts);
    }
}

#[async_trait]
impl ContractRegistry for StaticRegistry {
    async fn resolve(
        &self,
        exchange: &str,
        network: u64,
        version: ProtocolVersion,
    ) -> Result<ContractSet, RouterError> {
        match self
            .entries
            .get(&(exchange.to_string(), network, version))
        {
            Some(contracts) => Ok(contracts.clone()),
            None => {
                let mut supported: Vec<u64> = self
                    .entries
                    .keys()
                    .filter(|(name, _, ver)| name == exchange && *ver == version)
                    .map(|(_, net, _)| *net)
                    .collect();
                supported.sort_unstable();
                supported.dedup();
                Err(RouterError::ContractNotFound {
                    exchange: exchange.to_string(),
                    network,
                    supported,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_registry_resolves() {
        let registry = StaticRegistry::uniswap_ethereum();
        let contracts = registry
            .resolve("uniswap", 1, ProtocolVersion::V3)
            .await
            .unwrap();
        assert_eq!(contracts.router, *UNISWAP_V3_ROUTER_ADDRESS);
        assert!(contracts.quoter.is_some());
        assert!(contracts.position_manager.is_some());

        let v2 = registry
            .resolve("uniswap", 1, ProtocolVersion::V2)
            .await
            .unwrap();
        assert_eq!(v2.router, *UNISWAP_V2_ROUTER_ADDRESS);
        assert!(v2.quoter.is_none());
    }

    #[tokio::test]
    async fn test_missing_network_lists_supported() {
        let registry = StaticRegistry::uniswap_ethereum();
        let err = registry
            .resolve("uniswap", 11155111, ProtocolVersion::V3)
            .await
            .unwrap_err();
        match &err {
            RouterError::ContractNotFound {
                exchange,
                network,
                supported,
            } => {
                assert_eq!(exchange, "uniswap");
                assert_eq!(*network, 11155111);
                assert_eq!(supported, &vec![1u64]);
            }
            other => panic!("expected ContractNotFound, got {other:?}"),
        }
        assert!(err.to_string().contains("supports the following networks: 1"));
    }
}
