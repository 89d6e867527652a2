//! Contract interfaces for the Comet market, the snapshot query helper and
//! the on-chain liquidator executor.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

sol! {
    /// Per-asset configuration as stored by Comet.
    #[derive(Debug)]
    struct AssetInfo {
        uint8 offset;
        address asset;
        address priceFeed;
        uint64 scale;
        uint64 borrowCollateralFactor;
        uint64 liquidateCollateralFactor;
        uint64 liquidationFactor;
        uint128 supplyCap;
    }

    /// Comet market (subset used by the bot).
    #[sol(rpc)]
    interface IComet {
        event Withdraw(address indexed src, address indexed to, uint256 amount);

        function numAssets() external view returns (uint8);
        function getAssetInfo(uint8 i) external view returns (AssetInfo memory);
    }

    /// One account as evaluated by the snapshot query.
    #[derive(Debug)]
    struct AccountSnapshot {
        address account;
        bool isLiquidatable;
        address[] collateralAssets;
        uint256[] collateralBalances;
        uint256[] collateralValues;
    }

    /// Collateral held in protocol reserves and its store-front quote.
    #[derive(Debug)]
    struct CollateralQuote {
        address asset;
        uint256 reserves;
        uint256 quotedPrice;
        uint256 marketPrice;
    }

    /// Read-only batched query evaluated in a single `eth_call`.
    #[sol(rpc)]
    interface ISnapshotQuery {
        function query(
            address comet,
            address liquidator,
            address[] calldata candidates
        ) external view returns (
            AccountSnapshot[] memory accounts,
            CollateralQuote[] memory quotes,
            uint256 purchaseBudget
        );
    }

    /// Liquidator executor. Absorbs the given accounts and buys the given
    /// collateral from protocol reserves in one transaction.
    #[sol(rpc)]
    interface IOnChainLiquidator {
        function absorbAndArbitrage(
            address comet,
            address[] calldata liquidatableAccounts,
            address[] calldata assets,
            uint256[] calldata maxAmountsToPurchase
        ) external;
    }
}

/// Calldata builder for the liquidator executor.
#[derive(Debug, Clone, Copy)]
pub struct LiquidatorContract {
    /// Executor contract address
    pub address: Address,
    /// Comet market the executor operates on
    pub comet: Address,
}

impl LiquidatorContract {
    pub fn new(address: Address, comet: Address) -> Self {
        Self { address, comet }
    }

    /// Encode `absorbAndArbitrage`. `assets` and `max_amounts` are parallel.
    pub fn encode_absorb_and_arbitrage(
        &self,
        accounts: Vec<Address>,
        assets: Vec<Address>,
        max_amounts: Vec<U256>,
    ) -> Bytes {
        debug_assert_eq!(assets.len(), max_amounts.len());
        IOnChainLiquidator::absorbAndArbitrageCall {
            comet: self.comet,
            liquidatableAccounts: accounts,
            assets,
            maxAmountsToPurchase: max_amounts,
        }
        .abi_encode()
        .into()
    }
}
