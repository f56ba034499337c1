//! Chain-tagged domain types shared by adapters and the pipeline.

use alloy::primitives::{Address, U256};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::chain::solana::{Blockhash, Pubkey};
use crate::chain::units;
use crate::error::{ChainResult, ErrorKind};

/// Supported chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    /// Account/nonce based chain; amounts in wei.
    Ethereum,
    /// Blockhash based chain; amounts in lamports.
    Solana,
}

impl Chain {
    pub const ALL: [Chain; 2] = [Chain::Ethereum, Chain::Solana];

    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Ethereum => "ethereum",
            Chain::Solana => "solana",
        }
    }

    /// Symbol of the chain's native coin.
    pub fn native_symbol(&self) -> &'static str {
        match self {
            Chain::Ethereum => "ETH",
            Chain::Solana => "SOL",
        }
    }

    /// Fractional digits of the native unit.
    pub fn decimals(&self) -> u32 {
        match self {
            Chain::Ethereum => units::WEI_DECIMALS,
            Chain::Solana => units::LAMPORT_DECIMALS,
        }
    }

    /// Chain whose native coin is `token`.
    pub fn for_token(token: &str) -> ChainResult<Chain> {
        Chain::ALL
            .into_iter()
            .find(|c| c.native_symbol().eq_ignore_ascii_case(token))
            .ok_or_else(|| ErrorKind::UnsupportedChain(format!("no chain for token {}", token)))
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Chain {
    type Err = ErrorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ethereum" => Ok(Chain::Ethereum),
            "solana" => Ok(Chain::Solana),
            other => Err(ErrorKind::UnsupportedChain(other.to_string())),
        }
    }
}

/// A parsed address, tagged by the chain whose format it follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainAddress {
    Ethereum(Address),
    Solana(Pubkey),
}

impl ChainAddress {
    /// Parse `value` using `chain`'s address format.
    ///
    /// Ethereum addresses in mixed case must carry a valid EIP-55 checksum.
    pub fn parse(chain: Chain, value: &str) -> ChainResult<Self> {
        let value = value.trim();
        match chain {
            Chain::Ethereum => {
                let hex_part = value.strip_prefix("0x").unwrap_or(value);
                let mixed_case = hex_part.chars().any(|c| c.is_ascii_uppercase())
                    && hex_part.chars().any(|c| c.is_ascii_lowercase());
                let parsed = if mixed_case {
                    Address::parse_checksummed(format!("0x{}", hex_part), None)
                        .map_err(|e| e.to_string())
                } else {
                    Address::from_str(value).map_err(|e| e.to_string())
                };
                parsed
                    .map(ChainAddress::Ethereum)
                    .map_err(|reason| ErrorKind::AddressParse {
                        address: value.to_string(),
                        reason,
                    })
            }
            Chain::Solana => value.parse().map(ChainAddress::Solana),
        }
    }

    pub fn chain(&self) -> Chain {
        match self {
            ChainAddress::Ethereum(_) => Chain::Ethereum,
            ChainAddress::Solana(_) => Chain::Solana,
        }
    }
}

impl fmt::Display for ChainAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainAddress::Ethereum(addr) => write!(f, "{}", addr.to_checksum(None)),
            ChainAddress::Solana(key) => write!(f, "{}", key),
        }
    }
}

impl Serialize for ChainAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Amount in the chain's smallest unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeAmount {
    Wei(U256),
    Lamports(u64),
}

impl NativeAmount {
    /// Convert a whole-coin amount for `chain`.
    pub fn from_human(chain: Chain, amount: Decimal) -> ChainResult<Self> {
        match chain {
            Chain::Ethereum => units::ether_to_wei(amount).map(NativeAmount::Wei),
            Chain::Solana => units::sol_to_lamports(amount).map(NativeAmount::Lamports),
        }
    }

    pub fn chain(&self) -> Chain {
        match self {
            NativeAmount::Wei(_) => Chain::Ethereum,
            NativeAmount::Lamports(_) => Chain::Solana,
        }
    }
}

impl fmt::Display for NativeAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeAmount::Wei(v) => write!(f, "{}", v),
            NativeAmount::Lamports(v) => write!(f, "{}", v),
        }
    }
}

impl Serialize for NativeAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Chain-specific transaction parameters; exactly one variant per chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "chain", rename_all = "lowercase")]
pub enum ChainParams {
    Ethereum {
        gas_price: u128,
        gas_limit: u64,
        nonce: u64,
    },
    Solana {
        recent_blockhash: Blockhash,
        lamports: u64,
    },
}

impl ChainParams {
    pub fn chain(&self) -> Chain {
        match self {
            ChainParams::Ethereum { .. } => Chain::Ethereum,
            ChainParams::Solana { .. } => Chain::Solana,
        }
    }
}

/// Freshness token returned by `ChainAdapter::freshness`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreshnessToken {
    /// Pending nonce of the queried account.
    Nonce(u64),
    /// Latest confirmed blockhash.
    Blockhash(Blockhash),
}

/// Fee parameters returned by `ChainAdapter::estimate_fee`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeEstimate {
    /// Legacy gas price in wei.
    GasPrice(u128),
    /// Network-wide fixed fee, paid implicitly by the fee payer.
    PerSignature { lamports: u64 },
}

/// A fully parameterised, not yet signed transfer.
///
/// Construction goes through [`TransactionIntent::new`], which refuses any mix
/// of chains between addresses, amount and parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionIntent {
    chain: Chain,
    from_address: ChainAddress,
    to_address: ChainAddress,
    amount: Decimal,
    native_amount: NativeAmount,
    params: ChainParams,
}

impl TransactionIntent {
    pub fn new(
        from_address: ChainAddress,
        to_address: ChainAddress,
        amount: Decimal,
        native_amount: NativeAmount,
        params: ChainParams,
    ) -> ChainResult<Self> {
        let chain = params.chain();
        for (what, other) in [
            ("source address", from_address.chain()),
            ("destination address", to_address.chain()),
            ("amount", native_amount.chain()),
        ] {
            if other != chain {
                return Err(ErrorKind::UnsupportedChain(format!(
                    "{} {} does not match {} parameters",
                    other, what, chain
                )));
            }
        }
        if let (ChainParams::Solana { lamports, .. }, NativeAmount::Lamports(native)) =
            (&params, &native_amount)
        {
            if lamports != native {
                return Err(ErrorKind::InvalidAmount(format!(
                    "lamports {} disagree with native amount {}",
                    lamports, native
                )));
            }
        }

        Ok(Self {
            chain,
            from_address,
            to_address,
            amount,
            native_amount,
            params,
        })
    }

    pub fn chain(&self) -> Chain {
        self.chain
    }

    pub fn from_address(&self) -> &ChainAddress {
        &self.from_address
    }

    pub fn to_address(&self) -> &ChainAddress {
        &self.to_address
    }

    /// Amount in whole coins.
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn native_amount(&self) -> NativeAmount {
        self.native_amount
    }

    pub fn params(&self) -> &ChainParams {
        &self.params
    }
}

/// A signed transaction in its canonical submission encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedTransaction {
    pub chain: Chain,
    /// 0x-hex (Ethereum) or base58 (Solana) serialized bytes.
    pub encoded: String,
    /// Identifier the network will assign: keccak hash or first signature.
    pub tx_hash: String,
}

/// Native balance of an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Balance {
    pub address: String,
    /// Whole-coin amount.
    pub amount: Decimal,
    pub symbol: String,
    /// Amount in wei or lamports.
    pub native: String,
}

/// Execution outcome of an on-chain transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum TxOutcome {
    /// Visible to the node but not yet in a block.
    Pending,
    Succeeded,
    Failed(String),
}

impl TxOutcome {
    pub fn is_final(&self) -> bool {
        !matches!(self, TxOutcome::Pending)
    }
}

/// Ethereum transaction as reported by `eth_getTransactionByHash` (+ receipt).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EthereumTransaction {
    pub hash: String,
    pub from: String,
    pub to: Option<String>,
    pub value: U256,
    pub gas_limit: u64,
    pub gas_price: Option<u128>,
    pub nonce: u64,
    pub block_number: Option<u64>,
    /// Receipt status; `None` until the transaction is mined.
    pub succeeded: Option<bool>,
}

/// Solana transaction as reported by `getTransaction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SolanaTransaction {
    pub signature: String,
    pub slot: u64,
    pub block_time: Option<i64>,
    pub fee: u64,
    pub account_keys: Vec<String>,
    pub pre_balances: Vec<u64>,
    pub post_balances: Vec<u64>,
    /// Execution error reported in the transaction meta, if any.
    pub error: Option<String>,
}

/// A transaction looked up on chain; one strongly typed variant per chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "chain", rename_all = "lowercase")]
pub enum TransactionRecord {
    Ethereum(EthereumTransaction),
    Solana(SolanaTransaction),
}

impl TransactionRecord {
    pub fn chain(&self) -> Chain {
        match self {
            TransactionRecord::Ethereum(_) => Chain::Ethereum,
            TransactionRecord::Solana(_) => Chain::Solana,
        }
    }

    pub fn tx_id(&self) -> &str {
        match self {
            TransactionRecord::Ethereum(tx) => &tx.hash,
            TransactionRecord::Solana(tx) => &tx.signature,
        }
    }

    pub fn outcome(&self) -> TxOutcome {
        match self {
            TransactionRecord::Ethereum(tx) => match (tx.block_number, tx.succeeded) {
                (Some(_), Some(true)) => TxOutcome::Succeeded,
                (Some(_), Some(false)) => TxOutcome::Failed("execution reverted".to_string()),
                _ => TxOutcome::Pending,
            },
            TransactionRecord::Solana(tx) => match &tx.error {
                Some(err) => TxOutcome::Failed(err.clone()),
                None => TxOutcome::Succeeded,
            },
        }
    }

    /// Amount this transaction credited to `address`, in whole coins.
    ///
    /// Ethereum: the value, when `address` is the recipient. Solana: the
    /// balance increase of `address`'s account. Zero when `address` was not
    /// paid.
    pub fn received_by(&self, address: &ChainAddress) -> ChainResult<Decimal> {
        let chain = self.chain();
        let is_target = |candidate: &str| {
            ChainAddress::parse(chain, candidate)
                .map(|parsed| parsed == *address)
                .unwrap_or(false)
        };

        match self {
            TransactionRecord::Ethereum(tx) => {
                if tx.to.as_deref().is_some_and(is_target) {
                    units::wei_to_ether(tx.value)
                } else {
                    Ok(Decimal::ZERO)
                }
            }
            TransactionRecord::Solana(tx) => {
                let Some(index) = tx.account_keys.iter().position(|key| is_target(key)) else {
                    return Ok(Decimal::ZERO);
                };
                match (tx.pre_balances.get(index), tx.post_balances.get(index)) {
                    (Some(pre), Some(post)) => Ok(units::lamports_to_sol(post.saturating_sub(*pre))),
                    _ => Err(ErrorKind::MalformedResponse(format!(
                        "transaction {} has no balance for account {}",
                        tx.signature, index
                    ))),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_parsing_and_tokens() {
        assert_eq!("ethereum".parse::<Chain>().unwrap(), Chain::Ethereum);
        assert_eq!("Solana".parse::<Chain>().unwrap(), Chain::Solana);
        assert!(matches!(
            "bitcoin".parse::<Chain>(),
            Err(ErrorKind::UnsupportedChain(_))
        ));
        assert_eq!(Chain::for_token("ETH").unwrap(), Chain::Ethereum);
        assert_eq!(Chain::for_token("sol").unwrap(), Chain::Solana);
        assert!(Chain::for_token("USDC").is_err());
    }

    #[test]
    fn test_ethereum_address_parsing() {
        let addr = ChainAddress::parse(
            Chain::Ethereum,
            "0x3f1Eae7D46d88F08fc2F8ed27FCb2AB183EB2d0E",
        )
        .unwrap();
        assert_eq!(addr.to_string(), "0x3f1Eae7D46d88F08fc2F8ed27FCb2AB183EB2d0E");

        // Lowercase is accepted without checksum.
        assert!(ChainAddress::parse(
            Chain::Ethereum,
            "0x3f1eae7d46d88f08fc2f8ed27fcb2ab183eb2d0e"
        )
        .is_ok());

        // Broken checksum.
        assert!(matches!(
            ChainAddress::parse(Chain::Ethereum, "0x3F1eae7D46d88F08fc2F8ed27FCb2AB183EB2d0E"),
            Err(ErrorKind::AddressParse { .. })
        ));

        // Too short.
        assert!(ChainAddress::parse(Chain::Ethereum, "0x1234").is_err());
    }

    #[test]
    fn test_address_formats_are_not_interchangeable() {
        let sol = "9HM9gySNkt5z2te9wgJ4s777jciQb451Pp4nbQ1Gnf45";
        assert!(ChainAddress::parse(Chain::Solana, sol).is_ok());
        assert!(ChainAddress::parse(Chain::Ethereum, sol).is_err());
        assert!(ChainAddress::parse(
            Chain::Solana,
            "0x3f1eae7d46d88f08fc2f8ed27fcb2ab183eb2d0e"
        )
        .is_err());
    }

    #[test]
    fn test_intent_rejects_mismatched_params() {
        let from = ChainAddress::parse(Chain::Ethereum, "0x3f1eae7d46d88f08fc2f8ed27fcb2ab183eb2d0e")
            .unwrap();
        let to = ChainAddress::Ethereum(Address::ZERO);
        let params = ChainParams::Solana {
            recent_blockhash: Blockhash::new([1u8; 32]),
            lamports: 1,
        };
        let err = TransactionIntent::new(
            from,
            to,
            Decimal::ONE,
            NativeAmount::Lamports(1),
            params,
        )
        .unwrap_err();
        assert!(matches!(err, ErrorKind::UnsupportedChain(_)));
    }

    fn sol(address: &str) -> ChainAddress {
        ChainAddress::parse(Chain::Solana, address).unwrap()
    }

    #[test]
    fn test_solana_credit_is_the_recipients_increase() {
        let payer = "DvWFKfpfYkBupFCG1eKLkfhmij4UgdcsRHPvLTVy9Krr";
        let pool = "9HM9gySNkt5z2te9wgJ4s777jciQb451Pp4nbQ1Gnf45";
        let other = "US517G5965aydkZ46HS38QLi7UQiSojurfbQfKCELFx";
        // One lamport to the pool, 100 SOL to a second account in the same transaction.
        let record = TransactionRecord::Solana(SolanaTransaction {
            signature: "sig".into(),
            slot: 10,
            block_time: None,
            fee: 5_000,
            account_keys: vec![payer.into(), pool.into(), other.into()],
            pre_balances: vec![200_000_005_001, 0, 0],
            post_balances: vec![100_000_000_000, 1, 100_000_000_000],
            error: None,
        });

        assert_eq!(
            record.received_by(&sol(pool)).unwrap(),
            Decimal::from_str("0.000000001").unwrap()
        );
        assert_eq!(record.received_by(&sol(other)).unwrap(), Decimal::from(100));
        // The payer's balance dropped, so it was credited nothing.
        assert_eq!(record.received_by(&sol(payer)).unwrap(), Decimal::ZERO);
        assert_eq!(record.outcome(), TxOutcome::Succeeded);
    }

    #[test]
    fn test_solana_credit_for_absent_account_is_zero() {
        let record = TransactionRecord::Solana(SolanaTransaction {
            signature: "sig".into(),
            slot: 10,
            block_time: None,
            fee: 5_000,
            account_keys: vec!["DvWFKfpfYkBupFCG1eKLkfhmij4UgdcsRHPvLTVy9Krr".into()],
            pre_balances: vec![10],
            post_balances: vec![5],
            error: None,
        });
        assert_eq!(
            record
                .received_by(&sol("9HM9gySNkt5z2te9wgJ4s777jciQb451Pp4nbQ1Gnf45"))
                .unwrap(),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_solana_credit_requires_balances() {
        let pool = "9HM9gySNkt5z2te9wgJ4s777jciQb451Pp4nbQ1Gnf45";
        let record = TransactionRecord::Solana(SolanaTransaction {
            signature: "sig".into(),
            slot: 10,
            block_time: None,
            fee: 5_000,
            account_keys: vec!["DvWFKfpfYkBupFCG1eKLkfhmij4UgdcsRHPvLTVy9Krr".into(), pool.into()],
            pre_balances: vec![10],
            post_balances: vec![5],
            error: None,
        });
        assert!(matches!(
            record.received_by(&sol(pool)),
            Err(ErrorKind::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_ethereum_outcome_requires_receipt() {
        let mut tx = EthereumTransaction {
            hash: "0xabc".into(),
            from: "0x0".into(),
            to: None,
            value: U256::from(10u64).pow(U256::from(18u64)),
            gas_limit: 21_000,
            gas_price: Some(1),
            nonce: 0,
            block_number: None,
            succeeded: None,
        };
        assert_eq!(
            TransactionRecord::Ethereum(tx.clone()).outcome(),
            TxOutcome::Pending
        );
        tx.block_number = Some(5);
        tx.succeeded = Some(false);
        tx.to = Some("0x3f1eae7d46d88f08fc2f8ed27fcb2ab183eb2d0e".into());
        let record = TransactionRecord::Ethereum(tx);
        assert!(matches!(record.outcome(), TxOutcome::Failed(_)));

        let recipient =
            ChainAddress::parse(Chain::Ethereum, "0x3f1Eae7D46d88F08fc2F8ed27FCb2AB183EB2d0E").unwrap();
        assert_eq!(record.received_by(&recipient).unwrap(), Decimal::ONE);
        assert_eq!(
            record
                .received_by(&ChainAddress::Ethereum(Address::ZERO))
                .unwrap(),
            Decimal::ZERO
        );
    }
}
