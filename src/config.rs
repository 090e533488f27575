//! Runtime configuration for the broadcaster and the vanity search.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::crypto::{parse_accounts, Account, Address, AddressError};
use crate::matcher::{Pattern, PatternError, PatternType};
use crate::rpc::{self, DEFAULT_RPC_URL};
use crate::tx::{BuildError, Destination, FeeKind, FeeMode, Payload, TransactionBuilder};

/// Batch EVM transaction broadcaster and vanity address generator
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Send one transaction per key, repeatedly, until stopped
    Mint(MintArgs),
    /// Search for addresses matching a pattern
    Vanity(VanityArgs),
}

/// Where the transactions go.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxMode {
    /// Every key sends to its own address
    #[value(name = "self")]
    SelfTransfer,
    /// Every key sends to `--to`
    ManyToOne,
}

/// What `--gas` overrides.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GasMode {
    /// Priority tip on top of the base fee
    #[default]
    Tip,
    /// Total gas price
    All,
}

impl From<GasMode> for FeeKind {
    fn from(mode: GasMode) -> Self {
        match mode {
            GasMode::Tip => FeeKind::Tip,
            GasMode::All => FeeKind::Flat,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct MintArgs {
    /// File with one private key per line (64 hex digits, 0x optional)
    #[arg(short = 'k', long)]
    pub keys_file: Option<PathBuf>,

    /// Private key; may be repeated
    #[arg(long = "key")]
    pub keys: Vec<String>,

    /// Destination mode (default: many-to-one when --to is given, otherwise self)
    #[arg(short = 'm', long, value_enum)]
    pub mode: Option<TxMode>,

    /// Destination address for many-to-one mode
    #[arg(long)]
    pub to: Option<String>,

    /// Calldata as UTF-8 text
    #[arg(short = 'd', long, conflicts_with = "hex")]
    pub data: Option<String>,

    /// Calldata as hex
    #[arg(long)]
    pub hex: Option<String>,

    /// Gas override in gwei (0 = let the node decide)
    #[arg(short = 'g', long)]
    pub gas: Option<String>,

    /// Whether --gas is the tip or the whole gas price
    #[arg(long, value_enum, default_value_t = GasMode::Tip)]
    pub gas_mode: GasMode,

    /// Delay between cycles in milliseconds
    #[arg(short = 'i', long, default_value = "0")]
    pub interval: u64,

    /// JSON-RPC endpoint (http, https, ws or wss)
    #[arg(long, env = "INSCRIBE_RPC_URL", default_value = DEFAULT_RPC_URL)]
    pub rpc: String,

    /// Chain id (fetched from the node when absent)
    #[arg(long)]
    pub chain_id: Option<u64>,

    /// Stop after N cycles (default: run until Ctrl+C)
    #[arg(short = 'c', long)]
    pub cycles: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct VanityArgs {
    /// Pattern to search for (empty matches any address)
    #[arg(short, long, default_value = "")]
    pub pattern: String,

    /// Pattern type: regex, prefix, suffix, or contains
    #[arg(short = 't', long, default_value = "regex")]
    pub pattern_type: PatternType,

    /// Number of worker threads
    #[arg(short = 'w', long, default_value = "1")]
    pub threads: usize,

    /// Stop after finding N addresses
    #[arg(short = 'n', long, default_value = "1")]
    pub count: usize,

    /// Progress report interval in seconds
    #[arg(short = 'r', long, default_value = "5")]
    pub report_interval: u64,
}

/// Validated inputs for a broadcast run.
#[derive(Debug, Clone)]
pub struct MintPlan {
    pub accounts: Vec<Account>,
    /// Key lines dropped as malformed
    pub rejected_keys: usize,
    pub builder: TransactionBuilder,
    pub interval: Duration,
    pub rpc_url: String,
    pub chain_id: Option<u64>,
    pub cycles: Option<u64>,
}

/// Validated inputs for a vanity search.
#[derive(Debug, Clone)]
pub struct VanitySearch {
    pub pattern: Pattern,
    pub threads: usize,
    pub target: usize,
    pub report_interval: Duration,
}

#[derive(Debug, Clone)]
pub enum Plan {
    Mint(MintPlan),
    Vanity(VanitySearch),
}

impl Config {
    /// Validates the configuration
    pub fn validate(&self) -> Result<Plan, ConfigError> {
        match &self.command {
            Command::Mint(args) => args.validate().map(Plan::Mint),
            Command::Vanity(args) => args.validate().map(Plan::Vanity),
        }
    }
}

impl MintArgs {
    /// Returns the effective destination mode
    pub fn tx_mode(&self) -> TxMode {
        self.mode.unwrap_or(if self.to.is_some() {
            TxMode::ManyToOne
        } else {
            TxMode::SelfTransfer
        })
    }

    pub fn validate(&self) -> Result<MintPlan, ConfigError> {
        let destination = match self.tx_mode() {
            TxMode::SelfTransfer => {
                if self.to.is_some() {
                    log::warn!("--to is ignored in self mode");
                }
                Destination::SelfTransfer
            }
            TxMode::ManyToOne => {
                let to = self.to.as_deref().ok_or(ConfigError::MissingDestination)?;
                Destination::Fixed(to.trim().parse()?)
            }
        };

        let payload = match (&self.data, &self.hex) {
            (_, Some(hex)) => Payload::Hex(hex.clone()),
            (Some(text), None) => Payload::Text(text.trim().to_string()),
            (None, None) => Payload::Text(String::new()),
        };

        let fee = match self.gas.as_deref() {
            Some(amount) => FeeMode::from_gwei(self.gas_mode.into(), amount)?,
            None => FeeMode::None,
        };

        let builder = TransactionBuilder::new(destination, &payload, fee)?;

        if !rpc::is_supported_url(&self.rpc) {
            return Err(ConfigError::UnsupportedRpc(self.rpc.clone()));
        }

        let mut lines: Vec<String> = Vec::new();
        if let Some(path) = &self.keys_file {
            let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
            lines.extend(contents.lines().map(str::to_owned));
        }
        lines.extend(self.keys.iter().cloned());

        let (accounts, rejected_keys) = parse_accounts(lines.iter().map(String::as_str));

        Ok(MintPlan {
            accounts,
            rejected_keys,
            builder,
            interval: Duration::from_millis(self.interval),
            rpc_url: self.rpc.clone(),
            chain_id: self.chain_id,
            cycles: self.cycles,
        })
    }
}

impl VanityArgs {
    pub fn validate(&self) -> Result<VanitySearch, ConfigError> {
        if self.threads == 0 {
            return Err(ConfigError::InvalidThreads);
        }
        if self.count == 0 {
            return Err(ConfigError::InvalidCount);
        }

        let cores = num_cpus::get();
        if self.threads > cores {
            log::warn!(
                "{} threads requested but only {} CPU cores available",
                self.threads,
                cores
            );
        }

        Ok(VanitySearch {
            pattern: Pattern::compile(&self.pattern, self.pattern_type)?,
            threads: self.threads,
            target: self.count,
            report_interval: Duration::from_secs(self.report_interval.max(1)),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("many-to-one mode needs a destination address (--to)")]
    MissingDestination,

    #[error("invalid destination: {0}")]
    InvalidAddress(#[from] AddressError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] PatternError),

    #[error("thread count must be a positive integer")]
    InvalidThreads,

    #[error("wallet count must be a positive integer")]
    InvalidCount,

    #[error("unsupported RPC URL {0:?} (expected http, https, ws or wss)")]
    UnsupportedRpc(String),

    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_1: &str = "0x0000000000000000000000000000000000000000000000000000000000000001";
    const KEY_2: &str = "0000000000000000000000000000000000000000000000000000000000000002";

    fn parse(args: &[&str]) -> Config {
        Config::try_parse_from(std::iter::once("inscribe").chain(args.iter().copied())).unwrap()
    }

    fn mint_plan(args: &[&str]) -> Result<MintPlan, ConfigError> {
        match parse(args).validate()? {
            Plan::Mint(plan) => Ok(plan),
            Plan::Vanity(_) => panic!("expected mint plan"),
        }
    }

    fn vanity_search(args: &[&str]) -> Result<VanitySearch, ConfigError> {
        match parse(args).validate()? {
            Plan::Vanity(search) => Ok(search),
            Plan::Mint(_) => panic!("expected vanity search"),
        }
    }

    #[test]
    fn test_mint_defaults() {
        let plan = mint_plan(&["mint", "--key", KEY_1, "--key", "junk", "--key", KEY_2]).unwrap();

        assert_eq!(plan.accounts.len(), 2);
        assert_eq!(plan.rejected_keys, 1);
        assert_eq!(plan.builder.destination(), Destination::SelfTransfer);
        assert_eq!(plan.builder.fee(), FeeMode::None);
        assert!(plan.builder.data().is_empty());
        assert_eq!(plan.interval, Duration::ZERO);
        assert_eq!(plan.chain_id, None);
        assert_eq!(plan.cycles, None);
    }

    #[test]
    fn test_to_selects_many_to_one() {
        let to = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed";
        let plan = mint_plan(&["mint", "--key", KEY_1, "--to", to]).unwrap();
        assert_eq!(
            plan.builder.destination(),
            Destination::Fixed(to.parse().unwrap())
        );
    }

    #[test]
    fn test_many_to_one_needs_valid_destination() {
        assert!(matches!(
            mint_plan(&["mint", "--mode", "many-to-one"]),
            Err(ConfigError::MissingDestination)
        ));
        assert!(matches!(
            mint_plan(&["mint", "--to", "0x1234"]),
            Err(ConfigError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_payload_and_fee() {
        let plan = mint_plan(&["mint", "--hex", "0x6869", "--gas", "1.5", "--interval", "250"]).unwrap();
        assert_eq!(plan.builder.data(), b"hi");
        assert_eq!(plan.builder.fee(), FeeMode::PriorityTip(1_500_000_000));
        assert_eq!(plan.interval, Duration::from_millis(250));

        let plan = mint_plan(&["mint", "--data", "hi", "--gas", "3", "--gas-mode", "all"]).unwrap();
        assert_eq!(plan.builder.data(), b"hi");
        assert_eq!(plan.builder.fee(), FeeMode::FlatPrice(3_000_000_000));

        assert!(matches!(
            mint_plan(&["mint", "--hex", "0xzz"]),
            Err(ConfigError::Build(BuildError::InvalidHex(_)))
        ));
    }

    #[test]
    fn test_text_payload_is_trimmed() {
        let plan = mint_plan(&["mint", "--data", "  data:,hi \n"]).unwrap();
        assert_eq!(plan.builder.data(), b"data:,hi");
    }

    #[test]
    fn test_garbage_gas_is_rejected() {
        assert!(matches!(
            mint_plan(&["mint", "--gas=-abc"]),
            Err(ConfigError::Build(BuildError::InvalidAmount(_)))
        ));
        let plan = mint_plan(&["mint", "--gas=-2.5"]).unwrap();
        assert_eq!(plan.builder.fee(), FeeMode::None);
    }

    #[test]
    fn test_data_and_hex_conflict() {
        let result = Config::try_parse_from(["inscribe", "mint", "--data", "a", "--hex", "00"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_rpc_scheme() {
        assert!(mint_plan(&["mint", "--rpc", "wss://node.example"]).is_ok());
        assert!(matches!(
            mint_plan(&["mint", "--rpc", "ftp://node.example"]),
            Err(ConfigError::UnsupportedRpc(_))
        ));
    }

    #[test]
    fn test_missing_keys_file() {
        assert!(matches!(
            mint_plan(&["mint", "--keys-file", "/nonexistent/keys.txt"]),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_vanity_defaults() {
        let search = vanity_search(&["vanity"]).unwrap();
        assert!(search.pattern.is_any());
        assert_eq!(search.threads, 1);
        assert_eq!(search.target, 1);
        assert_eq!(search.report_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_vanity_validation() {
        let search = vanity_search(&["vanity", "-p", "dead", "-t", "prefix", "-w", "2", "-n", "3"]).unwrap();
        assert_eq!(search.pattern.pattern_type(), PatternType::Prefix);
        assert_eq!(search.threads, 2);
        assert_eq!(search.target, 3);

        assert!(matches!(
            vanity_search(&["vanity", "-w", "0"]),
            Err(ConfigError::InvalidThreads)
        ));
        assert!(matches!(
            vanity_search(&["vanity", "-n", "0"]),
            Err(ConfigError::InvalidCount)
        ));
        assert!(matches!(
            vanity_search(&["vanity", "-p", "0x(("]),
            Err(ConfigError::InvalidPattern(_))
        ));
    }
}
