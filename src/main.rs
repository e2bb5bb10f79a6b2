use token_harness::api;
use token_harness::config::{HarnessConfig, RuntimeConfig};
use token_harness::core::{Address, Amount, InterfaceId, TokenId};
use token_harness::metrics;
use token_harness::runtime::{
    resolve_account, AccountRefError, Call, CallOutput, CommitError, Deployment, FungibleCall,
    NonFungibleCall, Receipt, Runtime, RuntimeError,
};
use token_harness::storage::{RuntimeStorage, StorageError};
use clap::{Parser, Subcommand};
use parking_lot::RwLock;
use std::sync::Arc;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "token-harness")]
#[command(about = "Token contract harness - fungible and non-fungible ledgers", long_about = None)]
struct Cli {
    /// Config file (token-harness.toml is used when present)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Database path
    #[arg(long, global = true)]
    db: Option<String>,

    /// Per-call gas limit
    #[arg(long, global = true)]
    gas_limit: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API over the persisted runtime
    Serve {
        /// API server port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// List the development signer accounts
    Signers,

    /// Deploy a fungible token
    DeployToken {
        name: String,
        symbol: String,
        #[arg(long, default_value = "18")]
        decimals: String,
        /// Deployer (signer index or address)
        #[arg(short, long, default_value = "0")]
        from: String,
    },

    /// Deploy a non-fungible token
    DeployNft {
        name: String,
        symbol: String,
        #[arg(long, default_value = "")]
        base_uri: String,
        #[arg(short, long, default_value = "0")]
        from: String,
    },

    /// Mint fungible tokens
    Mint {
        contract: Address,
        to: String,
        amount: Amount,
        #[arg(short, long, default_value = "0")]
        from: String,
    },

    /// Mint a non-fungible token
    MintNft {
        contract: Address,
        to: String,
        token_id: TokenId,
        #[arg(short, long, default_value = "0")]
        from: String,
    },

    /// Transfer fungible tokens from the caller
    Transfer {
        contract: Address,
        to: String,
        amount: Amount,
        #[arg(short, long, default_value = "0")]
        from: String,
    },

    /// Set the caller's allowance for a spender
    Approve {
        contract: Address,
        spender: String,
        amount: Amount,
        #[arg(short, long, default_value = "0")]
        from: String,
    },

    /// Spend an allowance: move tokens from owner to receiver
    TransferFrom {
        contract: Address,
        owner: String,
        to: String,
        amount: Amount,
        /// Spender (signer index or address)
        #[arg(short, long, default_value = "0")]
        from: String,
    },

    /// Show a fungible balance
    Balance {
        contract: Address,
        account: String,
    },

    /// Show an allowance
    Allowance {
        contract: Address,
        owner: String,
        spender: String,
    },

    /// Query ERC165 interface support
    SupportsInterface {
        contract: Address,
        interface_id: InterfaceId,
    },

    /// Show runtime statistics
    Stats,

    /// Run the reference scenarios in a throwaway runtime
    Demo,
}

#[derive(Error, Debug)]
enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("{0}")]
    Runtime(#[from] RuntimeError),
    #[error("{0}")]
    Commit(#[from] CommitError<StorageError>),
    #[error("{0}")]
    Account(#[from] AccountRefError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Runtime backed by the on-disk database for one CLI invocation
struct Session {
    runtime: Runtime,
    storage: RuntimeStorage,
}

impl Session {
    fn open(config: &HarnessConfig) -> Result<Self, CliError> {
        let storage = RuntimeStorage::new(&config.node.db_path)?;
        let runtime = match storage.load_state()? {
            Some(state) => Runtime::with_state(config.runtime.clone(), state),
            None => Runtime::new(config.runtime.clone()),
        };
        Ok(Self { runtime, storage })
    }

    fn account(&self, raw: &str) -> Result<Address, CliError> {
        Ok(resolve_account(self.runtime.signers(), raw)?)
    }

    fn execute(&mut self, from: &str, contract: Address, call: Call) -> Result<Receipt, CliError> {
        let caller = self.account(from)?;
        let storage = &self.storage;
        let receipt = self.runtime.commit(
            |rt| rt.execute(caller, contract, call),
            |rt, receipt| {
                storage.save_state(rt.state())?;
                storage.save_receipt(receipt)
            },
        )?;
        Ok(receipt)
    }

    fn deploy(&mut self, from: &str, deployment: Deployment) -> Result<Address, CliError> {
        let deployer = self.account(from)?;
        let storage = &self.storage;
        let address = self.runtime.commit(
            |rt| rt.deploy(deployer, deployment),
            |rt, _| storage.save_state(rt.state()),
        )?;
        Ok(address)
    }

    fn query(&self, contract: Address, call: Call) -> Result<CallOutput, CliError> {
        Ok(self.runtime.query(contract, &call)?)
    }
}

fn print_receipt(receipt: &Receipt) {
    println!("✅ {} committed in block {}", receipt.call.method(), receipt.block_number);
    println!("   tx:  {}", receipt.tx_hash);
    println!("   gas: {}", receipt.gas_used);
    for event in &receipt.events {
        println!("   📜 {}", event);
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let port_override = match &cli.command {
        Commands::Serve { port } => *port,
        _ => None,
    };
    let config = HarnessConfig::load_with_overrides(cli.config, port_override, cli.db, cli.gas_limit)?;
    config.validate().map_err(CliError::InvalidConfig)?;

    match cli.command {
        Commands::Serve { .. } => {
            config.print_effective_config();
            let session = Session::open(&config)?;
            metrics::set_block_number(session.runtime.block_number());
            let runtime = Arc::new(RwLock::new(session.runtime));
            let storage = Arc::new(session.storage);

            if config.metrics.enabled {
                let port = config.metrics.port;
                tokio::spawn(async move {
                    if let Err(e) = metrics::start_metrics_server(port).await {
                        tracing::error!("Metrics server failed: {}", e);
                    }
                });
            }

            api::start_server(runtime, Some(storage), config.node.api_port).await?;
        }

        Commands::Signers => {
            let runtime = Runtime::new(config.runtime.clone());
            for (index, signer) in runtime.signers().iter().enumerate() {
                println!("[{:>2}] {}", index, signer);
            }
        }

        Commands::DeployToken { name, symbol, decimals, from } => {
            let mut session = Session::open(&config)?;
            let address = session.deploy(&from, Deployment::Fungible { name, symbol, decimals })?;
            println!("✅ Token deployed at {}", address);
        }

        Commands::DeployNft { name, symbol, base_uri, from } => {
            let mut session = Session::open(&config)?;
            let address = session.deploy(&from, Deployment::NonFungible { name, symbol, base_uri })?;
            println!("✅ NFT deployed at {}", address);
        }

        Commands::Mint { contract, to, amount, from } => {
            let mut session = Session::open(&config)?;
            let to = session.account(&to)?;
            let receipt = session.execute(&from, contract, FungibleCall::Mint { to, amount }.into())?;
            print_receipt(&receipt);
        }

        Commands::MintNft { contract, to, token_id, from } => {
            let mut session = Session::open(&config)?;
            let to = session.account(&to)?;
            let receipt = session.execute(&from, contract, NonFungibleCall::Mint { to, token_id }.into())?;
            print_receipt(&receipt);
        }

        Commands::Transfer { contract, to, amount, from } => {
            let mut session = Session::open(&config)?;
            let to = session.account(&to)?;
            let receipt = session.execute(&from, contract, FungibleCall::Transfer { to, amount }.into())?;
            print_receipt(&receipt);
        }

        Commands::Approve { contract, spender, amount, from } => {
            let mut session = Session::open(&config)?;
            let spender = session.account(&spender)?;
            let receipt =
                session.execute(&from, contract, FungibleCall::Approve { spender, amount }.into())?;
            print_receipt(&receipt);
        }

        Commands::TransferFrom { contract, owner, to, amount, from } => {
            let mut session = Session::open(&config)?;
            let owner = session.account(&owner)?;
            let to = session.account(&to)?;
            let receipt = session.execute(
                &from,
                contract,
                FungibleCall::TransferFrom { from: owner, to, amount }.into(),
            )?;
            print_receipt(&receipt);
        }

        Commands::Balance { contract, account } => {
            let session = Session::open(&config)?;
            let account = session.account(&account)?;
            let balance = session.query(contract, FungibleCall::BalanceOf { account }.into())?;
            println!("💰 {}: {}", account, balance);
        }

        Commands::Allowance { contract, owner, spender } => {
            let session = Session::open(&config)?;
            let owner = session.account(&owner)?;
            let spender = session.account(&spender)?;
            let allowance = session.query(contract, FungibleCall::Allowance { owner, spender }.into())?;
            println!("🔑 {} -> {}: {}", owner, spender, allowance);
        }

        Commands::SupportsInterface { contract, interface_id } => {
            let session = Session::open(&config)?;
            let supported =
                session.query(contract, NonFungibleCall::SupportsInterface { interface_id }.into())?;
            println!("{} supported: {}", interface_id, supported);
        }

        Commands::Stats => {
            let session = Session::open(&config)?;
            let stats = session.runtime.stats();
            println!("📊 Runtime Stats:");
            println!("Chain ID: {}", stats.chain_id);
            println!("Block: {}", stats.block_number);
            println!("Fungible contracts: {}", stats.fungible_contracts);
            println!("Non-fungible contracts: {}", stats.non_fungible_contracts);
            println!("Calls executed: {}", stats.calls_executed);
            println!("Calls reverted: {}", stats.calls_reverted);
            println!("Receipts stored: {}", session.storage.receipt_count());
            for (address, contract) in session.runtime.contracts() {
                println!("  {} {} ({}) at {}", contract.kind(), contract.name(), contract.symbol(), address);
            }
        }

        Commands::Demo => run_demo(&config)?,
    }

    Ok(())
}

/// Owner, recipient, spender and receiver
const DEMO_SIGNERS: usize = 4;

fn demo_runtime_config(config: &HarnessConfig) -> RuntimeConfig {
    RuntimeConfig {
        signer_count: config.runtime.signer_count.max(DEMO_SIGNERS),
        ..config.runtime.clone()
    }
}

fn run_demo(config: &HarnessConfig) -> Result<(), CliError> {
    println!("🎬 Running token scenarios...\n");
    let mut runtime = Runtime::new(demo_runtime_config(config));
    let signers = runtime.signers().to_vec();
    let (owner, other, spender, receiver) = (signers[0], signers[1], signers[2], signers[3]);

    let token = runtime.deploy(
        owner,
        Deployment::Fungible {
            name: "SimpleToken".to_string(),
            symbol: "STT".to_string(),
            decimals: "18".to_string(),
        },
    )?;
    runtime.execute(owner, token, FungibleCall::Mint { to: owner, amount: 10_000 }.into())?;
    println!("⛏️  Minted 10000 STT to {}", owner);

    runtime.execute(owner, token, FungibleCall::Transfer { to: other, amount: 5_000 }.into())?;
    let balance = |rt: &Runtime, account: Address| rt.query(token, &FungibleCall::BalanceOf { account }.into());
    println!("💸 Transferred 5000 to {}", other);
    println!("   owner: {}  other: {}", balance(&runtime, owner)?, balance(&runtime, other)?);

    runtime.execute(owner, token, FungibleCall::Approve { spender, amount: 3_000 }.into())?;
    runtime.execute(
        spender,
        token,
        FungibleCall::TransferFrom { from: owner, to: receiver, amount: 2_000 }.into(),
    )?;
    let allowance = runtime.query(token, &FungibleCall::Allowance { owner, spender }.into())?;
    println!("🔑 Spender moved 2000 to receiver");
    println!("   receiver: {}  remaining allowance: {}", balance(&runtime, receiver)?, allowance);

    let nft = runtime.deploy(
        owner,
        Deployment::NonFungible {
            name: "TEST".to_string(),
            symbol: "TT".to_string(),
            base_uri: "none".to_string(),
        },
    )?;
    for id in [InterfaceId::ERC165, InterfaceId::ERC721, InterfaceId::ERC721_METADATA, InterfaceId::INVALID] {
        let supported = runtime.query(nft, &NonFungibleCall::SupportsInterface { interface_id: id }.into())?;
        println!("🧩 supportsInterface({}) = {}", id, supported);
    }

    let stats = runtime.stats();
    println!("\n📊 {} calls committed over {} blocks", stats.calls_executed, stats.block_number);
    Ok(())
}
