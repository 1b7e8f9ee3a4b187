//! Custody operator CLI
//!
//! One operation per invocation; configuration comes from the environment
//! (see `CustodyConfig::from_env`), optionally via a `.env` file.

use clap::{Parser, Subcommand};
use ledger_custody::chain::TransactionDetail;
use ledger_custody::common::init_from_config;
use ledger_custody::types::wei_to_display;
use ledger_custody::{Amount, CustodyConfig, CustodyService};

#[derive(Parser)]
#[command(name = "custody")]
#[command(about = "Custodial address pool, ledger reconciliation and treasury sweeps")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assign a pool address to a new user
    Register,

    /// Reconcile and show the caller's balance
    Balance {
        /// Recovery phrase of the account
        #[arg(short, long, env = "CUSTODY_MNEMONIC")]
        mnemonic: String,
    },

    /// Deposit into the caller's address from a node-held account
    Recharge {
        #[arg(short, long, env = "CUSTODY_MNEMONIC")]
        mnemonic: String,

        /// Funding address (must be unlockable by the node)
        #[arg(short, long)]
        from: String,

        /// Amount in wei
        #[arg(short, long)]
        value: String,
    },

    /// Pay out from the treasury against the caller's balance
    Withdraw {
        #[arg(short, long, env = "CUSTODY_MNEMONIC")]
        mnemonic: String,

        /// Destination address
        #[arg(short, long)]
        to: String,

        /// Amount in wei
        #[arg(short, long)]
        value: String,
    },

    /// Reconcile one address
    Reconcile {
        #[arg(short, long)]
        address: String,
    },

    /// Reconcile every assigned address
    ReconcileAll,

    /// Sweep user addresses into the treasury
    Centralize {
        /// Admin password
        #[arg(short, long, env = "CUSTODY_ADMIN_PASSWORD")]
        password: String,
    },

    /// Read chain state without touching any ledger
    Inspect {
        #[command(subcommand)]
        target: InspectCommand,
    },

    /// Print the effective configuration
    Config,
}

#[derive(Subcommand)]
enum InspectCommand {
    /// Balance held at an address
    Balance { address: String },

    /// Every transaction in a block
    Block { number: u64 },

    /// One transaction by hash
    Tx { hash: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let config = CustodyConfig::from_env()?;
    init_from_config(&config)?;

    if config.network == ledger_custody::Network::Mainnet {
        config.validate_for_production()?;
    }

    let service = CustodyService::from_config(&config);

    match cli.command {
        Commands::Register => {
            let allocation = service.register().await?;
            println!("address:  {}", allocation.address);
            println!("mnemonic: {}", allocation.mnemonic);
        }
        Commands::Balance { mnemonic } => {
            let session = service.login(&mnemonic).await?;
            let balance = service.check_balance(&session).await?;
            println!("{}: {}", session.address(), wei_to_display(&balance));
        }
        Commands::Recharge {
            mnemonic,
            from,
            value,
        } => {
            let value = Amount::parse_non_negative(&value)?;
            let session = service.login(&mnemonic).await?;
            let source = service.signer_for(&from).await?;
            let hash = service.recharge(&session, source.as_ref(), &value).await?;
            println!("deposit submitted: {}", hash);
        }
        Commands::Withdraw {
            mnemonic,
            to,
            value,
        } => {
            let value = Amount::parse_non_negative(&value)?;
            let session = service.login(&mnemonic).await?;
            let hash = service.withdraw(&session, &to, &value).await?;
            println!("withdrawal submitted: {}", hash);
        }
        Commands::Reconcile { address } => {
            let outcome = service.reconcile(&address).await?;
            println!(
                "{}: addr_balance={} pending_balance={} (confirmed {}, pending {})",
                outcome.address,
                outcome.addr_balance,
                outcome.pending_balance,
                outcome.confirmed,
                outcome.still_pending
            );
        }
        Commands::ReconcileAll => {
            for outcome in service.reconcile_all().await? {
                println!("{} {}", outcome.address, outcome.addr_balance);
            }
        }
        Commands::Centralize { password } => {
            let admin = service.login_admin(&password)?;
            let report = service.centralize(&admin).await?;
            for entry in &report.entries {
                println!(
                    "{} -> {}: {} wei (recorded {}) {}",
                    entry.address, report.treasury, entry.swept, entry.recorded, entry.hash
                );
            }
            println!(
                "run {}: swept {} addresses, {}",
                report.run_id,
                report.entries.len(),
                wei_to_display(&report.total_swept())
            );
        }
        Commands::Inspect { target } => match target {
            InspectCommand::Balance { address } => {
                let balance = service.inspect_balance(&address).await?;
                println!("{}: {} wei ({})", address, balance, wei_to_display(&balance));
            }
            InspectCommand::Block { number } => {
                let block = service.inspect_block(number).await?;
                println!("block {} {}", block.number, block.hash);
                if block.transactions.is_empty() {
                    println!("no transactions");
                }
                for (idx, tx) in block.transactions.iter().enumerate() {
                    print!("[{}] ", idx);
                    print_transaction(tx);
                }
            }
            InspectCommand::Tx { hash } => {
                let tx = service.inspect_transaction(&hash).await?;
                print_transaction(&tx);
            }
        },
        Commands::Config => config.print_summary(),
    }

    Ok(())
}

fn print_transaction(tx: &TransactionDetail) {
    let lookup = &tx.lookup;
    println!(
        "{} {} -> {} value={} block={} status={}",
        lookup.hash,
        lookup.from,
        lookup.to.as_deref().unwrap_or("(contract creation)"),
        lookup.value,
        lookup
            .block_number
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".to_string()),
        tx.state()
    );
}
