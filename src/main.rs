use alloy_primitives::{Address, U256};
use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use orderbook_sync::balances::BalanceRefresher;
use orderbook_sync::config::Config;
use orderbook_sync::ledger::Ledger;
use orderbook_sync::logging::init_logging;
use orderbook_sync::render::{self, OrderRow};
use orderbook_sync::utils::{format_units, parse_units, to_hex};
use orderbook_sync::{
    resolve_address, save_to_file, AccountBalances, ContractAddresses, EventOutcome,
    ExecuteOutcome, OrderBookSync, OrderBookView, OrderId, OrderRequest, RpcLedger, Session,
    TokenContract, TokenInfo,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "orderbook-sync", about = "Order book client for an ERC20 token exchange")]
struct Cli {
    /// TOML configuration file (default: ./orderbook.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Index of the node account to act as
    #[arg(long, global = true, default_value_t = 0)]
    account: usize,

    /// Debug logging for this crate
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the node's accounts with their balances
    Accounts,
    /// Balances of the active account
    Balances,
    /// Print the open orders
    Book {
        /// Also write the rows to this JSON file
        #[arg(long)]
        out: Option<String>,
    },
    /// Follow the order book live until Ctrl-C
    Watch,
    /// Offer `amount` tokens for `ask` native currency
    Submit { amount: String, ask: String },
    /// Take an open order, paying its current ask
    Execute { id: String },
    /// Buy `amount` tokens at the token's rate
    Buy { amount: String },
    /// Send `amount` tokens to `to`
    Transfer { to: String, amount: String },
    /// Mint `amount` tokens to `to`
    Mint { to: String, amount: String },
}

struct Client {
    session: Session,
    sync: OrderBookSync<RpcLedger>,
    balances: Arc<AccountBalances<RpcLedger>>,
    token: TokenInfo,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load(cli.config.as_deref())?;
    let client = connect(&config, cli.account).await?;

    match &cli.command {
        Command::Accounts => accounts(&client, cli.json).await,
        Command::Balances => balances(&client, cli.json).await,
        Command::Book { out } => book(&client, out.as_deref(), cli.json).await,
        Command::Watch => watch(&client).await,
        Command::Submit { amount, ask } => submit(&client, amount, ask, cli.json).await,
        Command::Execute { id } => execute(&client, id, cli.json).await,
        Command::Buy { amount } => buy(&client, amount, cli.json).await,
        Command::Transfer { to, amount } => transfer(&client, to, amount, cli.json).await,
        Command::Mint { to, amount } => mint(&client, to, amount, cli.json).await,
    }
}

async fn connect(config: &Config, account: usize) -> Result<Client> {
    let ledger = Arc::new(RpcLedger::new(&config.rpc_url, config.rpc_options())?);
    let network_id = ledger
        .network_id()
        .await
        .with_context(|| format!("Failed to reach ledger node at {}", config.rpc_url))?;
    info!(url = %config.rpc_url, network = %network_id, "connected");

    let addresses = ContractAddresses {
        token: resolve_address(config.token_address, &config.token_artifact, &network_id)?,
        exchange: resolve_address(config.exchange_address, &config.exchange_artifact, &network_id)?,
    };
    let options = config.sync_options();
    let token_contract = TokenContract::new(ledger.clone(), addresses.token, options.gas);
    let token = token_contract
        .info()
        .await
        .context("Failed to read token metadata")?;
    let balances = Arc::new(AccountBalances::new(ledger.clone(), token_contract));
    let session = Session::connect(ledger.as_ref(), account).await?;
    let sync = OrderBookSync::new(ledger.clone(), addresses, balances.clone(), options);

    Ok(Client {
        session,
        sync,
        balances,
        token,
    })
}

fn parse_address(raw: &str) -> Result<Address> {
    raw.parse()
        .map_err(|e| anyhow!("invalid address {:?}: {}", raw, e))
}

fn positive_amount(raw: &str, decimals: u8) -> Result<U256> {
    let amount = parse_units(raw, decimals)?;
    if amount.is_zero() {
        bail!("amount must be greater than zero");
    }
    Ok(amount)
}

fn print_tx(label: &str, tx_hash: alloy_primitives::B256, as_json: bool) {
    if as_json {
        println!("{}", json!({ "action": label, "tx": tx_hash.to_string() }));
    } else {
        println!("{}: {}", label, tx_hash);
    }
}

fn print_book(rows: &[OrderRow], as_json: bool) -> Result<()> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(rows)?);
    } else {
        println!("{}", render::table(rows));
    }
    Ok(())
}

async fn accounts(client: &Client, as_json: bool) -> Result<()> {
    let mut listed = Vec::new();
    for (index, account) in client.session.accounts().iter().enumerate() {
        let snapshot = client.balances.load(*account).await?;
        if as_json {
            listed.push(json!({
                "index": index,
                "active": index == client.session.active_index(),
                "address": to_hex(account.as_slice()),
                "native": snapshot.native.to_string(),
                "token": snapshot.token.to_string(),
            }));
        } else {
            let marker = if index == client.session.active_index() { "*" } else { " " };
            println!(
                "{} [{}] {}",
                marker,
                index,
                render::balances_line(&snapshot, &client.token)
            );
        }
    }
    if as_json {
        println!("{}", serde_json::to_string_pretty(&listed)?);
    }
    Ok(())
}

async fn balances(client: &Client, as_json: bool) -> Result<()> {
    let snapshot = client.balances.load(client.session.active()).await?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        println!("{}", render::balances_line(&snapshot, &client.token));
    }
    Ok(())
}

async fn book(client: &Client, out: Option<&str>, as_json: bool) -> Result<()> {
    let mut view = OrderBookView::new();
    let report = client.sync.bootstrap(&mut view).await?;
    if report.failed > 0 {
        eprintln!("{} of {} orders could not be checked", report.failed, report.scanned);
    }
    let rows = render::rows(&view.snapshot(), &client.token);
    print_book(&rows, as_json)?;
    if let Some(path) = out {
        save_to_file(&rows, path)?;
        eprintln!("Saved {} orders to {}", rows.len(), path);
    }
    Ok(())
}

async fn watch(client: &Client) -> Result<()> {
    // Subscribe before the historical scan so nothing falls in between.
    let mut subscription = client.sync.subscribe().await?;
    let mut view = OrderBookView::new();
    client.sync.bootstrap(&mut view).await?;
    print_book(&render::rows(&view.snapshot(), &client.token), false)?;

    let mut balances = client.balances.watch();
    client.balances.refresh(client.session.active()).await;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            event = subscription.next() => {
                let Some(event) = event else { break };
                let outcome = client.sync.handle_event(&client.session, &mut view, event).await;
                if matches!(outcome, EventOutcome::Inserted(_) | EventOutcome::Removed(_)) {
                    print_book(&render::rows(&view.snapshot(), &client.token), false)?;
                }
            }
        }
        if balances.has_changed().unwrap_or(false) {
            if let Some(snapshot) = balances.borrow_and_update().clone() {
                println!("{}", render::balances_line(&snapshot, &client.token));
            }
        }
    }

    subscription.stop().await;
    Ok(())
}

async fn submit(client: &Client, amount: &str, ask: &str, as_json: bool) -> Result<()> {
    let request = OrderRequest::for_native(
        client.token.address,
        positive_amount(amount, client.token.decimals)?,
        positive_amount(ask, orderbook_sync::models::NATIVE_DECIMALS)?,
    );
    let receipt = client.sync.submit_order(&client.session, request).await?;
    if as_json {
        println!(
            "{}",
            json!({
                "id": receipt.id.to_string(),
                "approve_tx": receipt.approve_tx.to_string(),
                "submit_tx": receipt.submit_tx.to_string(),
            })
        );
    } else {
        println!("Order submitted: {}", receipt.id);
    }
    Ok(())
}

async fn execute(client: &Client, id: &str, as_json: bool) -> Result<()> {
    let id: OrderId = id.parse()?;
    match client.sync.execute_order(&client.session, id).await? {
        ExecuteOutcome::Executed(receipt) => print_tx("executed", receipt.transaction_hash, as_json),
        ExecuteOutcome::Skipped { id } => {
            if as_json {
                println!("{}", json!({ "action": "skipped", "id": id.to_string() }));
            } else {
                println!("Order {} is no longer open", id);
            }
        }
    }
    Ok(())
}

async fn buy(client: &Client, amount: &str, as_json: bool) -> Result<()> {
    let tokens = positive_amount(amount, client.token.decimals)?;
    let rate = client.sync.token().rate().await?;
    if rate.is_zero() {
        bail!("token sale rate is zero");
    }
    let value = (tokens + rate - U256::from(1u64)) / rate;
    info!(
        tokens = %tokens,
        cost = %format_units(value, orderbook_sync::models::NATIVE_DECIMALS),
        "buying tokens"
    );
    let receipt = client
        .sync
        .token()
        .buy(client.session.active(), value)
        .await?;
    print_tx("buy", receipt.transaction_hash, as_json);
    Ok(())
}

async fn transfer(client: &Client, to: &str, amount: &str, as_json: bool) -> Result<()> {
    let to = parse_address(to)?;
    let amount = positive_amount(amount, client.token.decimals)?;
    let receipt = client
        .sync
        .token()
        .transfer(client.session.active(), to, amount)
        .await?;
    print_tx("transfer", receipt.transaction_hash, as_json);
    Ok(())
}

async fn mint(client: &Client, to: &str, amount: &str, as_json: bool) -> Result<()> {
    let to = parse_address(to)?;
    let amount = positive_amount(amount, client.token.decimals)?;
    let receipt = client
        .sync
        .token()
        .mint(client.session.active(), to, amount)
        .await?;
    print_tx("mint", receipt.transaction_hash, as_json);
    Ok(())
}
