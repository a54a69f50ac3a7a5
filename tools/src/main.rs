//! alloc-runner: headless receipt allocation runner.
//!
//! Usage:
//!   alloc-runner --db alloc.db --config ceilings.json
//!   alloc-runner --db alloc.db --ipc-mode
//!
//! In IPC mode each stdin line is one JSON command and each reply is one
//! JSON line on stdout. Without it, a demo client is seeded, one receipt is
//! allocated and a summary is printed.

use allocation_core::{
    config::AllocationConfig,
    engine::AllocationEngine,
    error::AllocError,
    models::{NewDeposit, NewProposedAllocation, Receipt, WrapperKind},
    store::AllocStore,
    types::{ClientId, DepositId, MinorUnits, PotId},
};
use anyhow::Result;
use rust_decimal::Decimal;
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    CreateClient {
        name: String,
    },
    CreatePot {
        client_id: ClientId,
        name: String,
    },
    CreateAccount {
        pot_id: PotId,
        #[serde(default = "unclassified")]
        wrapper: WrapperKind,
    },
    CreateDeposit(NewDeposit),
    PostReceipt {
        deposit_id: DepositId,
        amount: MinorUnits,
    },
    GetDeposit {
        deposit_id: DepositId,
    },
    GetClient {
        client_id: ClientId,
    },
    Quit,
}

fn unclassified() -> WrapperKind {
    WrapperKind::Unclassified
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = arg_value(&args, "--db").unwrap_or(":memory:");
    let config = match arg_value(&args, "--config") {
        Some(path) => AllocationConfig::load(path)?,
        None => AllocationConfig::default(),
    };

    if !ipc_mode {
        println!("alloc-runner");
        println!("  db:            {db}");
        println!("  SIPP ceiling:  {}", config.sipp_ceiling);
        println!("  ISA ceiling:   {}", config.isa_ceiling);
        println!();
    }

    let store = AllocStore::open(db)?;
    store.migrate()?;
    let engine = AllocationEngine::build(store, config);

    if ipc_mode {
        run_ipc_loop(&engine)?;
    } else {
        run_demo(&engine)?;
    }
    Ok(())
}

fn run_ipc_loop(engine: &AllocationEngine) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };
        if matches!(cmd, IpcCommand::Quit) {
            break;
        }

        let reply = match handle_command(engine, cmd) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("Command failed: {e}");
                serde_json::json!({ "error": e.to_string() })
            }
        };
        writeln!(stdout, "{}", reply)?;
        stdout.flush()?;
    }
    Ok(())
}

fn handle_command(engine: &AllocationEngine, cmd: IpcCommand) -> Result<serde_json::Value> {
    let store = &engine.store;
    let reply = match cmd {
        IpcCommand::CreateClient { name } => serde_json::to_value(store.insert_client(&name)?)?,
        IpcCommand::CreatePot { client_id, name } => {
            serde_json::to_value(store.insert_pot(client_id, &name)?)?
        }
        IpcCommand::CreateAccount { pot_id, wrapper } => {
            serde_json::to_value(store.insert_account(pot_id, wrapper)?)?
        }
        IpcCommand::CreateDeposit(new) => {
            if store.find_client(new.client_id)?.is_none() {
                anyhow::bail!("Client does not exist: {}", new.client_id);
            }
            let deposit = store.create_deposit(&new)?;
            serde_json::json!({ "deposit_id": deposit.id })
        }
        IpcCommand::PostReceipt { deposit_id, amount } => {
            let receipt_id = post_receipt(engine, deposit_id, amount)?;
            serde_json::json!({ "receipt_id": receipt_id })
        }
        IpcCommand::GetDeposit { deposit_id } => {
            let statement = store
                .deposit_statement(deposit_id)?
                .ok_or(AllocError::DepositNotFound { deposit_id })?;
            serde_json::to_value(statement)?
        }
        IpcCommand::GetClient { client_id } => {
            let client = store
                .find_client(client_id)?
                .ok_or_else(|| anyhow::anyhow!("Client does not exist: {client_id}"))?;
            let pots = store.pots_for_client(client_id)?;
            serde_json::json!({ "client": client, "pots": pots })
        }
        IpcCommand::Quit => serde_json::Value::Null,
    };
    Ok(reply)
}

/// Load the deposit, then hand the receipt to the engine.
fn post_receipt(engine: &AllocationEngine, deposit_id: DepositId, amount: MinorUnits) -> Result<i64> {
    let deposit = engine
        .store
        .load_deposit(deposit_id)?
        .ok_or(AllocError::DepositNotFound { deposit_id })?;
    let mut receipt = Receipt::new(deposit.id, amount);
    engine.allocate(&mut receipt, &deposit)?;
    receipt
        .id
        .ok_or_else(|| anyhow::anyhow!("receipt for deposit {deposit_id} has no id after allocation"))
}

/// One client, one pot, SIPP/ISA/unclassified accounts split 25/25/50.
fn run_demo(engine: &AllocationEngine) -> Result<()> {
    let store = &engine.store;
    let client = store.insert_client("Demo Client")?;
    let pot = store.insert_pot(client.id, "Retirement")?;
    let sipp = store.insert_account(pot.id, WrapperKind::Sipp)?;
    let isa = store.insert_account(pot.id, WrapperKind::Isa)?;
    let other = store.insert_account(pot.id, WrapperKind::Unclassified)?;

    let deposit = store.create_deposit(&NewDeposit {
        client_id: client.id,
        amount: 5_000_000,
        proposed_allocation: vec![
            NewProposedAllocation { account_id: sipp.id, split: Decimal::new(25, 2) },
            NewProposedAllocation { account_id: isa.id, split: Decimal::new(25, 2) },
            NewProposedAllocation { account_id: other.id, split: Decimal::new(50, 2) },
        ],
    })?;

    let receipt_id = post_receipt(engine, deposit.id, deposit.amount)?;
    print_summary(store, deposit.id, receipt_id)
}

fn print_summary(store: &AllocStore, deposit_id: DepositId, receipt_id: i64) -> Result<()> {
    let allocations = store.allocations_for_receipt(receipt_id)?;
    let total: MinorUnits = allocations.iter().map(|a| a.amount).sum();

    println!("=== ALLOCATION SUMMARY ===");
    println!("  deposit:   {deposit_id}");
    println!("  receipt:   {receipt_id}");
    for a in &allocations {
        let wrapper = store
            .find_account(a.account_id)?
            .map(|acc| acc.wrapper.to_string())
            .unwrap_or_else(|| "?".into());
        println!("  account {:>4} ({wrapper:<12}) {:>12}", a.account_id, a.amount);
    }
    println!("  total:     {total}");
    Ok(())
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
