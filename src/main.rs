// This is the entry point for the chaingo CLI
// Every command opens the ledger, does one thing and exits; startnode keeps running
use chaingo::{Block, Command, Config, Ledger, NodeEvent, Opt, Transaction};
use clap::Parser;
use data_encoding::HEXLOWER;
use log::{error, info, warn, LevelFilter};
use serde_json::{json, Value};
use std::process;

fn main() {
    // Info level is enough to follow mining and gossip without drowning in detail
    env_logger::builder().filter_level(LevelFilter::Info).init();

    let opt = Opt::parse();

    if let Err(e) = run_command(opt) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn run_command(opt: Opt) -> Result<(), Box<dyn std::error::Error>> {
    let send_is_discarded = opt.send_is_discarded();
    let mut config = Config::load()?;
    if let Some(db_path) = opt.db_path {
        config.db_path = db_path;
    }
    let mut ledger = Ledger::from_config(&config)?;

    match opt.command {
        Command::Createwallet => {
            let wallet = ledger.create_wallet()?;
            println!("Your new address: {}", wallet.address());
            println!("Public key: {}", HEXLOWER.encode(wallet.public_key()));
            println!("Private key: {}", wallet.private_key_hex());
            println!("Save your private key - it is needed to send from this address");
        }
        Command::ListAddresses => {
            for address in ledger.addresses()? {
                println!("{address}")
            }
        }
        Command::GetBalance { address } => {
            let balance = ledger.wallet_balance(&address)?;
            println!("Balance of {address}: {balance}");
        }
        Command::Send {
            from,
            to,
            amount,
            private_key,
            mine,
        } => {
            // One-shot gossip: an ephemeral node just long enough to reach the peers
            gossip_to(&mut ledger, &config, &opt.peers)?;
            let tx = ledger.create_and_sign_transaction(&from, &to, amount, &private_key)?;
            println!("Transaction {} signed and verified", tx.hash_hex());

            // The pending pool lives in memory, so without --mine the transfer
            // only survives on peers that received it
            if send_is_discarded {
                warn!(
                    "Transaction {} is only pending in this process and is lost on exit; \
                     pass --mine or --peer to keep it",
                    tx.hash_hex()
                );
            }
            if mine {
                let block = ledger.mine_block(Some(&from))?;
                println!("Mined block {}", block.hash_hex());
            }
            println!("Success!")
        }
        Command::Mine { miner } => {
            gossip_to(&mut ledger, &config, &opt.peers)?;
            let block = ledger.mine_block(miner.as_deref())?;
            println!(
                "Mined block {} with {} transactions",
                block.hash_hex(),
                block.get_transactions().len()
            );
        }
        Command::Printchain => {
            let chain = ledger.get_chain()?;
            let blocks: Vec<Value> = chain
                .iter()
                .enumerate()
                .map(|(index, block)| block_json(index, block))
                .collect();
            let output = json!({ "length": chain.len(), "chain": blocks });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Command::GetBlock { index } => {
            let block = ledger.get_block(index)?;
            println!("{}", serde_json::to_string_pretty(&block_json(index, &block))?);
        }
        Command::ValidateChain => {
            ledger.validate_chain()?;
            println!("Blockchain is valid ({} blocks)", ledger.get_chain()?.len());
        }
        Command::DeleteBlocks { index } => {
            let deleted = ledger.delete_blocks_from(index)?;
            println!(
                "Deleted {deleted} blocks starting from index {index}, new length {}",
                ledger.get_chain()?.len()
            );
        }
        Command::FindTx { hash } => match ledger.find_transaction(&hash)? {
            Some((block_hash, tx)) => {
                let output = json!({ "hash": hash, "block": block_hash, "data": tx_json(&tx) });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            None => return Err(format!("Transaction not found: {hash}").into()),
        },
        Command::Stats => {
            let stats = ledger.chain_stats()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::StartNode { addr, sync } => {
            let addr = addr.unwrap_or_else(|| config.node_addr.clone());
            ledger.start_node(&addr, config.node_options())?;
            for peer in &opt.peers {
                ledger.add_peer(peer)?;
            }

            let node = ledger
                .node()
                .ok_or("Node failed to start")?
                .clone();
            let events = node.subscribe()?;
            info!("Node {} running with {} peers", node.addr(), opt.peers.len());

            if sync {
                let report = ledger.request_sync()?;
                info!(
                    "Sync requested from {} peers ({} pruned)",
                    report.delivered.len(),
                    report.pruned.len()
                );
            }

            // The accept loop never returns, so this runs for the life of the process
            for event in events {
                log_event(&event);
            }
        }
    }
    Ok(())
}

fn gossip_to(
    ledger: &mut Ledger,
    config: &Config,
    peers: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    if peers.is_empty() {
        return Ok(());
    }
    ledger.start_node("127.0.0.1:0", config.node_options())?;
    for peer in peers {
        ledger.add_peer(peer)?;
    }
    Ok(())
}

fn log_event(event: &NodeEvent) {
    match event {
        NodeEvent::BlockReceived { from, block } => {
            info!("Block {} received from {from}", block.hash_hex())
        }
        NodeEvent::TransactionReceived { from, transaction } => {
            info!("Transaction {transaction} received from {from}")
        }
        NodeEvent::ChainRequested { from, reply_to } => {
            info!("Chain requested by {from}, replying to {reply_to}")
        }
        NodeEvent::ChainSent { to, height } => info!("Chain of {height} blocks sent to {to}"),
        NodeEvent::ChainReceived { from, blocks } => {
            info!("Chain of {} blocks received from {from}", blocks.len())
        }
        NodeEvent::MessageRejected { from, reason } => {
            info!("Message from {from} rejected: {reason}")
        }
    }
}

fn block_json(index: usize, block: &Block) -> Value {
    json!({
        "index": index,
        "hash": block.hash_hex(),
        "previousHash": block.prev_hash_hex(),
        "timestamp": block.get_timestamp(),
        "nonce": block.get_nonce(),
        "transactions": block.get_transactions().iter().map(tx_json).collect::<Vec<_>>(),
    })
}

fn tx_json(tx: &Transaction) -> Value {
    let (r, s) = tx.get_signature();
    json!({
        "hash": tx.hash_hex(),
        "from": tx.get_from(),
        "to": tx.get_to(),
        "amount": tx.get_amount(),
        "signed": tx.is_signed(),
        "r": r,
        "s": s,
        "publicKey": HEXLOWER.encode(tx.get_public_key()),
    })
}
