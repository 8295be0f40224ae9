use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "chaingo", about = "A minimal proof-of-work ledger with P2P gossip")]
pub struct Opt {
    #[arg(long = "db", global = true, help = "Database path (overrides CHAINGO_DB)")]
    pub db_path: Option<PathBuf>,
    #[arg(
        long = "peer",
        global = true,
        help = "Peer to gossip new transactions and blocks to (repeatable)"
    )]
    pub peers: Vec<String>,
    #[command(subcommand)]
    pub command: Command,
}

impl Opt {
    /// A `send` that neither mines nor gossips leaves its transaction in a pool
    /// that is gone once the command exits.
    pub fn send_is_discarded(&self) -> bool {
        matches!(self.command, Command::Send { mine: false, .. }) && self.peers.is_empty()
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(name = "createwallet", about = "Create a new wallet")]
    Createwallet,
    #[command(name = "listaddresses", about = "Print local wallet addresses")]
    ListAddresses,
    #[command(
        name = "getbalance",
        about = "Get the balance of an address by scanning the chain"
    )]
    GetBalance {
        #[arg(help = "The wallet address")]
        address: String,
    },
    #[command(name = "send", about = "Sign a transfer and queue it for mining")]
    Send {
        #[arg(help = "Source wallet address")]
        from: String,
        #[arg(help = "Destination address")]
        to: String,
        #[arg(help = "Amount to send")]
        amount: i64,
        #[arg(help = "Hex private key of the source wallet")]
        private_key: String,
        #[arg(long = "mine", help = "Mine the transfer right away, rewarding the sender")]
        mine: bool,
    },
    #[command(name = "mine", about = "Mine pending transactions into a new block")]
    Mine {
        #[arg(help = "Address receiving the block reward (defaults to Genesis)")]
        miner: Option<String>,
    },
    #[command(name = "printchain", about = "Print all blocks as JSON")]
    Printchain,
    #[command(name = "getblock", about = "Print one block as JSON")]
    GetBlock {
        #[arg(help = "Block index, genesis is 0")]
        index: usize,
    },
    #[command(name = "validatechain", about = "Check hash links and proof of work")]
    ValidateChain,
    #[command(
        name = "deleteblocks",
        about = "Delete the block at INDEX and everything after it"
    )]
    DeleteBlocks {
        #[arg(help = "First block index to delete (genesis cannot be deleted)")]
        index: usize,
    },
    #[command(name = "findtx", about = "Find a transaction by its hex hash")]
    FindTx {
        #[arg(help = "Transaction hash")]
        hash: String,
    },
    #[command(name = "stats", about = "Show chain statistics")]
    Stats,
    #[command(name = "startnode", about = "Start a P2P node")]
    StartNode {
        #[arg(long = "addr", help = "Listen address (overrides NODE_ADDRESS)")]
        addr: Option<String>,
        #[arg(long = "sync", help = "Ask peers for their chains after starting")]
        sync: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_parses_flags_anywhere() {
        let opt = Opt::try_parse_from([
            "chaingo", "send", "alice", "bob", "10", "abcd", "--mine", "--db", "/tmp/x.db",
        ])
        .unwrap();
        assert_eq!(opt.db_path, Some(PathBuf::from("/tmp/x.db")));
        match opt.command {
            Command::Send {
                from,
                amount,
                mine,
                ..
            } => {
                assert_eq!(from, "alice");
                assert_eq!(amount, 10);
                assert!(mine);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_send_without_mine_or_peers_is_discarded() {
        let local = Opt::try_parse_from(["chaingo", "send", "alice", "bob", "10", "abcd"]).unwrap();
        assert!(local.send_is_discarded());

        let mined =
            Opt::try_parse_from(["chaingo", "send", "alice", "bob", "10", "abcd", "--mine"])
                .unwrap();
        assert!(!mined.send_is_discarded());

        let gossiped = Opt::try_parse_from([
            "chaingo", "send", "alice", "bob", "10", "abcd", "--peer", "127.0.0.1:9101",
        ])
        .unwrap();
        assert!(!gossiped.send_is_discarded());

        let mine = Opt::try_parse_from(["chaingo", "mine"]).unwrap();
        assert!(!mine.send_is_discarded());
    }

    #[test]
    fn test_startnode_with_peers() {
        let opt = Opt::try_parse_from([
            "chaingo",
            "startnode",
            "--addr",
            "127.0.0.1:9100",
            "--peer",
            "127.0.0.1:9101",
            "--peer",
            "127.0.0.1:9102",
            "--sync",
        ])
        .unwrap();
        assert_eq!(opt.peers.len(), 2);
        assert!(matches!(
            opt.command,
            Command::StartNode { sync: true, addr: Some(_) }
        ));
    }

    #[test]
    fn test_mine_miner_is_optional() {
        let opt = Opt::try_parse_from(["chaingo", "mine"]).unwrap();
        assert!(matches!(opt.command, Command::Mine { miner: None }));
        assert!(Opt::try_parse_from(["chaingo", "getblock", "minus-one"]).is_err());
    }
}
