use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;

/// A payment given on the command line as `NAME:VALUE`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentArg {
    pub to: String,
    pub value: i64,
}

impl FromStr for PaymentArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (to, value) = s
            .rsplit_once(':')
            .ok_or_else(|| format!("Invalid payment: {s}. Expected NAME:VALUE"))?;
        if to.is_empty() {
            return Err(format!("Invalid payment: {s}. Recipient name is empty"));
        }
        let value = value
            .parse::<i64>()
            .map_err(|e| format!("Invalid payment value in {s}: {e}"))?;
        Ok(PaymentArg {
            to: to.to_string(),
            value,
        })
    }
}

impl std::fmt::Display for PaymentArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.to, self.value)
    }
}

#[derive(Debug, Parser)]
#[command(name = "p2p-ledger")]
pub struct Opt {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(name = "keygen", about = "Generate a key pair for a node config")]
    Keygen {
        #[arg(long, default_value = "node", help = "Party name to put in the config")]
        name: String,
        #[arg(long, default_value = "127.0.0.1:5000", help = "Listen address")]
        addr: String,
    },
    #[command(name = "startnode", about = "Start a ledger node")]
    StartNode {
        #[arg(long, help = "Path to the node's TOML config")]
        config: PathBuf,
        #[arg(long, help = "Mine blocks in addition to following the chain")]
        miner: bool,
        #[arg(long = "connect", help = "Peer address to dial (repeatable)")]
        connect: Vec<String>,
        #[arg(long = "pay", help = "Payment to broadcast after connecting, NAME:VALUE")]
        pay: Vec<PaymentArg>,
        #[arg(long, default_value_t = 10, help = "Seconds between balance reports")]
        report_secs: u64,
    },
    #[command(name = "demo", about = "Run two consumers and a miner in-process")]
    Demo {
        #[arg(long, default_value_t = crate::core::DEFAULT_DIFFICULTY)]
        difficulty: usize,
        #[arg(long, default_value_t = 30, help = "Seconds to let the network settle")]
        wait_secs: u64,
    },
}
