use crate::config::NodeConfig;
use crate::core::{Balances, Block, Blockchain, Transaction};
use crate::error::{LedgerError, Result};
use crate::network::{Envelope, Node};
use log::{debug, info, warn};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A ledger participant that follows the chain: it verifies and stores every
/// block it hears about and can originate signed transactions, but does not
/// mine.
#[derive(Clone)]
pub struct Consumer {
    config: Arc<NodeConfig>,
    node: Arc<Node>,
    chain: Blockchain,
    handler_installed: Arc<AtomicBool>,
}

impl Consumer {
    pub fn new(config: NodeConfig) -> Result<Consumer> {
        config.validate()?;
        let node = Node::new(&config.name, &config.public_key, &config.addr);
        Ok(Consumer {
            config: Arc::new(config),
            node: Arc::new(node),
            chain: Blockchain::new(),
            handler_installed: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn get_name(&self) -> &str {
        self.config.name.as_str()
    }

    pub fn get_config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn get_node(&self) -> &Arc<Node> {
        &self.node
    }

    pub fn get_chain(&self) -> &Blockchain {
        &self.chain
    }

    /// Install the block handler and start listening for peers
    pub fn start(&self) -> Result<SocketAddr> {
        self.install_handler()?;
        self.node.start()
    }

    pub(crate) fn install_handler(&self) -> Result<()> {
        if self.handler_installed.swap(true, Ordering::SeqCst) {
            return Err(LedgerError::Network(format!(
                "{} is already started",
                self.get_name()
            )));
        }
        let chain = self.chain.clone();
        let difficulty = self.config.difficulty;
        self.node
            .read_any(move |from, data| Self::handle_message(&chain, difficulty, from, data));
        Ok(())
    }

    /// Decode one inbound payload; valid blocks are appended, transactions
    /// and anything undecodable are ignored.
    pub fn handle_message(chain: &Blockchain, difficulty: usize, from: &str, data: &[u8]) {
        match Envelope::decode(data) {
            Some(Envelope::Block { block }) => {
                Self::accept_block(chain, difficulty, block, from);
            }
            Some(Envelope::Transaction { .. }) => {}
            None => debug!("Dropping undecodable message from {from}"),
        }
    }

    /// Verify proof-of-work and append. Returns whether the block was stored.
    pub fn accept_block(chain: &Blockchain, difficulty: usize, block: Block, from: &str) -> bool {
        if !block.verify_with_difficulty(difficulty) {
            warn!("Dropping block with invalid proof-of-work from {from}");
            return false;
        }
        info!("Accepted {block} from {from}");
        chain.append(block);
        true
    }

    pub fn connect(&self, addr: &str) -> Result<String> {
        self.node.connect(addr)
    }

    /// Balances under the locally longest chain
    pub fn values(&self) -> Balances {
        self.chain.longest_balances()
    }

    pub fn balance_of(&self, name: &str) -> i64 {
        self.values().get(name).copied().unwrap_or(0)
    }

    /// Create, sign and broadcast a payment from this node to `to`
    pub fn new_transaction(&self, to: &str, value: i64) -> Result<Transaction> {
        let mut tx = Transaction::new_now(self.get_name(), to, value)?;
        tx.sign(&self.config.secret_key_bytes()?)?;
        info!("{}: broadcasting {tx}", self.get_name());
        self.node.send_all(&Envelope::transaction(tx.clone()));
        Ok(tx)
    }

    pub fn stop(&self) {
        self.node.stop();
    }
}
