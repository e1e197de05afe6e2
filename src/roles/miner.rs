// A miner is a consumer that also buffers verified transactions and runs a
// proof-of-work loop in the background. Any valid block arriving from a peer
// advances the mining epoch, which aborts the current attempt so the next one
// builds on the new tip.

use crate::config::NodeConfig;
use crate::core::{Balances, Block, Blockchain, ProofOfWork, Transaction};
use crate::error::{LedgerError, Result};
use crate::network::{Envelope, Node, PeerManager};
use crate::roles::Consumer;
use crate::storage::MemoryPool;
use log::{debug, info, warn};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Cancellation token for mining attempts.
///
/// Each attempt remembers the generation it started in; advancing the
/// generation invalidates every attempt started before it.
#[derive(Debug, Default)]
pub struct MiningEpoch {
    generation: AtomicU64,
}

impl MiningEpoch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn advance(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.current() == generation
    }
}

/// How one mining attempt ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MiningOutcome {
    /// Found, appended locally and broadcast
    Mined(Block),
    /// A newer block arrived; transactions went back to the pool
    Cancelled,
    /// The miner is shutting down
    Stopped,
    /// Every nonce was tried without success
    Exhausted,
}

// State shared between the mining thread and the miner handle
struct MinerCore {
    name: String,
    difficulty: usize,
    mine_empty_blocks: bool,
    node: Arc<Node>,
    chain: Blockchain,
    pool: Arc<MemoryPool>,
    epoch: Arc<MiningEpoch>,
    running: AtomicBool,
}

impl MinerCore {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn run(&self) {
        while self.is_running() {
            match self.mine_round() {
                MiningOutcome::Mined(_) | MiningOutcome::Cancelled => {}
                MiningOutcome::Exhausted => {
                    warn!("{}: nonce space exhausted, restarting", self.name);
                }
                MiningOutcome::Stopped => break,
            }
        }
        debug!("{}: mining loop finished", self.name);
    }

    fn mine_round(&self) -> MiningOutcome {
        if !self.mine_empty_blocks {
            while !self.pool.wait_for_transactions(IDLE_POLL_INTERVAL) {
                if !self.is_running() {
                    return MiningOutcome::Stopped;
                }
            }
        }

        // Take the generation before reading the tip, so a block appended in
        // between always cancels this attempt
        let generation = self.epoch.current();
        let prev_hash = self.chain.longest();
        let transactions = self.pool.drain();
        let mut block = Block::new(prev_hash, &self.name, transactions, rand::random::<u32>());
        debug!(
            "{}: calculating block on '{}' with {} txs",
            self.name,
            block.get_prev_hash(),
            block.get_transactions().len()
        );

        let pow = ProofOfWork::new(self.difficulty);
        let found = pow.run(&mut block, || {
            !self.is_running() || !self.epoch.is_current(generation)
        });

        if found {
            info!("{}: found {block}", self.name);
            self.chain.append(block.clone());
            self.node.send_all(&Envelope::block(block.clone()));
            return MiningOutcome::Mined(block);
        }

        let outcome = if !self.is_running() {
            MiningOutcome::Stopped
        } else if !self.epoch.is_current(generation) {
            debug!("{}: attempt cancelled by a newer block", self.name);
            MiningOutcome::Cancelled
        } else {
            MiningOutcome::Exhausted
        };
        self.pool.restore(block.into_transactions());
        outcome
    }
}

/// A consumer that also mines
pub struct Miner {
    consumer: Consumer,
    core: Arc<MinerCore>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Miner {
    pub fn new(config: NodeConfig) -> Result<Miner> {
        let consumer = Consumer::new(config)?;
        let config = consumer.get_config();
        let core = MinerCore {
            name: config.name.clone(),
            difficulty: config.difficulty,
            mine_empty_blocks: config.mine_empty_blocks,
            node: Arc::clone(consumer.get_node()),
            chain: consumer.get_chain().clone(),
            pool: Arc::new(MemoryPool::new()),
            epoch: Arc::new(MiningEpoch::new()),
            running: AtomicBool::new(false),
        };
        Ok(Miner {
            consumer,
            core: Arc::new(core),
            worker: Mutex::new(None),
        })
    }

    pub fn get_name(&self) -> &str {
        self.consumer.get_name()
    }

    pub fn get_consumer(&self) -> &Consumer {
        &self.consumer
    }

    pub fn get_node(&self) -> &Arc<Node> {
        self.consumer.get_node()
    }

    pub fn get_chain(&self) -> &Blockchain {
        self.consumer.get_chain()
    }

    pub fn pending_transactions(&self) -> Vec<Transaction> {
        self.core.pool.get_all()
    }

    /// Start the transport and the mining thread.
    ///
    /// The consumer's block handler is installed first, so an arriving block
    /// is already stored when the miner's handler cancels the attempt.
    pub fn start(&self) -> Result<SocketAddr> {
        self.consumer.install_handler()?;
        self.install_handler();
        let addr = self.consumer.get_node().start()?;

        self.core.running.store(true, Ordering::SeqCst);
        let core = Arc::clone(&self.core);
        let handle = thread::Builder::new()
            .name(format!("mine-{}", self.get_name()))
            .spawn(move || core.run())
            .map_err(|e| LedgerError::Network(format!("Failed to spawn mining thread: {e}")))?;
        if let Ok(mut slot) = self.worker.lock() {
            *slot = Some(handle);
        }
        Ok(addr)
    }

    fn install_handler(&self) {
        let peers = self.consumer.get_node().peers();
        let pool = Arc::clone(&self.core.pool);
        let epoch = Arc::clone(&self.core.epoch);
        let difficulty = self.core.difficulty;
        let name = self.get_name().to_string();
        self.consumer.get_node().read_any(move |from, data| {
            Self::handle_message(&name, &peers, &pool, &epoch, difficulty, from, data)
        });
    }

    fn handle_message(
        name: &str,
        peers: &PeerManager,
        pool: &MemoryPool,
        epoch: &MiningEpoch,
        difficulty: usize,
        from: &str,
        data: &[u8],
    ) {
        match Envelope::decode(data) {
            Some(Envelope::Transaction { transaction }) => {
                Self::accept_transaction(name, peers, pool, transaction);
            }
            Some(Envelope::Block { block }) => {
                if block.verify_with_difficulty(difficulty) {
                    debug!("{name}: block from {from} cancels the current attempt");
                    epoch.advance();
                }
            }
            None => {}
        }
    }

    /// Buffer a transaction whose signature matches its sender's known key
    fn accept_transaction(
        name: &str,
        peers: &PeerManager,
        pool: &MemoryPool,
        tx: Transaction,
    ) -> bool {
        let Some(public_key) = peers.public_key_of(tx.get_from()) else {
            debug!("{name}: dropping transaction from unknown party {}", tx.get_from());
            return false;
        };
        if !tx.verify(&public_key) {
            warn!("{name}: dropping transaction with a bad signature: {tx}");
            return false;
        }
        info!("{name}: transaction arrived {tx}");
        pool.add(tx);
        true
    }

    /// Abort the attempt in flight; the loop restarts on the current tip
    pub fn cancel_current_attempt(&self) {
        self.core.epoch.advance();
    }

    pub fn connect(&self, addr: &str) -> Result<String> {
        self.consumer.connect(addr)
    }

    pub fn values(&self) -> Balances {
        self.consumer.values()
    }

    pub fn balance_of(&self, name: &str) -> i64 {
        self.consumer.balance_of(name)
    }

    /// Broadcast a signed payment and queue it for our own next block
    pub fn new_transaction(&self, to: &str, value: i64) -> Result<Transaction> {
        let tx = self.consumer.new_transaction(to, value)?;
        self.core.pool.add(tx.clone());
        Ok(tx)
    }

    pub fn stop(&self) {
        self.core.running.store(false, Ordering::SeqCst);
        self.core.epoch.advance();
        let handle = self.worker.lock().ok().and_then(|mut slot| slot.take());
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("Mining thread for {} panicked", self.get_name());
            }
        }
        self.consumer.stop();
    }
}

impl Drop for Miner {
    fn drop(&mut self) {
        self.stop();
    }
}
