use clap::Parser;
use log::{error, info, warn, LevelFilter};
use p2p_ledger::cli::PaymentArg;
use p2p_ledger::{Balances, Command, Consumer, Miner, NodeConfig, Opt, Result};
use std::collections::BTreeMap;
use std::process;
use std::thread;
use std::time::{Duration, Instant};

const PEER_WAIT: Duration = Duration::from_secs(5);

fn main() {
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let opt = Opt::parse();

    if let Err(e) = run_command(opt.command) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn run_command(command: Command) -> Result<()> {
    match command {
        Command::Keygen { name, addr } => {
            let config = NodeConfig::generate(&name, &addr)?;
            print!("{}", config.to_toml_string()?);
        }
        Command::StartNode {
            config,
            miner,
            connect,
            pay,
            report_secs,
        } => {
            let config = NodeConfig::load(&config)?;
            let role = if miner {
                Role::Miner(Miner::new(config)?)
            } else {
                Role::Consumer(Consumer::new(config)?)
            };
            role.start()?;
            for addr in &connect {
                if let Err(e) = role.consumer().connect(addr) {
                    warn!("Could not connect to {addr}: {e}");
                }
            }
            for payment in &pay {
                role.pay(payment)?;
            }
            loop {
                thread::sleep(Duration::from_secs(report_secs.max(1)));
                let consumer = role.consumer();
                let chain = consumer.get_chain();
                info!(
                    "{} height {} balances: {}",
                    consumer.get_name(),
                    chain.chain_from(&chain.longest()).len(),
                    format_balances(&consumer.values())
                );
            }
        }
        Command::Demo {
            difficulty,
            wait_secs,
        } => run_demo(difficulty, wait_secs)?,
    }
    Ok(())
}

enum Role {
    Consumer(Consumer),
    Miner(Miner),
}

impl Role {
    fn consumer(&self) -> &Consumer {
        match self {
            Role::Consumer(consumer) => consumer,
            Role::Miner(miner) => miner.get_consumer(),
        }
    }

    fn start(&self) -> Result<()> {
        match self {
            Role::Consumer(consumer) => consumer.start()?,
            Role::Miner(miner) => miner.start()?,
        };
        Ok(())
    }

    fn pay(&self, payment: &PaymentArg) -> Result<()> {
        match self {
            Role::Consumer(consumer) => consumer.new_transaction(&payment.to, payment.value)?,
            Role::Miner(miner) => miner.new_transaction(&payment.to, payment.value)?,
        };
        Ok(())
    }
}

fn format_balances(balances: &Balances) -> String {
    let sorted: BTreeMap<_, _> = balances.iter().collect();
    let parts: Vec<String> = sorted
        .into_iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect();
    format!("{{{}}}", parts.join(", "))
}

fn wait_for_peer(consumer: &Consumer, peer: &str) {
    let deadline = Instant::now() + PEER_WAIT;
    while !consumer.get_node().is_connected_to(peer) && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(20));
    }
}

// Two consumers and one miner on loopback: C2 dials C1, M1 dials both, then
// C1 pays C2 twice and everyone waits for the miner to include it.
fn run_demo(difficulty: usize, wait_secs: u64) -> Result<()> {
    let local = "127.0.0.1:0";
    let c1 = Consumer::new(NodeConfig::generate("C1", local)?.with_difficulty(difficulty))?;
    let c2 = Consumer::new(NodeConfig::generate("C2", local)?.with_difficulty(difficulty))?;
    let m1 = Miner::new(NodeConfig::generate("M1", local)?.with_difficulty(difficulty))?;

    let c1_addr = c1.start()?;
    let c2_addr = c2.start()?;
    m1.start()?;
    info!("STARTED");

    c2.connect(&c1_addr.to_string())?;
    m1.connect(&c1_addr.to_string())?;
    m1.connect(&c2_addr.to_string())?;
    wait_for_peer(&c1, "M1");

    c1.new_transaction("C2", 5)?;
    c1.new_transaction("C2", 3)?;

    thread::sleep(Duration::from_secs(wait_secs));

    println!("C1 sees {}", format_balances(&c1.values()));
    println!("C2 sees {}", format_balances(&c2.values()));

    m1.stop();
    c2.stop();
    c1.stop();
    Ok(())
}
