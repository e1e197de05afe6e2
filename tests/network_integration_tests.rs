//! Network integration tests
//!
//! Real nodes on loopback ports: handshake, broadcast fan-out, and the
//! consumer/miner flow from a signed payment to agreed balances.

use p2p_ledger::{
    Block, Consumer, Envelope, LedgerError, Miner, Node, NodeConfig, ProofOfWork, Transaction,
};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

const TIMEOUT: Duration = Duration::from_secs(20);

fn config(name: &str) -> NodeConfig {
    let _ = env_logger::builder().is_test(true).try_init();
    NodeConfig::generate(name, "127.0.0.1:0")
        .unwrap()
        .with_difficulty(1)
        .with_mine_empty_blocks(false)
}

fn wait_until<F: Fn() -> bool>(condition: F) -> bool {
    let deadline = Instant::now() + TIMEOUT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}

#[test]
fn test_broadcast_reaches_every_handler_on_peer() {
    let c1 = Node::new("C1", "pk1", "127.0.0.1:0");
    let c2 = Node::new("C2", "pk2", "127.0.0.1:0");
    let c1_addr = c1.start().unwrap();
    c2.start().unwrap();

    let received = Arc::new(Mutex::new(Vec::new()));
    for handler_id in 0..2 {
        let received = Arc::clone(&received);
        c1.read_any(move |from, data| {
            if let Some(envelope) = Envelope::decode(data) {
                received
                    .lock()
                    .unwrap()
                    .push((handler_id, from.to_string(), envelope));
            }
        });
    }

    assert_eq!(c2.connect(&c1_addr.to_string()).unwrap(), "C1");
    assert!(wait_until(|| c1.is_connected_to("C2")));
    assert_eq!(c1.public_key_of("C2").as_deref(), Some("pk2"));

    let tx = Transaction::new("C2", "C1", 7, 99);
    c2.send_all(&Envelope::transaction(tx.clone()));

    assert!(wait_until(|| received.lock().unwrap().len() == 2));
    let received = received.lock().unwrap();
    for (i, (handler_id, from, envelope)) in received.iter().enumerate() {
        assert_eq!(*handler_id, i);
        assert_eq!(from, "C2");
        assert_eq!(envelope, &Envelope::transaction(tx.clone()));
    }

    c1.stop();
    c2.stop();
}

#[test]
fn test_accepting_side_can_reply_by_name() {
    let c1 = Node::new("C1", "pk1", "127.0.0.1:0");
    let c2 = Node::new("C2", "pk2", "127.0.0.1:0");
    let c1_addr = c1.start().unwrap();
    c2.start().unwrap();

    let replies = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&replies);
    c2.read_any(move |from, data| {
        sink.lock().unwrap().push((from.to_string(), data.to_vec()));
    });

    c2.connect(&c1_addr.to_string()).unwrap();
    assert!(wait_until(|| c1.is_connected_to("C2")));

    c1.send("C2", &"pong").unwrap();
    assert!(wait_until(|| !replies.lock().unwrap().is_empty()));
    assert_eq!(
        replies.lock().unwrap()[0],
        ("C1".to_string(), b"\"pong\"".to_vec())
    );

    assert!(matches!(
        c1.send("C3", &"lost"),
        Err(LedgerError::NoSuchParty(_))
    ));

    c1.stop();
    c2.stop();
}

#[test]
fn test_broadcast_survives_a_dead_peer() {
    let hub = Node::new("HUB", "pk", "127.0.0.1:0");
    let hub_addr = hub.start().unwrap().to_string();
    let alive = Node::new("ALIVE", "pk", "127.0.0.1:0");
    let dead = Node::new("DEAD", "pk", "127.0.0.1:0");

    let count = Arc::new(Mutex::new(0usize));
    let sink = Arc::clone(&count);
    alive.read_any(move |_, _| *sink.lock().unwrap() += 1);

    alive.connect(&hub_addr).unwrap();
    dead.connect(&hub_addr).unwrap();
    assert!(wait_until(|| hub.peer_names().len() == 2));

    dead.stop();
    hub.send_all(&"first");
    hub.send_all(&"second");

    assert!(wait_until(|| *count.lock().unwrap() == 2));
    hub.stop();
    alive.stop();
}

#[test]
fn test_stop_closes_peer_connections() {
    let c1 = Node::new("C1", "pk1", "127.0.0.1:0");
    let c2 = Node::new("C2", "pk2", "127.0.0.1:0");
    let c1_addr = c1.start().unwrap();
    c2.connect(&c1_addr.to_string()).unwrap();
    assert!(wait_until(|| c1.is_connected_to("C2")));

    c1.stop();
    assert!(c1.peer_names().is_empty());
    // C2's read loop sees the closed socket and forgets C1
    assert!(wait_until(|| !c2.is_connected_to("C1")));
    assert!(c2.connect(&c1_addr.to_string()).is_err());
}

#[test]
fn test_consumer_accepts_valid_blocks_only() {
    let c1 = Consumer::new(config("C1")).unwrap();
    let c1_addr = c1.start().unwrap();
    let sender = Node::new("M9", "pk", "127.0.0.1:0");
    sender.connect(&c1_addr.to_string()).unwrap();
    assert!(wait_until(|| c1.get_node().is_connected_to("M9")));

    let mut good = Block::new(String::new(), "M9", vec![Transaction::new("A", "B", 5, 1)], 0);
    assert!(ProofOfWork::new(1).run(&mut good, || false));
    let mut forged = good.clone();
    forged.set_nonce(good.get_nonce().wrapping_add(1));

    sender.send_all(&Envelope::block(forged));
    sender.send_all(&Envelope::block(good.clone()));

    assert!(wait_until(|| c1.get_chain().contains(good.get_hash())));
    assert_eq!(c1.get_chain().len(), 1);
    assert_eq!(c1.balance_of("B"), 5);

    sender.stop();
    c1.stop();
}

#[test]
fn test_payment_is_mined_and_seen_by_all_consumers() {
    let c1 = Consumer::new(config("C1")).unwrap();
    let c2 = Consumer::new(config("C2")).unwrap();
    let m1 = Miner::new(config("M1")).unwrap();

    let c1_addr = c1.start().unwrap().to_string();
    let c2_addr = c2.start().unwrap().to_string();
    m1.start().unwrap();

    c2.connect(&c1_addr).unwrap();
    m1.connect(&c1_addr).unwrap();
    m1.connect(&c2_addr).unwrap();
    assert!(wait_until(|| c1.get_node().is_connected_to("M1")));

    c1.new_transaction("C2", 5).unwrap();
    c1.new_transaction("C2", 3).unwrap();

    let settled = |values: &p2p_ledger::Balances| {
        values.get("C1") == Some(&-8) && values.get("C2") == Some(&8)
    };
    assert!(wait_until(|| settled(&m1.values())));
    assert!(wait_until(|| settled(&c1.values())));
    assert!(wait_until(|| settled(&c2.values())));

    m1.stop();
    c2.stop();
    c1.stop();
}

#[test]
fn test_forged_transaction_is_not_mined() {
    let c1 = Consumer::new(config("C1")).unwrap();
    let m1 = Miner::new(config("M1")).unwrap();
    let m1_addr = m1.start().unwrap().to_string();
    c1.start().unwrap();
    c1.connect(&m1_addr).unwrap();
    assert!(wait_until(|| m1.get_node().is_connected_to("C1")));

    // Claims to come from C1 but is signed with someone else's key
    let impostor = NodeConfig::generate("X", "127.0.0.1:0").unwrap();
    let mut forged = Transaction::new("C1", "X", 100, 1);
    forged
        .sign_with_base64_key(&impostor.secret_key)
        .unwrap();
    c1.get_node().send_all(&Envelope::transaction(forged));

    // A genuine payment sent afterwards on the same connection is mined
    c1.new_transaction("M1", 1).unwrap();
    assert!(wait_until(|| m1.balance_of("M1") == 1));
    assert_eq!(m1.balance_of("X"), 0);
    assert!(m1.pending_transactions().is_empty());

    m1.stop();
    c1.stop();
}

#[test]
fn test_second_miner_follows_mined_block() {
    let c1 = Consumer::new(config("C1")).unwrap();
    let m1 = Miner::new(config("M1")).unwrap();
    let m2 = Miner::new(config("M2")).unwrap();
    let m1_addr = m1.start().unwrap().to_string();
    m2.start().unwrap();
    c1.start().unwrap();

    // Only M1 hears about the payment; M2 learns of it through the block
    m2.connect(&m1_addr).unwrap();
    c1.connect(&m1_addr).unwrap();
    assert!(wait_until(|| {
        m1.get_node().is_connected_to("M2") && m1.get_node().is_connected_to("C1")
    }));

    c1.new_transaction("C9", 2).unwrap();

    assert!(wait_until(|| m1.balance_of("C9") == 2));
    assert!(wait_until(|| m2.balance_of("C9") == 2));
    assert_eq!(m2.balance_of("C1"), -2);
    assert_eq!(m1.get_chain().longest(), m2.get_chain().longest());
    assert!(m2.pending_transactions().is_empty());

    c1.stop();
    m2.stop();
    m1.stop();
}
