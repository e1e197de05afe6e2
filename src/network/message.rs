use crate::core::{Block, Transaction};
use crate::utils::deserialize;
use serde::{Deserialize, Serialize};

/// The tagged wire message: `{"type":"block","block":{..}}` or
/// `{"type":"transaction","transaction":{..}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Envelope {
    Block { block: Block },
    Transaction { transaction: Transaction },
}

impl Envelope {
    pub fn block(block: Block) -> Envelope {
        Envelope::Block { block }
    }

    pub fn transaction(transaction: Transaction) -> Envelope {
        Envelope::Transaction { transaction }
    }

    /// `None` for anything that is not a well-formed envelope
    pub fn decode(data: &[u8]) -> Option<Envelope> {
        deserialize(data).ok()
    }
}
