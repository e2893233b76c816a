use serde::{Deserialize, Serialize};

pub type Address = String;

/// A transfer of `amount` from one address to another.
///
/// `from == None` marks coins issued by the chain itself (the mining reward).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub from: Option<Address>,
    pub to: Address,
    pub amount: u64,
}

impl Transaction {
    pub fn new(from: impl Into<Address>, to: impl Into<Address>, amount: u64) -> Self {
        Self {
            from: Some(from.into()),
            to: to.into(),
            amount,
        }
    }

    pub fn reward(to: impl Into<Address>, amount: u64) -> Self {
        Self {
            from: None,
            to: to.into(),
            amount,
        }
    }

    pub fn is_reward(&self) -> bool {
        self.from.is_none()
    }

    /// Appends the canonical byte form used for block hashing.
    ///
    /// Layout: presence tag for `from` (0 or 1), then each address as a
    /// little-endian u64 length followed by its UTF-8 bytes, then the amount.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        match &self.from {
            Some(from) => {
                out.push(1);
                put_str(out, from);
            }
            None => out.push(0),
        }
        put_str(out, &self.to);
        out.extend_from_slice(&self.amount.to_le_bytes());
    }
}

fn put_str(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as u64).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
}
