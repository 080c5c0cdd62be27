use serde::{Deserialize, Serialize};

use crate::{block::Block, error::BlockchainError, Verification};

/// The append-only chain of [`Block`]s held by a node.
///
/// Invariants maintained by this type:
/// - Always contains at least the genesis block.
/// - Blocks appended through [`Blockchain::push`] link to the previous tip.
///
/// Chains received from peers enter through [`Blockchain::from_blocks`] and
/// are only trusted after [`Blockchain::is_valid`].  Serialises as a plain
/// array of blocks, the same shape peers exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Block>", into = "Vec<Block>")]
pub struct Blockchain {
    blocks: Vec<Block>,
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<Vec<Block>> for Blockchain {
    type Error = BlockchainError;

    fn try_from(blocks: Vec<Block>) -> Result<Self, Self::Error> {
        Self::from_blocks(blocks)
    }
}

impl From<Blockchain> for Vec<Block> {
    fn from(chain: Blockchain) -> Self {
        chain.blocks
    }
}

impl Blockchain {
    /// Initialise a new chain with only the genesis block.
    pub fn new() -> Self {
        Self {
            blocks: vec![Block::genesis()],
        }
    }

    /// Wrap a block sequence without validating linkage or proofs.
    ///
    /// Rejects only sequences that cannot be a chain at all: empty ones and
    /// ones that do not start at index 0.
    pub fn from_blocks(blocks: Vec<Block>) -> Result<Self, BlockchainError> {
        match blocks.first() {
            None => Err(BlockchainError::Empty),
            Some(first) if !first.is_genesis() => Err(BlockchainError::MissingGenesis(first.index)),
            Some(_) => Ok(Self { blocks }),
        }
    }

    /// Number of blocks in the chain (including genesis).
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The most recent block.
    pub fn tip(&self) -> &Block {
        self.blocks
            .last()
            .expect("chain always holds the genesis block")
    }

    /// Digest of the tip; the `previous_hash` the next block must carry.
    pub fn tip_digest(&self) -> String {
        self.tip().digest()
    }

    /// Append `block`, which must link to the current tip.
    ///
    /// Only linkage is checked here; proof validation is the caller's job.
    pub fn push(&mut self, block: Block) -> Result<&Block, BlockchainError> {
        let tip = self.tip();
        if block.index != tip.index + 1 || block.previous_hash != tip.digest() {
            return Err(BlockchainError::BrokenLink { index: block.index });
        }
        self.blocks.push(block);
        Ok(self.tip())
    }

    /// Return a reference to a block by its index.
    pub fn get_block(&self, index: u64) -> Option<&Block> {
        self.blocks.get(index as usize)
    }

    /// All blocks in the chain.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Validate the whole chain with [`Verification::verify_chain`].
    pub fn is_valid(&self) -> bool {
        Verification::verify_chain(&self.blocks)
    }

    /// Replace this chain with `other` if `other` is strictly longer and
    /// valid.
    ///
    /// This is the longest-chain rule applied per peer during conflict
    /// resolution.
    pub fn sync_from(&mut self, other: &Blockchain) -> bool {
        if other.len() > self.len() && other.is_valid() {
            *self = other.clone();
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use mc_transaction::Transaction;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::proof_of_work;

    fn mine_onto(chain: &mut Blockchain, transfers: Vec<Transaction>) {
        let last_hash = chain.tip_digest();
        let proof = proof_of_work(&transfers, &last_hash, &CancellationToken::new())
            .unwrap()
            .proof;
        let mut txs = transfers;
        txs.push(Transaction::reward("miner", 10.0));
        let index = chain.tip().index + 1;
        chain.push(Block::new(index, last_hash, txs, proof)).unwrap();
    }

    fn chain_of(extra_blocks: usize) -> Blockchain {
        let mut chain = Blockchain::new();
        for i in 0..extra_blocks {
            mine_onto(&mut chain, vec![Transaction::new("a", "b", format!("s{i}"), 1.0)]);
        }
        chain
    }

    #[test]
    fn new_chain_is_valid() {
        let chain = Blockchain::new();
        assert!(chain.is_valid());
        assert_eq!(chain.len(), 1);
        assert!(chain.tip().is_genesis());
    }

    #[test]
    fn push_extends_chain() {
        let chain = chain_of(2);
        assert_eq!(chain.len(), 3);
        assert!(chain.is_valid());
        assert_eq!(chain.get_block(2).unwrap().previous_hash, chain.get_block(1).unwrap().digest());
    }

    #[test]
    fn push_rejects_unlinked_block() {
        let mut chain = Blockchain::new();
        let orphan = Block::new(1, "ff".repeat(32), vec![], 0);
        assert!(matches!(chain.push(orphan), Err(BlockchainError::BrokenLink { index: 1 })));
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn from_blocks_requires_genesis() {
        assert!(matches!(Blockchain::from_blocks(vec![]), Err(BlockchainError::Empty)));

        let not_genesis = Block::new(3, "", vec![], 0);
        assert!(matches!(
            Blockchain::from_blocks(vec![not_genesis]),
            Err(BlockchainError::MissingGenesis(3))
        ));
    }

    #[test]
    fn serialises_as_block_array() {
        let chain = chain_of(1);
        let json = serde_json::to_value(&chain).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 2);

        let back: Blockchain = serde_json::from_value(json).unwrap();
        assert_eq!(back, chain);
        assert!(serde_json::from_str::<Blockchain>("[]").is_err());
    }

    #[test]
    fn sync_from_longer_valid_chain() {
        let mut local = Blockchain::new();
        let remote = chain_of(2);

        assert!(local.sync_from(&remote));
        assert_eq!(local.len(), remote.len());
    }

    #[test]
    fn sync_from_equal_length_chain_ignored() {
        let mut local = chain_of(1);
        let before = local.clone();
        let remote = chain_of(1);

        assert!(!local.sync_from(&remote));
        assert_eq!(local, before);
    }

    #[test]
    fn sync_from_shorter_chain_ignored() {
        let mut local = chain_of(1);
        assert!(!local.sync_from(&Blockchain::new()));
        assert_eq!(local.len(), 2);
    }

    #[test]
    fn sync_from_invalid_longer_chain_ignored() {
        let mut local = Blockchain::new();
        let mut blocks = chain_of(2).blocks().to_vec();
        blocks[1].previous_hash = "bogus".into();
        let forged = Blockchain::from_blocks(blocks).unwrap();

        assert!(!local.sync_from(&forged));
        assert_eq!(local.len(), 1);
    }
}
