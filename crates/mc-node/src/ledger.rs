use std::{collections::BTreeSet, sync::Arc};

use mc_blockchain::{proof_of_work, Block, Blockchain, ProofOfWork, Verification, MINING_REWARD};
use mc_sync::{transport::STATUS_CONFLICT, Delivery, PeerOutcome, SyncError, SyncManager};
use mc_transaction::{SignatureVerifier, Transaction};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    error::{AdmissionError, BlockRejection, MiningError, NodeError},
    event::LedgerEvent,
    mempool::Mempool,
    store::{NodeSnapshot, SnapshotStore},
};

/// A ledger shared between the HTTP API and background tasks.
pub type SharedLedger = Arc<Mutex<Ledger>>;

/// Where a submitted transaction came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Submitted on this node; relayed to every peer after admission.
    Local,
    /// Relayed to us by a peer; not relayed again.
    Relay,
}

/// How a block pushed by a peer was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockReception {
    /// The block extended the local chain.
    Added,
    /// The block is for the next height but failed validation.
    Rejected(BlockRejection),
    /// The block is further ahead than our tip; conflict resolution is due.
    Behind,
    /// The block is at or below our tip; the sender is behind us.
    Stale,
}

/// Inputs of a proof-of-work search, captured so the search can run without
/// holding the ledger.
#[derive(Debug, Clone)]
pub struct MiningJob {
    miner: String,
    last_hash: String,
    transactions: Vec<Transaction>,
    cancel: CancellationToken,
}

impl MiningJob {
    /// Run the search.  `None` when the ledger's tip moved in the meantime.
    pub fn search(&self) -> Option<ProofOfWork> {
        proof_of_work(&self.transactions, &self.last_hash, &self.cancel)
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }
}

/// One node's view of the ledger: the chain, the mempool and the peer set.
///
/// All three are owned here and only change through the operations below.
/// Every change is followed by a save through the [`SnapshotStore`]; a save
/// failure is logged and reported as [`LedgerEvent::PersistFailed`] but the
/// in-memory change stands.
pub struct Ledger {
    chain: Blockchain,
    mempool: Mempool,
    peers: BTreeSet<String>,
    /// Identity credited with mining rewards and required for submissions.
    hosting_node: Option<String>,
    /// Set when a peer signals a diverging chain; cleared by [`Ledger::resolve`].
    needs_resolution: bool,
    verifier: Arc<dyn SignatureVerifier>,
    sync: SyncManager,
    store: Box<dyn SnapshotStore>,
    event_tx: mpsc::UnboundedSender<LedgerEvent>,
    /// Cancelled and replaced whenever the tip changes under a running search.
    mining_cancel: CancellationToken,
}

impl Ledger {
    /// Create a ledger holding only the genesis block.  Call [`Ledger::load`]
    /// to pick up a previous run's state.
    ///
    /// Returns the ledger together with a receiver for [`LedgerEvent`]s.
    pub fn new(
        hosting_node: Option<String>,
        verifier: Arc<dyn SignatureVerifier>,
        sync: SyncManager,
        store: Box<dyn SnapshotStore>,
    ) -> (Self, mpsc::UnboundedReceiver<LedgerEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let ledger = Self {
            chain: Blockchain::new(),
            mempool: Mempool::new(),
            peers: BTreeSet::new(),
            hosting_node,
            needs_resolution: false,
            verifier,
            sync,
            store,
            event_tx,
            mining_cancel: CancellationToken::new(),
        };
        (ledger, event_rx)
    }

    // ── Persistence ──────────────────────────────────────────────────────────

    /// Replace in-memory state with the stored snapshot.
    ///
    /// Missing, unreadable or invalid state is not an error: the ledger keeps
    /// its genesis-only chain and empty mempool and peer set.  Returns whether
    /// a snapshot was applied.
    pub fn load(&mut self) -> bool {
        match self.store.load() {
            Ok(Some(snapshot)) if snapshot.chain.is_valid() => {
                info!(
                    length = snapshot.chain.len(),
                    pending = snapshot.open_transactions.len(),
                    peers = snapshot.peers.len(),
                    "loaded ledger state"
                );
                self.chain = snapshot.chain;
                self.mempool = Mempool::from(snapshot.open_transactions);
                self.peers = snapshot.peers;
                true
            }
            Ok(Some(_)) => {
                warn!("stored chain failed validation; starting from genesis");
                false
            }
            Ok(None) => {
                info!("no stored ledger state; starting from genesis");
                false
            }
            Err(e) => {
                warn!("could not load ledger state ({e}); starting from genesis");
                false
            }
        }
    }

    /// Current state as one persistable unit.
    pub fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot {
            chain: self.chain.clone(),
            open_transactions: self.mempool.transactions().to_vec(),
            peers: self.peers.clone(),
        }
    }

    pub fn save(&self) -> Result<(), NodeError> {
        self.store.save(&self.snapshot())
    }

    fn persist(&self) {
        if let Err(e) = self.save() {
            warn!("failed to persist ledger state: {e}");
            self.emit(LedgerEvent::PersistFailed(e.to_string()));
        }
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn chain(&self) -> &Blockchain {
        &self.chain
    }

    pub fn last_block(&self) -> &Block {
        self.chain.tip()
    }

    pub fn open_transactions(&self) -> &[Transaction] {
        self.mempool.transactions()
    }

    pub fn hosting_node(&self) -> Option<&str> {
        self.hosting_node.as_deref()
    }

    pub fn needs_resolution(&self) -> bool {
        self.needs_resolution
    }

    pub fn sync_manager(&self) -> &SyncManager {
        &self.sync
    }

    // ── Peers ────────────────────────────────────────────────────────────────

    pub fn peers(&self) -> &BTreeSet<String> {
        &self.peers
    }

    pub fn peer_list(&self) -> Vec<String> {
        self.peers.iter().cloned().collect()
    }

    /// Returns `false` if the peer was already known.
    pub fn add_peer(&mut self, peer: impl Into<String>) -> bool {
        let added = self.peers.insert(peer.into());
        if added {
            self.persist();
        }
        added
    }

    /// Returns `false` if the peer was not known.
    pub fn remove_peer(&mut self, peer: &str) -> bool {
        let removed = self.peers.remove(peer);
        if removed {
            self.persist();
        }
        removed
    }

    // ── Balances ─────────────────────────────────────────────────────────────

    /// Balance of `participant`, defaulting to the hosting node.  `None` when
    /// neither is available.
    pub fn balance(&self, participant: Option<&str>) -> Option<f64> {
        let participant = participant.or(self.hosting_node.as_deref())?;
        Some(self.balance_of(participant))
    }

    /// Committed receipts minus committed and pending spending.  Pending
    /// receipts do not count, so funds already promised in the mempool
    /// cannot be promised again.
    fn balance_of(&self, participant: &str) -> f64 {
        let mut received = 0.0;
        let mut sent = self.mempool.pending_outgoing(participant);
        for tx in self.chain.blocks().iter().flat_map(|b| &b.transactions) {
            if tx.recipient == participant {
                received += tx.amount;
            }
            if tx.sender == participant {
                sent += tx.amount;
            }
        }
        received - sent
    }

    // ── Admission ────────────────────────────────────────────────────────────

    /// Admit a signed transfer into the mempool.
    ///
    /// The result reflects local admission only.  For [`Origin::Local`]
    /// submissions the transaction is then relayed to every peer; peers that
    /// refuse it or cannot be reached are reported on the event channel.
    ///
    /// The relay runs while `self` is borrowed.  Services sharing the ledger
    /// should use [`crate::tasks::submit_and_relay`] instead.
    pub async fn submit_transaction(
        &mut self,
        sender: &str,
        recipient: &str,
        signature: &str,
        amount: f64,
        origin: Origin,
    ) -> Result<Transaction, AdmissionError> {
        let tx = self.admit_transaction(sender, recipient, signature, amount, origin)?;
        if origin == Origin::Local {
            let outcomes = self.sync.broadcast_transaction(&self.peer_list(), &tx).await;
            self.apply_transaction_outcomes(outcomes);
        }
        Ok(tx)
    }

    /// The local half of [`Ledger::submit_transaction`]: validate and push
    /// onto the mempool, without talking to peers.
    pub fn admit_transaction(
        &mut self,
        sender: &str,
        recipient: &str,
        signature: &str,
        amount: f64,
        origin: Origin,
    ) -> Result<Transaction, AdmissionError> {
        if self.hosting_node.is_none() {
            return Err(AdmissionError::NoHostingNode);
        }
        if !(amount >= 0.0) {
            return Err(AdmissionError::InvalidAmount(amount));
        }

        let tx = Transaction::new(sender, recipient, signature, amount);
        let balance = self.balance_of(sender);
        if balance < amount {
            debug!(sender, balance, amount, "rejecting transaction: insufficient funds");
            return Err(AdmissionError::InsufficientFunds { balance, amount });
        }
        // Funds already checked above.
        if !Verification::verify_transaction(
            &tx,
            |p| self.balance_of(p),
            false,
            self.verifier.as_ref(),
        ) {
            debug!(sender, "rejecting transaction: bad signature");
            return Err(AdmissionError::InvalidSignature);
        }

        self.mempool.push(tx.clone());
        self.persist();
        info!(sender, recipient, amount, ?origin, "transaction admitted");
        self.emit(LedgerEvent::TransactionAdmitted(tx.clone()));
        Ok(tx)
    }

    /// Record how peers answered a transaction relay.
    pub fn apply_transaction_outcomes(&self, outcomes: Vec<PeerOutcome<Delivery>>) {
        for PeerOutcome { peer, result } in outcomes {
            match result {
                Ok(Delivery::Accepted) => debug!(peer = %peer, "peer accepted transaction"),
                Ok(Delivery::Conflict) => self.transaction_refused(peer, STATUS_CONFLICT),
                Ok(Delivery::Rejected(status)) => self.transaction_refused(peer, status),
                Err(e) => self.peer_failed(peer, &e),
            }
        }
    }

    fn transaction_refused(&self, peer: String, status: u16) {
        warn!(peer = %peer, status, "peer refused relayed transaction");
        self.emit(LedgerEvent::TransactionRejected { peer, status });
    }

    // ── Mining ───────────────────────────────────────────────────────────────

    /// Proof-of-work over the current mempool and tip.  `None` if the tip
    /// changes while searching.
    pub fn proof_of_work(&self) -> Option<ProofOfWork> {
        proof_of_work(
            self.mempool.transactions(),
            &self.chain.tip_digest(),
            &self.mining_cancel,
        )
    }

    /// Mine a block over the whole mempool, append it, and relay it.
    ///
    /// Runs the search inline; services that must stay responsive should use
    /// [`Ledger::prepare_mining`] and [`Ledger::commit_mined`] instead (see
    /// [`crate::tasks::mine_in_background`]).
    pub async fn mine_block(&mut self) -> Result<Block, MiningError> {
        let job = self.prepare_mining()?;
        let pow = job.search().ok_or(MiningError::Cancelled)?;
        let block = self.commit_mined(job, pow)?;
        self.propagate_block(&block).await;
        Ok(block)
    }

    /// Capture what a proof-of-work search needs.
    pub fn prepare_mining(&self) -> Result<MiningJob, MiningError> {
        let miner = self.hosting_node.clone().ok_or(MiningError::NoHostingNode)?;
        Ok(MiningJob {
            miner,
            last_hash: self.chain.tip_digest(),
            transactions: self.mempool.transactions().to_vec(),
            cancel: self.mining_cancel.clone(),
        })
    }

    /// Turn a finished search into a block on the local chain.
    ///
    /// Fails with [`MiningError::Stale`] if the tip or mempool changed since
    /// [`Ledger::prepare_mining`], and with
    /// [`MiningError::InvalidPendingTransaction`] if any pending signature no
    /// longer verifies.  Neither failure changes any state.
    pub fn commit_mined(&mut self, job: MiningJob, pow: ProofOfWork) -> Result<Block, MiningError> {
        if job.last_hash != self.chain.tip_digest() || job.transactions != self.mempool.transactions() {
            return Err(MiningError::Stale);
        }
        if !Verification::verify_transactions(
            &job.transactions,
            |p| self.balance_of(p),
            self.verifier.as_ref(),
        ) {
            warn!("pending transaction failed signature check; mining aborted");
            return Err(MiningError::InvalidPendingTransaction);
        }

        let mut transactions = job.transactions;
        transactions.push(Transaction::reward(job.miner, MINING_REWARD));
        let block = Block::new(self.chain.len() as u64, job.last_hash, transactions, pow.proof);

        self.chain
            .push(block.clone())
            .map_err(|_| MiningError::Stale)?;
        self.mempool.clear();
        self.persist();

        info!(
            index = block.index,
            proof = pow.proof,
            attempts = pow.attempts,
            elapsed_ms = pow.elapsed.as_millis() as u64,
            "mined block"
        );
        self.emit(LedgerEvent::BlockMined(block.clone()));
        Ok(block)
    }

    /// Relay a freshly mined block to every peer.
    pub async fn propagate_block(&mut self, block: &Block) {
        let outcomes = self.sync.broadcast_block(&self.peer_list(), block).await;
        self.apply_block_outcomes(outcomes);
    }

    /// Record how peers answered a block relay.  A conflict answer marks the
    /// ledger as needing resolution.
    pub fn apply_block_outcomes(&mut self, outcomes: Vec<PeerOutcome<Delivery>>) {
        for PeerOutcome { peer, result } in outcomes {
            match result {
                Ok(Delivery::Accepted) => debug!(peer = %peer, "peer accepted block"),
                Ok(Delivery::Conflict) => {
                    info!(peer = %peer, "peer reports diverging chain; resolution needed");
                    self.needs_resolution = true;
                    self.emit(LedgerEvent::ResolutionRequested { peer });
                }
                Ok(Delivery::Rejected(status)) => {
                    warn!(peer = %peer, status, "peer refused block");
                    self.emit(LedgerEvent::BlockRejected { peer, status });
                }
                Err(e) => self.peer_failed(peer, &e),
            }
        }
    }

    fn interrupt_mining(&mut self) {
        self.mining_cancel.cancel();
        self.mining_cancel = CancellationToken::new();
    }

    // ── Foreign blocks ───────────────────────────────────────────────────────

    /// Append a block mined elsewhere.
    ///
    /// The proof is checked over all but the last transaction and the block
    /// must link to the local tip.  Pending entries the block commits are
    /// dropped from the mempool.
    pub fn add_block(&mut self, block: Block) -> Result<(), BlockRejection> {
        if !Verification::valid_proof(block.proof_transactions(), &block.previous_hash, block.proof) {
            return Err(BlockRejection::InvalidProof);
        }
        if block.previous_hash != self.chain.tip_digest() {
            return Err(BlockRejection::PreviousHashMismatch);
        }
        let expected = self.chain.tip().index + 1;
        if block.index != expected {
            return Err(BlockRejection::IndexMismatch {
                expected,
                found: block.index,
            });
        }

        let index = block.index;
        self.chain
            .push(block)
            .map_err(|_| BlockRejection::PreviousHashMismatch)?;
        let removed = self.mempool.remove_committed(&self.chain.tip().transactions);
        self.interrupt_mining();
        self.persist();

        info!(index, removed_pending = removed, "accepted block from peer");
        self.emit(LedgerEvent::BlockAccepted { index });
        Ok(())
    }

    /// Dispatch a block pushed by a peer by its height relative to our tip.
    pub fn receive_block(&mut self, block: Block) -> BlockReception {
        let next = self.chain.tip().index + 1;
        if block.index == next {
            match self.add_block(block) {
                Ok(()) => BlockReception::Added,
                Err(reason) => {
                    debug!(%reason, "rejected pushed block");
                    BlockReception::Rejected(reason)
                }
            }
        } else if block.index > next {
            info!(index = block.index, tip = next - 1, "peer is ahead; resolution needed");
            self.needs_resolution = true;
            BlockReception::Behind
        } else {
            BlockReception::Stale
        }
    }

    // ── Conflict resolution ──────────────────────────────────────────────────

    /// Adopt the longest valid chain among the local one and every peer's.
    ///
    /// Returns whether the local chain was replaced.  Unreachable peers are
    /// skipped.  The fetch runs while `self` is borrowed; services sharing
    /// the ledger should use [`crate::tasks::resolve_conflicts`] instead.
    pub async fn resolve(&mut self) -> bool {
        let (sync, peers) = self.begin_resolution();
        let outcomes = sync.fetch_chains(&peers).await;
        self.adopt_longest(outcomes)
    }

    /// Clear the resolution flag and capture what a chain fetch needs.
    pub fn begin_resolution(&mut self) -> (SyncManager, Vec<String>) {
        self.needs_resolution = false;
        (self.sync.clone(), self.peer_list())
    }

    /// The decision half of [`Ledger::resolve`], for chains already fetched.
    pub fn adopt_longest(&mut self, outcomes: Vec<PeerOutcome<Blockchain>>) -> bool {
        let mut longest = self.chain.clone();
        let mut replaced = false;
        let all_failed = !outcomes.is_empty() && outcomes.iter().all(|o| o.result.is_err());

        for PeerOutcome { peer, result } in outcomes {
            match result {
                Ok(remote) => {
                    if longest.sync_from(&remote) {
                        debug!(peer = %peer, length = remote.len(), "peer chain is the longest so far");
                        replaced = true;
                    }
                }
                Err(e) => self.peer_failed(peer, &e),
            }
        }

        if replaced {
            self.chain = longest;
            self.mempool.clear();
            self.interrupt_mining();
            self.persist();
            let new_length = self.chain.len();
            info!(new_length, "replaced local chain");
            self.emit(LedgerEvent::ChainReplaced { new_length });
        }
        if all_failed {
            // No peer answered; try again on the next pass.
            self.needs_resolution = true;
        }
        replaced
    }

    // ── Internal helpers ─────────────────────────────────────────────────────

    fn peer_failed(&self, peer: String, err: &SyncError) {
        let reason = err.to_string();
        if err.is_unreachable() {
            debug!(peer = %peer, "skipping peer: {reason}");
            self.emit(LedgerEvent::PeerUnreachable { peer, reason });
        } else {
            warn!(peer = %peer, "skipping peer: {reason}");
            self.emit(LedgerEvent::PeerMisbehaved { peer, reason });
        }
    }

    fn emit(&self, event: LedgerEvent) {
        let _ = self.event_tx.send(event);
    }
}
