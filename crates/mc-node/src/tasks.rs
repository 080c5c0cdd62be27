use std::time::Duration;

use mc_blockchain::Block;
use mc_transaction::Transaction;
use tokio::{sync::mpsc, time};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{AdmissionError, LedgerEvent, MiningError, Origin, SharedLedger};

/// Mine one block without holding the ledger lock during the search.
///
/// The search runs on the blocking pool and is cancelled if a peer's block or
/// chain moves the tip first.  The finished block is relayed after the lock
/// is released, so admissions and queries keep flowing while peers answer.
pub async fn mine_in_background(ledger: SharedLedger) -> Result<Block, MiningError> {
    let job = ledger.lock().await.prepare_mining()?;
    debug!(pending = job.transactions().len(), "starting proof-of-work search");

    let (job, pow) = tokio::task::spawn_blocking(move || {
        let pow = job.search();
        (job, pow)
    })
    .await
    .map_err(|e| {
        warn!("mining task failed: {e}");
        MiningError::Cancelled
    })?;
    let pow = pow.ok_or(MiningError::Cancelled)?;

    let (block, sync, peers) = {
        let mut guard = ledger.lock().await;
        let block = guard.commit_mined(job, pow)?;
        (block, guard.sync_manager().clone(), guard.peer_list())
    };

    let outcomes = sync.broadcast_block(&peers, &block).await;
    ledger.lock().await.apply_block_outcomes(outcomes);
    Ok(block)
}

/// Admit a locally submitted transfer, then relay it to every peer with the
/// ledger unlocked.  The result reflects local admission only.
pub async fn submit_and_relay(ledger: SharedLedger, tx: Transaction) -> Result<Transaction, AdmissionError> {
    let (tx, sync, peers) = {
        let mut guard = ledger.lock().await;
        let tx = guard.admit_transaction(&tx.sender, &tx.recipient, &tx.signature, tx.amount, Origin::Local)?;
        (tx, guard.sync_manager().clone(), guard.peer_list())
    };

    let outcomes = sync.broadcast_transaction(&peers, &tx).await;
    ledger.lock().await.apply_transaction_outcomes(outcomes);
    Ok(tx)
}

/// Conflict resolution with the ledger unlocked while peers are queried, so
/// this node keeps serving its own chain to peers resolving against it.
pub async fn resolve_conflicts(ledger: SharedLedger) -> bool {
    let (sync, peers) = ledger.lock().await.begin_resolution();
    let outcomes = sync.fetch_chains(&peers).await;
    ledger.lock().await.adopt_longest(outcomes)
}

/// Run conflict resolution whenever a peer has flagged the local chain as
/// diverging.  Checks every `interval` until `shutdown` fires.
pub async fn resolve_when_flagged(ledger: SharedLedger, interval: Duration, shutdown: CancellationToken) {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                let flagged = ledger.lock().await.needs_resolution();
                if flagged {
                    let replaced = resolve_conflicts(ledger.clone()).await;
                    info!(replaced, "flagged conflict resolution finished");
                }
            }
        }
    }
}

/// Drain ledger events into the log.
pub async fn log_events(mut events: mpsc::UnboundedReceiver<LedgerEvent>) {
    while let Some(event) = events.recv().await {
        match &event {
            LedgerEvent::PersistFailed(_)
            | LedgerEvent::TransactionRejected { .. }
            | LedgerEvent::BlockRejected { .. }
            | LedgerEvent::PeerMisbehaved { .. } => warn!("LedgerEvent: {event:?}"),
            _ => debug!("LedgerEvent: {event:?}"),
        }
    }
}
