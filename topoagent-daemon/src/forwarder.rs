//! Transport queue consumer.
//!
//! The forwarder owns the receiving end of the bounded transport queue
//! filled by [`JsonSerializer`](topoagent_batcher::JsonSerializer). The
//! HTTP transport to the intake endpoint lives outside this daemon; here
//! every payload is logged and counted.
//!
//! The task ends once every sender is gone, i.e. after the batcher has
//! shut down and released its serializer, so no queued payload is lost.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use topoagent_batcher::EncodedPayload;
use topoagent_core::metrics as m;

/// Totals reported when the forwarder exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForwarderStats {
    /// Payloads drained from the queue.
    pub payloads: u64,
    /// Sum of encoded body sizes.
    pub bytes: u64,
}

/// Spawn the forwarder task draining `queue` until it closes.
pub fn spawn_forwarder(mut queue: mpsc::Receiver<EncodedPayload>) -> JoinHandle<ForwarderStats> {
    tokio::spawn(async move {
        let mut stats = ForwarderStats::default();

        while let Some(payload) = queue.recv().await {
            let size = payload.body.len() as u64;
            stats.payloads += 1;
            stats.bytes += size;

            tracing::debug!(
                batch_id = %payload.batch_id,
                agent = %payload.agent_name,
                bytes = size,
                "topology payload forwarded"
            );
            metrics::counter!(m::FORWARDER_PAYLOADS_TOTAL).increment(1);
            metrics::counter!(m::FORWARDER_BYTES_TOTAL).increment(size);
        }

        tracing::info!(
            payloads = stats.payloads,
            bytes = stats.bytes,
            "transport queue closed, forwarder stopped"
        );
        stats
    })
}
