use futures::StreamExt;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::Message;
use tracing::{error, info, warn};

use reconciler_core::{OrderCreated, Reconciliation, ReconciliationEngine};

use crate::store::PgStore;

/// Consumes order-created events and runs each through the engine.
///
/// Offsets are committed only after the engine reaches a verdict. An
/// infrastructure error leaves the offset in place so the broker redelivers
/// the event; redelivery is safe because reconciliation is idempotent.
pub struct OrderEventHandler {
    engine: ReconciliationEngine<PgStore>,
}

impl OrderEventHandler {
    pub fn new(engine: ReconciliationEngine<PgStore>) -> Self {
        Self { engine }
    }

    pub async fn run(&self, consumer: StreamConsumer) {
        let mut message_stream = consumer.stream();

        while let Some(message) = message_stream.next().await {
            match message {
                Ok(m) => {
                    let commit = match m.payload_view::<str>() {
                        Some(Ok(json_str)) => self.handle_payload(json_str).await,
                        Some(Err(e)) => {
                            error!("error parsing payload: {}", e);
                            true
                        }
                        None => {
                            warn!("event with empty payload, skipping");
                            true
                        }
                    };
                    if commit {
                        if let Err(e) = consumer.commit_message(&m, CommitMode::Async) {
                            error!("error committing message: {}", e);
                        }
                    }
                }
                Err(e) => error!("error receiving message: {}", e),
            }
        }
    }

    /// Returns whether the offset may be committed.
    async fn handle_payload(&self, payload: &str) -> bool {
        let trigger = match serde_json::from_str::<OrderCreated>(payload) {
            Ok(trigger) => trigger,
            Err(e) => {
                // Redelivery cannot fix a payload that does not decode.
                warn!("undecodable order-created event, skipping: {}", e);
                return true;
            }
        };

        match self.engine.reconcile(&trigger).await {
            Ok(Reconciliation::Finalized(report)) => {
                info!(order_id = %report.order_id, status = ?report.status, "order reconciled");
                true
            }
            Ok(Reconciliation::AlreadyFinalized(status)) => {
                info!(order_id = %trigger.order_id, status = ?status, "duplicate delivery for finalized order");
                true
            }
            Err(e) => {
                error!(order_id = %trigger.order_id, "reconciliation failed, leaving offset for redelivery: {}", e);
                false
            }
        }
    }
}
