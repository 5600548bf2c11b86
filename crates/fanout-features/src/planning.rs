use std::collections::HashMap;
use std::time::Duration;

use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::time::{delay_queue, DelayQueue};
use tracing::{debug, warn};

/// How long an item stays locked before it expires on its own.
const LOCK_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Action {
    Lock,
    Unlock,
    Update,
}

#[derive(Debug, Deserialize)]
struct PlanningPayload {
    action: Action,
    item_id: String,
}

/// A trivial in-memory, TTL-based item lock, matching the pattern the
/// planning handler illustrates upstream: scoped acquisition with an
/// expiry sweep. The sweep is event-driven (a [`DelayQueue`]) rather than a
/// fixed-interval scan, so it doesn't degrade as the number of locked items
/// grows.
///
/// Not part of the fan-out core: this is a feature collaborator invoked
/// after broadcast, side-effect only.
#[derive(Clone)]
pub struct PlanningHandler {
    cmd_tx: mpsc::UnboundedSender<Command>,
}

enum Command {
    Lock { item_id: String, user_id: String },
    Unlock { item_id: String, user_id: String },
}

struct LockEntry {
    user_id: String,
    expiry_key: delay_queue::Key,
}

impl PlanningHandler {
    pub fn new() -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        tokio::spawn(run(cmd_rx));
        Self { cmd_tx }
    }

    /// Processes a `planning` frame's payload: parses the action and
    /// forwards lock/unlock requests to the sweeper task. `update` actions
    /// carry no lock-ownership check in this core (see the module notes
    /// upstream about validating ownership before allowing an update); they
    /// are only logged here.
    pub fn process(&self, user_id: &str, payload: &serde_json::Value) {
        let parsed: PlanningPayload = match serde_json::from_value(payload.clone()) {
            Ok(p) => p,
            Err(err) => {
                warn!(error = %err, "planning payload did not match the expected shape");
                return;
            }
        };

        match parsed.action {
            Action::Lock => {
                let _ = self.cmd_tx.send(Command::Lock {
                    item_id: parsed.item_id,
                    user_id: user_id.to_owned(),
                });
            }
            Action::Unlock => {
                let _ = self.cmd_tx.send(Command::Unlock {
                    item_id: parsed.item_id,
                    user_id: user_id.to_owned(),
                });
            }
            Action::Update => {
                debug!(item = %parsed.item_id, user = %user_id, "planning update");
            }
        }
    }
}

impl Default for PlanningHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// The sweeper task: owns the lock map and the expiry queue exclusively, so
/// (like the hub's reconciliation task) lock acquisition, release, and
/// expiry never race each other.
async fn run(mut cmd_rx: mpsc::UnboundedReceiver<Command>) {
    let mut locks: HashMap<String, LockEntry> = HashMap::new();
    let mut expirations: DelayQueue<String> = DelayQueue::new();

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(Command::Lock { item_id, user_id }) => {
                        lock_item(&mut locks, &mut expirations, item_id, user_id);
                    }
                    Some(Command::Unlock { item_id, user_id }) => {
                        unlock_item(&mut locks, &mut expirations, &item_id, &user_id);
                    }
                    None => break,
                }
            }
            maybe_expired = expirations.next(), if !expirations.is_empty() => {
                if let Some(Ok(expired)) = maybe_expired {
                    let item_id = expired.into_inner();
                    if let Some(entry) = locks.remove(&item_id) {
                        debug!(item = %item_id, user = %entry.user_id, "lock expired");
                    }
                }
            }
        }
    }
}

fn lock_item(
    locks: &mut HashMap<String, LockEntry>,
    expirations: &mut DelayQueue<String>,
    item_id: String,
    user_id: String,
) {
    if let Some(existing) = locks.get(&item_id) {
        if existing.user_id != user_id {
            debug!(item = %item_id, holder = %existing.user_id, "item already locked by another user");
            return;
        }
        // Same holder re-locking: refresh the expiry.
        expirations.reset(&existing.expiry_key, LOCK_TTL);
        return;
    }

    let expiry_key = expirations.insert(item_id.clone(), LOCK_TTL);
    debug!(item = %item_id, user = %user_id, "item locked");
    locks.insert(item_id, LockEntry { user_id, expiry_key });
}

fn unlock_item(
    locks: &mut HashMap<String, LockEntry>,
    expirations: &mut DelayQueue<String>,
    item_id: &str,
    user_id: &str,
) {
    let Some(entry) = locks.get(item_id) else {
        return;
    };
    if entry.user_id != user_id {
        return;
    }
    let entry = locks.remove(item_id).expect("checked above");
    expirations.remove(&entry.expiry_key);
    debug!(item = %item_id, user = %user_id, "item unlocked");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn lock_unlock_roundtrip_does_not_panic() {
        let handler = PlanningHandler::new();
        handler.process("u1", &json!({"action": "lock", "item_id": "i1"}));
        handler.process("u1", &json!({"action": "unlock", "item_id": "i1"}));
        // Give the sweeper task a chance to run; nothing to assert on
        // externally since this collaborator is side-effect only.
        tokio::task::yield_now().await;
    }

    #[tokio::test]
    async fn update_action_is_accepted() {
        let handler = PlanningHandler::new();
        handler.process("u1", &json!({"action": "update", "item_id": "i1", "data": {}}));
    }

    #[tokio::test]
    async fn malformed_payload_is_ignored() {
        let handler = PlanningHandler::new();
        handler.process("u1", &json!({"action": "teleport", "item_id": "i1"}));
    }
}
