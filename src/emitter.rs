//! Outgoing emitters: typed payload → JSON → host entry point.
//!
//! Delivery is one-way and unacknowledged. The [`HostSink`] decides what
//! "calling the host" means: the wasm client invokes a `window` function,
//! [`LogSink`] only reports what it would have sent.

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use crate::error::BridgeResult;
use crate::protocol::{
    entry_points, CustomEvent, DespawnRequest, EntityClicked, EntityRegistration, LocalTransform,
    OwnershipRequest, PlayVideo, SpawnRequest,
};

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// The foreign-function boundary towards the host.
pub trait HostSink {
    fn invoke(&self, entry_point: &str, json: &str);
}

/// Sink used outside the browser runtime: logs and drops.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl HostSink for LogSink {
    fn invoke(&self, entry_point: &str, json: &str) {
        log::info!("[emit] (no host) {} {}", entry_point, json);
    }
}

/// A single recorded host call.
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub entry_point: String,
    pub json: String,
}

impl SentMessage {
    pub fn payload(&self) -> serde_json::Value {
        serde_json::from_str(&self.json).unwrap_or(serde_json::Value::Null)
    }
}

/// Sink that records every call in order. Cloning shares the record.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    sent: Rc<RefCell<Vec<SentMessage>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.borrow().clone()
    }

    pub fn sent_to(&self, entry_point: &str) -> Vec<SentMessage> {
        self.sent
            .borrow()
            .iter()
            .filter(|m| m.entry_point == entry_point)
            .cloned()
            .collect()
    }

    pub fn count(&self, entry_point: &str) -> usize {
        self.sent
            .borrow()
            .iter()
            .filter(|m| m.entry_point == entry_point)
            .count()
    }

    /// Remove and return everything recorded so far.
    pub fn take(&self) -> Vec<SentMessage> {
        std::mem::take(&mut *self.sent.borrow_mut())
    }
}

impl HostSink for MemorySink {
    fn invoke(&self, entry_point: &str, json: &str) {
        self.sent.borrow_mut().push(SentMessage {
            entry_point: entry_point.to_string(),
            json: json.to_string(),
        });
    }
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// One method per outbound message type. Cheap to clone.
#[derive(Clone)]
pub struct Emitter {
    sink: Rc<dyn HostSink>,
}

impl Emitter {
    pub fn new(sink: Rc<dyn HostSink>) -> Self {
        Self { sink }
    }

    /// Emitter backed by [`LogSink`].
    pub fn logging() -> Self {
        Self::new(Rc::new(LogSink))
    }

    /// Serialize `payload` and call `entry_point`.
    pub fn emit<T: Serialize>(&self, entry_point: &str, payload: &T) -> BridgeResult<()> {
        let json = serde_json::to_string(payload)?;
        log::trace!("[emit] {} {}", entry_point, json);
        self.sink.invoke(entry_point, &json);
        Ok(())
    }

    pub fn send_local_transform(&self, msg: &LocalTransform) -> BridgeResult<()> {
        self.emit(entry_points::SEND_LOCAL_TRANSFORM, msg)
    }

    pub fn request_spawn(&self, msg: &SpawnRequest) -> BridgeResult<()> {
        self.emit(entry_points::REQUEST_SPAWN, msg)
    }

    pub fn request_despawn(&self, msg: &DespawnRequest) -> BridgeResult<()> {
        self.emit(entry_points::REQUEST_DESPAWN, msg)
    }

    pub fn request_ownership(&self, msg: &OwnershipRequest) -> BridgeResult<()> {
        self.emit(entry_points::REQUEST_OWNERSHIP, msg)
    }

    pub fn send_custom_event(&self, msg: &CustomEvent) -> BridgeResult<()> {
        self.emit(entry_points::SEND_CUSTOM_EVENT, msg)
    }

    /// Plain click; `entry_point` comes from the entity kind's profile.
    pub fn entity_clicked(&self, entry_point: &str, msg: &EntityClicked) -> BridgeResult<()> {
        self.emit(entry_point, msg)
    }

    pub fn play_video(&self, entry_point: &str, msg: &PlayVideo) -> BridgeResult<()> {
        self.emit(entry_point, msg)
    }

    pub fn register_entity(&self, entry_point: &str, msg: &EntityRegistration) -> BridgeResult<()> {
        self.emit(entry_point, msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Quat, Vec3};

    #[test]
    fn memory_sink_records_in_order() {
        let sink = MemorySink::new();
        let emitter = Emitter::new(Rc::new(sink.clone()));

        emitter
            .request_despawn(&DespawnRequest {
                object_id: "o1".into(),
            })
            .unwrap();
        emitter
            .send_local_transform(&LocalTransform {
                actor_id: "me".into(),
                position: Vec3::new(1.0, 2.0, 3.0),
                rotation: Quat::identity(),
            })
            .unwrap();

        let sent = sink.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].entry_point, entry_points::REQUEST_DESPAWN);
        assert_eq!(sent[0].payload()["objectId"], "o1");
        assert_eq!(sent[1].payload()["position"]["y"], 2.0);
    }

    #[test]
    fn take_drains_record() {
        let sink = MemorySink::new();
        sink.invoke("A", "{}");
        assert_eq!(sink.take().len(), 1);
        assert!(sink.sent().is_empty());
    }
}
