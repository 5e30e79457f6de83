//! Incoming event registry: host messages → handlers.
//!
//! ## Pipeline
//!
//! ```text
//! handle_event(message)
//!   ├─ parse envelope {eventName, data}       (or bare payload → fallback)
//!   ├─ unwrap data (object | string | doubly-encoded string)
//!   └─ process_event(name, payload)
//!        └─ handler(payload)                    (typed: serde → T → f(T))
//! ```
//!
//! Every stage is guarded separately. A failure is logged and the message is
//! dropped; nothing propagates back to the host and nothing is retried.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{BridgeError, BridgeResult};
use crate::protocol::HostEnvelope;
use crate::types::IngressConfig;

/// A raw handler: receives the payload JSON exactly as delivered.
pub type Handler = Box<dyn FnMut(&str) -> BridgeResult<()>>;

/// What happened to a single dispatched event.
///
/// Purely informational; the host is never told.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A handler ran and returned `Ok`.
    Delivered,
    /// No handler is registered for the event name.
    Unhandled,
    /// The envelope, payload or handler failed; the event was dropped.
    Failed,
}

/// Name → handler dispatch table. One handler per name; last one wins.
pub struct EventRegistry {
    handlers: HashMap<String, Handler>,
    config: IngressConfig,
}

impl Default for EventRegistry {
    fn default() -> Self {
        Self::new(IngressConfig::default())
    }
}

impl EventRegistry {
    pub fn new(config: IngressConfig) -> Self {
        Self {
            handlers: HashMap::new(),
            config,
        }
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    pub fn register_handler<F>(&mut self, event_name: &str, handler: F)
    where
        F: FnMut(&str) -> BridgeResult<()> + 'static,
    {
        if self
            .handlers
            .insert(event_name.to_string(), Box::new(handler))
            .is_some()
        {
            log::warn!(
                "[registry] Handler for '{}' replaced by a newer registration",
                event_name
            );
        }
    }

    /// Register a handler that receives the payload deserialized as `T`.
    pub fn register_typed<T, F>(&mut self, event_name: &str, mut handler: F)
    where
        T: DeserializeOwned,
        F: FnMut(T) -> BridgeResult<()> + 'static,
    {
        let name = event_name.to_string();
        self.register_handler(event_name, move |payload| {
            let value: T = serde_json::from_str(payload).map_err(|source| BridgeError::Payload {
                event: name.clone(),
                source,
            })?;
            handler(value)
        });
    }

    pub fn unregister_handler(&mut self, event_name: &str) -> bool {
        self.handlers.remove(event_name).is_some()
    }

    pub fn is_registered(&self, event_name: &str) -> bool {
        self.handlers.contains_key(event_name)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Drop every handler (called on shutdown).
    pub fn clear(&mut self) {
        self.handlers.clear();
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    /// Invoke the handler for `event_name` with the raw payload.
    pub fn process_event(&mut self, event_name: &str, payload: &str) -> DispatchOutcome {
        let Some(handler) = self.handlers.get_mut(event_name) else {
            log::warn!("[registry] No handler for event '{}': dropped", event_name);
            return DispatchOutcome::Unhandled;
        };

        match handler(payload) {
            Ok(()) => DispatchOutcome::Delivered,
            Err(e) => {
                log::warn!("[registry] {}: event '{}' dropped", e, event_name);
                DispatchOutcome::Failed
            }
        }
    }

    /// Top-level ingress for a message delivered by the host.
    pub fn handle_event(&mut self, message: &str) -> DispatchOutcome {
        match self.route(message) {
            Ok(Some((name, payload))) => self.process_event(&name, &payload),
            Ok(None) => DispatchOutcome::Unhandled,
            Err(e) => {
                log::warn!("[registry] {}: message dropped", e);
                DispatchOutcome::Failed
            }
        }
    }

    /// Resolve a host message into `(event_name, payload_json)`.
    ///
    /// `Ok(None)` means a bare payload arrived and no fallback is configured.
    fn route(&self, message: &str) -> BridgeResult<Option<(String, String)>> {
        let mut value: Value = serde_json::from_str(message)
            .map_err(|e| BridgeError::MalformedEnvelope(e.to_string()))?;

        // The whole message may itself arrive as an encoded string.
        if let Value::String(inner) = &value {
            value = serde_json::from_str(inner)
                .map_err(|e| BridgeError::MalformedEnvelope(e.to_string()))?;
        }

        let is_envelope = value
            .get("eventName")
            .map(|n| n.is_string())
            .unwrap_or(false);

        if is_envelope {
            let envelope: HostEnvelope = serde_json::from_value(value)
                .map_err(|e| BridgeError::MalformedEnvelope(e.to_string()))?;
            let payload = unwrap_data(envelope.data)?;
            return Ok(Some((envelope.event_name, payload)));
        }

        match &self.config.bare_payload_event {
            Some(fallback) => {
                log::debug!("[registry] Bare payload routed to '{}'", fallback);
                Ok(Some((fallback.clone(), value.to_string())))
            }
            None => {
                log::warn!("[registry] Bare payload without eventName: dropped");
                Ok(None)
            }
        }
    }
}

/// Turn envelope `data` into a payload JSON string.
///
/// - object / array / scalar → serialized as-is
/// - string holding JSON → used directly
/// - string holding a JSON *string* (double-encoded) → unescaped once
fn unwrap_data(data: Value) -> BridgeResult<String> {
    match data {
        Value::String(s) => {
            let trimmed = s.trim_start();
            if trimmed.starts_with('"') {
                let unescaped: String = serde_json::from_str(trimmed)
                    .map_err(|e| BridgeError::MalformedEnvelope(format!("unescape: {}", e)))?;
                Ok(unescaped)
            } else {
                Ok(s)
            }
        }
        Value::Null => Ok("{}".to_string()),
        other => Ok(other.to_string()),
    }
}
