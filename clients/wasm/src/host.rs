//! `HostSink` that calls global functions on `window`.
//!
//! An outbound message for entry point `OnPortalClicked` becomes
//! `window.OnPortalClicked(json)`. Missing functions are logged once per
//! entry point and otherwise ignored.
//!
//! Calls are queued as microtasks instead of made inline: the message is
//! produced while `SpacesClient` is borrowed, and a host handler that feeds
//! an event straight back into `handleEvent` would otherwise hit
//! wasm-bindgen's recursive-borrow guard. Queued calls keep their order.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use spaces_bridge::HostSink;
use wasm_bindgen::{JsCast, JsValue};

#[derive(Default)]
pub struct WindowHostSink {
    missing: Rc<RefCell<HashSet<String>>>,
}

impl WindowHostSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lookup(entry_point: &str) -> Option<js_sys::Function> {
        let window = web_sys::window()?;
        js_sys::Reflect::get(&window, &JsValue::from_str(entry_point))
            .ok()?
            .dyn_into::<js_sys::Function>()
            .ok()
    }

    fn call(missing: &RefCell<HashSet<String>>, entry_point: &str, json: &str) {
        let Some(func) = Self::lookup(entry_point) else {
            if missing.borrow_mut().insert(entry_point.to_string()) {
                log::warn!("[host] window.{} is not a function; dropping", entry_point);
            }
            return;
        };
        if let Err(e) = func.call1(&JsValue::NULL, &JsValue::from_str(json)) {
            log::warn!("[host] window.{} threw: {:?}", entry_point, e);
        }
    }
}

impl HostSink for WindowHostSink {
    fn invoke(&self, entry_point: &str, json: &str) {
        let missing = self.missing.clone();
        let entry_point = entry_point.to_string();
        let json = json.to_string();
        wasm_bindgen_futures::spawn_local(async move {
            Self::call(&missing, &entry_point, &json);
        });
    }
}
