//! Browser texture loading and task spawning.
//!
//! Textures are fetched with `fetch()` (request headers and an optional
//! timeout honoured), turned into a `Blob` and exposed to the page as an
//! object URL (revoked by `JsRenderLayer`). Dropping the load future aborts
//! the HTTP request, so an entity that starts a new load cancels the old one
//! on the wire too.

use std::time::Duration;

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use spaces_bridge::{
    loader::{TaskSpawner, Texture, TextureRequest, TextureSource},
    BridgeError, BridgeResult,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{AbortController, Blob, Headers, Request, RequestInit, Response, Url};

// ---------------------------------------------------------------------------
// Spawner
// ---------------------------------------------------------------------------

/// Runs load tasks on the browser microtask queue.
#[derive(Debug, Default, Clone, Copy)]
pub struct WasmSpawner;

impl TaskSpawner for WasmSpawner {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        wasm_bindgen_futures::spawn_local(task);
    }
}

// ---------------------------------------------------------------------------
// Fetch source
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Copy)]
pub struct FetchTextureSource;

impl TextureSource for FetchTextureSource {
    fn fetch(&self, request: TextureRequest) -> LocalBoxFuture<'static, BridgeResult<Texture>> {
        async move {
            let url = request.url.clone();
            match fetch_object_url(&request).await {
                Ok(resource) => Ok(Texture { url, resource }),
                Err(e) => Err(BridgeError::TextureLoad {
                    url,
                    reason: e.as_string().unwrap_or_else(|| format!("{:?}", e)),
                }),
            }
        }
        .boxed_local()
    }
}

/// Aborts the in-flight request when dropped.
struct AbortOnDrop(AbortController);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Clears the timeout when dropped.
struct TimeoutGuard {
    id: i32,
    _callback: Closure<dyn FnMut()>,
}

impl Drop for TimeoutGuard {
    fn drop(&mut self) {
        if let Some(window) = web_sys::window() {
            window.clear_timeout_with_handle(self.id);
        }
    }
}

fn start_timeout(
    window: &web_sys::Window,
    controller: &AbortController,
    timeout: Duration,
) -> Result<TimeoutGuard, JsValue> {
    let c = controller.clone();
    let callback = Closure::<dyn FnMut()>::new(move || c.abort());
    let id = window.set_timeout_with_callback_and_timeout_and_arguments_0(
        callback.as_ref().unchecked_ref(),
        timeout.as_millis().min(i32::MAX as u128) as i32,
    )?;
    Ok(TimeoutGuard {
        id,
        _callback: callback,
    })
}

async fn fetch_object_url(req: &TextureRequest) -> Result<String, JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;

    let headers = Headers::new()?;
    for (name, value) in &req.headers {
        headers.set(name, value)?;
    }

    let controller = AbortController::new()?;
    let init = RequestInit::new();
    init.set_method("GET");
    init.set_headers(&headers);
    init.set_signal(Some(&controller.signal()));

    let _abort = AbortOnDrop(controller.clone());
    let _timeout = match req.timeout {
        Some(t) => Some(start_timeout(&window, &controller, t)?),
        None => None,
    };

    let request = Request::new_with_str_and_init(&req.url, &init)?;
    let response: Response = JsFuture::from(window.fetch_with_request(&request))
        .await?
        .dyn_into()?;
    if !response.ok() {
        return Err(JsValue::from_str(&format!("HTTP {}", response.status())));
    }

    let blob: Blob = JsFuture::from(response.blob()?).await?.dyn_into()?;
    Url::create_object_url_with_blob(&blob)
}
