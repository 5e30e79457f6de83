//! Texture loading seam.
//!
//! Loads are futures produced by a [`TextureSource`] and driven by a
//! [`TaskSpawner`]. Both are single-threaded (`!Send`) to match the render
//! loop; the wasm client spawns with `spawn_local`, native code with a
//! `futures` `LocalPool`.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::time::Duration;

use futures::future::{self, LocalBoxFuture};
use futures::task::LocalSpawnExt;
use futures::FutureExt;

use crate::error::{BridgeError, BridgeResult};

/// A loaded texture as handed to the render layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texture {
    /// URL the texture was requested from (including any cache-buster).
    pub url: String,
    /// Platform resource (object URL, GPU handle id, …).
    pub resource: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// Transport-level timeout. The dispatch layer has none of its own.
    pub timeout: Option<Duration>,
}

impl TextureRequest {
    pub fn plain(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            timeout: None,
        }
    }

    /// Request that bypasses every cache layer: `t=<timestamp>` query
    /// parameter plus no-cache headers.
    pub fn cache_busted(url: &str, timestamp: i64) -> Self {
        Self {
            url: cache_busted_url(url, timestamp),
            headers: vec![
                ("Cache-Control".into(), "no-cache".into()),
                ("Pragma".into(), "no-cache".into()),
            ],
            timeout: None,
        }
    }

    pub fn is_cache_busted(&self) -> bool {
        self.headers.iter().any(|(k, _)| k == "Cache-Control")
    }
}

/// Append `t=<timestamp>` to `url`, respecting an existing query string.
pub fn cache_busted_url(url: &str, timestamp: i64) -> String {
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{}{}t={}", url, sep, timestamp)
}

pub trait TextureSource {
    fn fetch(&self, request: TextureRequest) -> LocalBoxFuture<'static, BridgeResult<Texture>>;
}

pub trait TaskSpawner {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>);
}

impl TaskSpawner for futures::executor::LocalSpawner {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        if let Err(e) = self.spawn_local(task) {
            log::error!("[loader] Failed to spawn load task: {}", e);
        }
    }
}

// ---------------------------------------------------------------------------
// In-memory source
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct StaticState {
    failing: HashSet<String>,
    stalled: HashSet<String>,
    requests: Vec<TextureRequest>,
    resources: HashMap<String, String>,
}

/// Resolves every request immediately with `resource = url`, except URLs
/// marked as failing (error) or stalled (never resolves).
///
/// Matching ignores any cache-busting query parameter.
#[derive(Debug, Default, Clone)]
pub struct StaticTextureSource {
    state: Rc<RefCell<StaticState>>,
}

impl StaticTextureSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, url: &str) {
        self.state.borrow_mut().failing.insert(url.to_string());
    }

    pub fn stall(&self, url: &str) {
        self.state.borrow_mut().stalled.insert(url.to_string());
    }

    pub fn with_resource(&self, url: &str, resource: &str) {
        self.state
            .borrow_mut()
            .resources
            .insert(url.to_string(), resource.to_string());
    }

    /// Every request seen so far, in order.
    pub fn requests(&self) -> Vec<TextureRequest> {
        self.state.borrow().requests.clone()
    }
}

fn strip_cache_buster(url: &str) -> &str {
    match url.rfind("t=") {
        Some(i) if i > 0 && matches!(url.as_bytes()[i - 1], b'?' | b'&') => &url[..i - 1],
        _ => url,
    }
}

impl TextureSource for StaticTextureSource {
    fn fetch(&self, request: TextureRequest) -> LocalBoxFuture<'static, BridgeResult<Texture>> {
        let mut st = self.state.borrow_mut();
        st.requests.push(request.clone());

        let base = strip_cache_buster(&request.url).to_string();
        if st.stalled.contains(&base) {
            return future::pending().boxed_local();
        }
        if st.failing.contains(&base) {
            let err = BridgeError::TextureLoad {
                url: request.url,
                reason: "unavailable".into(),
            };
            return future::ready(Err(err)).boxed_local();
        }

        let resource = st
            .resources
            .get(&base)
            .cloned()
            .unwrap_or_else(|| request.url.clone());
        future::ready(Ok(Texture {
            url: request.url,
            resource,
        }))
        .boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_buster_appends_query() {
        assert_eq!(cache_busted_url("https://a/b.png", 42), "https://a/b.png?t=42");
        assert_eq!(
            cache_busted_url("https://a/b.png?x=1", 42),
            "https://a/b.png?x=1&t=42"
        );
    }

    #[test]
    fn cache_busted_request_sets_no_cache_headers() {
        let r = TextureRequest::cache_busted("https://a/b.png", 7);
        assert!(r.is_cache_busted());
        assert!(r.headers.contains(&("Pragma".into(), "no-cache".into())));
        assert!(!TextureRequest::plain("https://a/b.png").is_cache_busted());
    }

    #[test]
    fn strip_buster_round_trip() {
        assert_eq!(strip_cache_buster("https://a/b.png?t=9"), "https://a/b.png");
        assert_eq!(strip_cache_buster("https://a/b.png?x=1&t=9"), "https://a/b.png?x=1");
        assert_eq!(strip_cache_buster("https://a/b.png"), "https://a/b.png");
    }

    #[test]
    fn static_source_fails_marked_urls() {
        let src = StaticTextureSource::new();
        src.fail("https://a/bad.png");
        let res = futures::executor::block_on(src.fetch(TextureRequest::plain("https://a/bad.png")));
        assert!(res.is_err());
        let ok = futures::executor::block_on(src.fetch(TextureRequest::plain("https://a/ok.png")));
        assert_eq!(ok.unwrap().resource, "https://a/ok.png");
        assert_eq!(src.requests().len(), 2);
    }
}
