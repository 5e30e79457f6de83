//! Replay of recorded host sessions.
//!
//! A recording is JSON lines, one step per line, ordered by `atMs`:
//!
//! ```text
//! {"atMs":0,   "event":{"eventName":"BridgeConnect","data":{...}}}
//! {"atMs":40,  "local":{"position":{...},"rotation":{...},"scale":{...}}}
//! {"atMs":90,  "entity":{"kind":"mediaScreen","id":"lobby"}}
//! {"atMs":120, "click":{"kind":"mediaScreen","id":"lobby"}}
//! ```
//!
//! `event` may be an envelope object or the raw string the host would pass
//! to `handleEvent`. The replayer drives a [`Spaces`] context with the
//! headless render layer, an in-memory texture source and a recording
//! sink, stepping simulated frames between lines.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use futures::executor::LocalPool;
use serde::{Deserialize, Serialize};

use crate::emitter::{MemorySink, SentMessage};
use crate::error::{BridgeError, BridgeResult};
use crate::loader::StaticTextureSource;
use crate::registry::DispatchOutcome;
use crate::render::HeadlessRenderLayer;
use crate::renderable::{ClickSource, EntityKind};
use crate::spaces::{Spaces, SpacesAdapters, SpacesConfig};
use crate::types::Transform;

// ---------------------------------------------------------------------------
// Recording format
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReplayEntity {
    pub kind: String,
    pub id: String,
    #[serde(default)]
    pub transform: Option<Transform>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReplayLine {
    pub at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local: Option<Transform>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<ReplayEntity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub click: Option<ReplayEntity>,
}

/// Parse a recording. Blank lines and `#` comments are skipped; lines are
/// stably sorted by `atMs`.
pub fn parse(text: &str) -> BridgeResult<Vec<ReplayLine>> {
    let mut lines = Vec::new();
    for (n, raw) in text.lines().enumerate() {
        let raw = raw.trim();
        if raw.is_empty() || raw.starts_with('#') {
            continue;
        }
        let line: ReplayLine = serde_json::from_str(raw)
            .map_err(|e| BridgeError::MalformedEnvelope(format!("line {}: {}", n + 1, e)))?;
        lines.push(line);
    }
    lines.sort_by_key(|l| l.at_ms);
    Ok(lines)
}

fn parse_kind(kind: &str) -> BridgeResult<EntityKind> {
    kind.parse::<EntityKind>().map_err(BridgeError::MalformedEnvelope)
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct ReplayReport {
    pub lines: usize,
    pub delivered: usize,
    pub unhandled: usize,
    pub failed: usize,
    pub frames: u64,
    pub sent: Vec<SentMessage>,
}

impl ReplayReport {
    /// Outbound calls as JSON lines: `{"entryPoint":..,"payload":..}`.
    pub fn sent_jsonl(&self) -> String {
        self.sent
            .iter()
            .map(|m| {
                serde_json::json!({ "entryPoint": m.entry_point, "payload": m.payload() })
                    .to_string()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// ---------------------------------------------------------------------------
// Replayer
// ---------------------------------------------------------------------------

pub struct Replayer {
    spaces: Spaces,
    pool: LocalPool,
    sink: MemorySink,
    render: Rc<RefCell<HeadlessRenderLayer>>,
    textures: StaticTextureSource,
    frame_dt: f32,
    local: Option<Transform>,
    report: ReplayReport,
}

impl Replayer {
    pub fn new(config: SpacesConfig, frame_dt: f32) -> Self {
        let pool = LocalPool::new();
        let sink = MemorySink::new();
        let render = Rc::new(RefCell::new(HeadlessRenderLayer::new()));
        let textures = StaticTextureSource::new();

        let spaces = Spaces::new(
            SpacesAdapters {
                sink: Rc::new(sink.clone()),
                render: render.clone(),
                textures: Rc::new(textures.clone()),
                spawner: Rc::new(pool.spawner()),
            },
            config,
        );

        Self {
            spaces,
            pool,
            sink,
            render,
            textures,
            frame_dt: if frame_dt > 0.0 { frame_dt } else { 1.0 / 60.0 },
            local: None,
            report: ReplayReport::default(),
        }
    }

    pub fn spaces(&self) -> &Spaces {
        &self.spaces
    }

    pub fn render(&self) -> &Rc<RefCell<HeadlessRenderLayer>> {
        &self.render
    }

    /// The texture source, so callers can mark URLs as failing or stalled.
    pub fn textures(&self) -> &StaticTextureSource {
        &self.textures
    }

    pub fn sink(&self) -> &MemorySink {
        &self.sink
    }

    pub fn frame_dt(&self) -> f32 {
        self.frame_dt
    }

    fn clock_ms(&self) -> f64 {
        self.spaces.clock() * 1000.0
    }

    /// Run one frame: finish ready loads, then tick.
    pub fn frame(&mut self) {
        self.pool.run_until_stalled();
        self.spaces.tick(self.frame_dt, self.local.as_ref());
        self.report.frames += 1;
    }

    /// Step frames until simulated time reaches `at_ms`.
    pub fn advance_to(&mut self, at_ms: u64) {
        while self.clock_ms() < at_ms as f64 {
            self.frame();
        }
    }

    pub fn apply(&mut self, line: &ReplayLine) -> BridgeResult<()> {
        self.report.lines += 1;

        if let Some(event) = &line.event {
            let message = match event {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            match self.spaces.handle_event(&message) {
                DispatchOutcome::Delivered => self.report.delivered += 1,
                DispatchOutcome::Unhandled => self.report.unhandled += 1,
                DispatchOutcome::Failed => self.report.failed += 1,
            }
        }
        if let Some(local) = line.local {
            self.local = Some(local);
        }
        if let Some(e) = &line.entity {
            let kind = parse_kind(&e.kind)?;
            self.spaces
                .add_entity(kind, &e.id, e.transform.unwrap_or_default())?;
        }
        if let Some(c) = &line.click {
            let kind = parse_kind(&c.kind)?;
            self.spaces.click(kind, &c.id, ClickSource::PointerEvent);
        }
        Ok(())
    }

    /// Replay in simulated time, then run `tail_ms` more.
    pub fn run(&mut self, lines: &[ReplayLine], tail_ms: u64) -> BridgeResult<ReplayReport> {
        for line in lines {
            self.advance_to(line.at_ms);
            self.apply(line)?;
        }
        let end = lines.last().map(|l| l.at_ms).unwrap_or(0) + tail_ms;
        self.advance_to(end);
        Ok(self.finish())
    }

    /// Replay paced against the wall clock, one tokio tick per frame.
    pub async fn run_realtime(
        &mut self,
        lines: &[ReplayLine],
        tail_ms: u64,
    ) -> BridgeResult<ReplayReport> {
        let mut ticker = tokio::time::interval(Duration::from_secs_f32(self.frame_dt));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        let end = lines.last().map(|l| l.at_ms).unwrap_or(0) + tail_ms;
        let mut next = 0;

        while self.clock_ms() < end as f64 || next < lines.len() {
            ticker.tick().await;
            while next < lines.len() && lines[next].at_ms as f64 <= self.clock_ms() {
                self.apply(&lines[next])?;
                next += 1;
            }
            self.frame();
        }
        Ok(self.finish())
    }

    fn finish(&mut self) -> ReplayReport {
        self.pool.run_until_stalled();
        let mut report = std::mem::take(&mut self.report);
        report.sent = self.sink.take();
        log::info!(
            "[replay] {} lines, {} frames, {} delivered, {} unhandled, {} failed, {} sent",
            report.lines,
            report.frames,
            report.delivered,
            report.unhandled,
            report.failed,
            report.sent.len()
        );
        report
    }
}
