use anyhow::Result;
use serde::Serialize;
use std::marker::PhantomData;
use tracing::{info, debug, warn, error, Span};

use super::emit;
use crate::error::IngestError;
use crate::model::PodcastId;

pub trait PhaseSpan {
    fn span(&self) -> Span;
}

pub trait OpMarker {
    const NAME: &'static str;
    type Phase: PhaseSpan;
    fn root_span() -> Span;
}

pub struct LogCtx<O: OpMarker> {
    pub(crate) json: bool,
    pub(crate) _marker: PhantomData<O>,
}

impl<O: OpMarker> LogCtx<O> {
    fn op_name(&self) -> &'static str { O::NAME }

    pub fn root_span(&self) -> Span { O::root_span() }

    pub fn root_span_kv<'a, T>(&self, fields: T) -> Span
    where
        T: IntoIterator<Item = (&'a str, String)>,
    {
        let span = self.root_span();
        let details = kv_to_string(fields);
        span.in_scope(|| {
            if details.is_empty() {
                debug!(op = %self.op_name(), "start");
            } else {
                debug!(op = %self.op_name(), details = %details, "start");
            }
        });
        span
    }

    pub fn span(&self, ph: &O::Phase) -> Span { ph.span() }

    pub fn info(&self, msg: impl AsRef<str>) { if self.json { info!(op = %self.op_name(), "{}", msg.as_ref()); } else { info!("{}", msg.as_ref()); } }
    pub fn debug(&self, msg: impl AsRef<str>) { if self.json { debug!(op = %self.op_name(), "{}", msg.as_ref()); } else { debug!("{}", msg.as_ref()); } }
    pub fn warn(&self, msg: impl AsRef<str>) { if self.json { warn!(op = %self.op_name(), "{}", msg.as_ref()); } else { warn!("{}", msg.as_ref()); } }

    pub fn info_kv<'a, D>(&self, msg: &str, kv: D)
    where
        D: IntoIterator<Item = (&'a str, String)>,
    {
        let details = kv_to_string(kv);
        if self.json { info!(op = %self.op_name(), details = %details, "{}", msg); }
        else { info!("{} {}", msg, details); }
    }

    pub fn warn_kv<'a, D>(&self, msg: &str, kv: D)
    where
        D: IntoIterator<Item = (&'a str, String)>,
    {
        let details = kv_to_string(kv);
        if self.json { warn!(op = %self.op_name(), details = %details, "{}", msg); }
        else { warn!("{} {}", msg, details); }
    }

    pub fn error_kv<'a, D>(&self, msg: &str, kv: D)
    where
        D: IntoIterator<Item = (&'a str, String)>,
    {
        let details = kv_to_string(kv);
        if self.json { error!(op = %self.op_name(), details = %details, "{}", msg); }
        else { error!("{} {}", msg, details); }
    }

    pub fn plan<T: Serialize>(&self, plan: &T) -> Result<()> { emit::print_plan(self.op_name(), plan) }
    pub fn result<T: Serialize>(&self, result: &T) -> Result<()> { emit::print_result(self.op_name(), result) }
}

impl LogCtx<crate::telemetry::ops::ingest::Ingest> {
    pub fn ingest_summary(&self, podcast_id: PodcastId, created: usize, refreshed: usize, replayed: usize, batches: usize, post_count: i64) {
        if self.json { info!(op = %self.op_name(), podcast_id, created, refreshed, replayed, batches, post_count, "ingest_summary"); }
        else { info!("✅ Podcast {} — created={} refreshed={} replayed={} batches={} post_count={}", podcast_id, created, refreshed, replayed, batches, post_count); }
    }

    pub fn ingest_failed(&self, podcast_id: PodcastId, err: &IngestError, failures: Option<i32>) {
        let kind = err.kind().as_str();
        if self.json { error!(op = %self.op_name(), podcast_id, kind, failures, error = %err, "ingest_failed"); }
        else { error!("❌ Podcast {} — kind={} failures={:?}: {}", podcast_id, kind, failures, err); }
    }
}

fn kv_to_string<'a, T>(kv: T) -> String
where
    T: IntoIterator<Item = (&'a str, String)>,
{
    let mut parts: Vec<String> = Vec::new();
    for (k, v) in kv { parts.push(format!("{}={}", k, v)); }
    parts.join(" ")
}
