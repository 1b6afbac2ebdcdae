use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Ingest;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Validate, Fetch, Reconcile, Persist, Publish, Schedule, Health }

impl PhaseSpan for Phase {
    fn span(&self) -> Span { match self {
        Phase::Validate => info_span!("validate"),
        Phase::Fetch => info_span!("fetch"),
        Phase::Reconcile => info_span!("reconcile"),
        Phase::Persist => info_span!("persist"),
        Phase::Publish => info_span!("publish"),
        Phase::Schedule => info_span!("schedule"),
        Phase::Health => info_span!("health"),
    }}
}

impl OpMarker for Ingest {
    const NAME: &'static str = "ingest";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("ingest") }
}
