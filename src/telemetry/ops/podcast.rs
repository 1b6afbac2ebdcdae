use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Podcast;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Plan, Add, Enqueue }

impl PhaseSpan for Phase {
    fn span(&self) -> Span { match self { Phase::Plan => info_span!("plan"), Phase::Add => info_span!("add"), Phase::Enqueue => info_span!("enqueue") } }
}

impl OpMarker for Podcast {
    const NAME: &'static str = "podcast";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("podcast") }
}
