use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Work;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Claim, Handle, Settle }

impl PhaseSpan for Phase {
    fn span(&self) -> Span { match self { Phase::Claim => info_span!("claim"), Phase::Handle => info_span!("handle"), Phase::Settle => info_span!("settle") } }
}

impl OpMarker for Work {
    const NAME: &'static str = "work";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("work") }
}
