use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Schedule;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Plan, Enqueue }

impl PhaseSpan for Phase {
    fn span(&self) -> Span { match self { Phase::Plan => info_span!("plan"), Phase::Enqueue => info_span!("enqueue") } }
}

impl OpMarker for Schedule {
    const NAME: &'static str = "schedule";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("schedule") }
}
