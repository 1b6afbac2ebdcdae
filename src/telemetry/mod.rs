pub mod config;
pub mod ctx;
pub mod emit;
pub mod ops;

use ctx::LogCtx;

pub fn ingest() -> LogCtx<ops::ingest::Ingest> { LogCtx { json: config::logs_are_json(), _marker: std::marker::PhantomData } }
pub fn work() -> LogCtx<ops::work::Work> { LogCtx { json: config::logs_are_json(), _marker: std::marker::PhantomData } }
pub fn schedule() -> LogCtx<ops::schedule::Schedule> { LogCtx { json: config::logs_are_json(), _marker: std::marker::PhantomData } }
pub fn podcast() -> LogCtx<ops::podcast::Podcast> { LogCtx { json: config::logs_are_json(), _marker: std::marker::PhantomData } }
pub fn init() -> LogCtx<ops::init::Init> { LogCtx { json: config::logs_are_json(), _marker: std::marker::PhantomData } }
