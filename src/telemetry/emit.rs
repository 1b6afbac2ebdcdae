use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::{self, Write};
use uuid::Uuid;

pub const SCHEMA_VERSION: &str = "podfeed.v1";

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    schema_version: &'static str,
    time: DateTime<Utc>,
    request_id: Uuid,
    op: &'a str,
    apply: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    plan: Option<&'a T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a T>,
}

pub fn print_plan<T: Serialize>(op: &str, plan: &T) -> Result<()> {
    write_envelope(&Envelope { schema_version: SCHEMA_VERSION, time: Utc::now(), request_id: Uuid::new_v4(), op, apply: false, plan: Some(plan), result: None })
}

pub fn print_result<T: Serialize>(op: &str, result: &T) -> Result<()> {
    write_envelope(&Envelope { schema_version: SCHEMA_VERSION, time: Utc::now(), request_id: Uuid::new_v4(), op, apply: true, plan: None, result: Some(result) })
}

fn write_envelope<T: Serialize>(env: &Envelope<'_, T>) -> Result<()> {
    let mut out = io::stdout();
    serde_json::to_writer(&mut out, env)?;
    writeln!(&mut out)?;
    Ok(())
}
