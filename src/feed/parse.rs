use bytes::Bytes;
use chrono::{DateTime, Utc};
use rss::{Channel, Item};

use super::{FeedDocument, FeedEntry};

pub fn parse_document(xml: &Bytes) -> Result<FeedDocument, rss::Error> {
    let channel = Channel::read_from(&xml[..])?;
    let entries = channel.items().iter().filter_map(to_entry).collect();
    let title = Some(channel.title().trim().to_string()).filter(|t| !t.is_empty());
    Ok(FeedDocument { title, entries })
}

fn to_entry(item: &Item) -> Option<FeedEntry> {
    let link = non_empty(item.link());
    let guid = non_empty(item.guid().map(|g| g.value())).or_else(|| link.clone());
    let Some(guid) = guid else {
        tracing::debug!(title = ?item.title(), "skipping feed item without guid or link");
        return None;
    };
    Some(FeedEntry {
        guid,
        title: non_empty(item.title()),
        link,
        enclosure_url: non_empty(item.enclosure().map(|e| e.url())),
        description: non_empty(item.description()),
        published_at: extract_published_at(item),
    })
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

pub fn extract_published_at(item: &Item) -> Option<DateTime<Utc>> {
    if let Some(pub_date) = item.pub_date() {
        if let Ok(dt) = DateTime::parse_from_rfc2822(pub_date.trim()) { return Some(dt.with_timezone(&Utc)); }
    }
    // Dublin Core date (RFC3339)
    if let Some(dc) = item.dublin_core_ext() {
        if let Some(first) = dc.dates().first() {
            if let Ok(dt) = DateTime::parse_from_rfc3339(first) { return Some(dt.with_timezone(&Utc)); }
        }
    }
    None
}
