use async_trait::async_trait;
use sqlx::PgPool;

use super::Store;
use crate::config::SCRAPE_QUEUE;
use crate::model::{Episode, EpisodeId, NewEpisode, Podcast, PodcastId, PodcastUpdate};

const EPISODE_COLUMNS: &str =
    "episode_id, podcast_id, guid, title, link, enclosure_url, description, published_at, publish_pending, enrich_pending";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Registers a podcast by feed URL; returns `(podcast_id, inserted)`.
    pub async fn upsert_podcast(&self, feed_url: &str, title: Option<&str>) -> Result<(PodcastId, bool), sqlx::Error> {
        sqlx::query_as::<_, (i64, bool)>(
            r#"
            INSERT INTO podfeed.podcast (feed_url, title)
            VALUES ($1, $2)
            ON CONFLICT (feed_url)
            DO UPDATE SET title = COALESCE(EXCLUDED.title, podfeed.podcast.title)
            RETURNING podcast_id, (xmax = 0) AS inserted
            "#,
        )
        .bind(feed_url)
        .bind(title)
        .fetch_one(&self.pool)
        .await
    }

    /// Podcasts never scraped, or last scraped before `cutoff`, oldest first.
    ///
    /// Podcasts that already have a scrape job waiting or running are left out.
    pub async fn list_stale_podcasts(&self, cutoff: chrono::DateTime<chrono::Utc>, limit: i64) -> Result<Vec<Podcast>, sqlx::Error> {
        sqlx::query_as::<_, Podcast>(
            r#"
            SELECT podcast_id, feed_url, title, post_count, consecutive_scrape_failures, last_scraped_at
            FROM podfeed.podcast p
            WHERE (p.last_scraped_at IS NULL OR p.last_scraped_at < $1)
              AND NOT EXISTS (
                SELECT 1 FROM podfeed.job j
                WHERE j.queue = $3
                  AND j.status IN ('queued', 'running')
                  AND (j.payload->>'podcast')::BIGINT = p.podcast_id
              )
            ORDER BY last_scraped_at NULLS FIRST, podcast_id
            LIMIT $2
            "#,
        )
        .bind(cutoff)
        .bind(limit)
        .bind(SCRAPE_QUEUE)
        .fetch_all(&self.pool)
        .await
    }
}

#[derive(sqlx::FromRow)]
struct UpsertedRow {
    #[sqlx(flatten)]
    episode: Episode,
    inserted: bool,
}

#[async_trait]
impl Store for PgStore {
    async fn get_podcast(&self, id: PodcastId) -> Result<Option<Podcast>, sqlx::Error> {
        sqlx::query_as::<_, Podcast>(
            r#"
            SELECT podcast_id, feed_url, title, post_count, consecutive_scrape_failures, last_scraped_at
            FROM podfeed.podcast
            WHERE podcast_id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn update_podcast(&self, id: PodcastId, update: &PodcastUpdate) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE podfeed.podcast
            SET post_count = COALESCE($2, post_count),
                consecutive_scrape_failures = $3,
                last_scraped_at = $4
            WHERE podcast_id = $1
            "#,
        )
        .bind(id)
        .bind(update.post_count)
        .bind(update.consecutive_scrape_failures)
        .bind(update.last_scraped_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_episodes_by_podcast(&self, id: PodcastId) -> Result<Vec<Episode>, sqlx::Error> {
        let sql = format!("SELECT {EPISODE_COLUMNS} FROM podfeed.episode WHERE podcast_id = $1 ORDER BY episode_id");
        sqlx::query_as::<_, Episode>(&sql).bind(id).fetch_all(&self.pool).await
    }

    async fn upsert_episodes(&self, episodes: &[NewEpisode]) -> Result<Vec<Episode>, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO podfeed.episode (podcast_id, guid, title, link, enclosure_url, description, published_at, publish_pending, enrich_pending)
            VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE, TRUE)
            ON CONFLICT (podcast_id, guid) DO UPDATE
              SET title         = EXCLUDED.title,
                  link          = EXCLUDED.link,
                  enclosure_url = EXCLUDED.enclosure_url,
                  description   = EXCLUDED.description,
                  published_at  = COALESCE(EXCLUDED.published_at, podfeed.episode.published_at),
                  updated_at    = now()
            RETURNING {EPISODE_COLUMNS}, (xmax = 0) AS inserted
            "#
        );

        // one transaction per batch so a failed write leaves nothing half-created
        let mut tx = self.pool.begin().await?;
        let mut created = Vec::new();
        for ep in episodes {
            let row = sqlx::query_as::<_, UpsertedRow>(&sql)
                .bind(ep.podcast_id)
                .bind(&ep.guid)
                .bind(&ep.title)
                .bind(&ep.link)
                .bind(&ep.enclosure_url)
                .bind(&ep.description)
                .bind(ep.published_at)
                .fetch_one(&mut *tx)
                .await?;
            if row.inserted { created.push(row.episode); }
        }
        tx.commit().await?;
        Ok(created)
    }

    async fn count_episodes(&self, id: PodcastId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM podfeed.episode WHERE podcast_id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await
    }

    async fn mark_published(&self, ids: &[EpisodeId]) -> Result<(), sqlx::Error> {
        if ids.is_empty() { return Ok(()); }
        sqlx::query("UPDATE podfeed.episode SET publish_pending = FALSE WHERE episode_id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_enriched(&self, ids: &[EpisodeId]) -> Result<(), sqlx::Error> {
        if ids.is_empty() { return Ok(()); }
        sqlx::query("UPDATE podfeed.episode SET enrich_pending = FALSE WHERE episode_id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
