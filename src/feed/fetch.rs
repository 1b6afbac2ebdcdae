use bytes::Bytes;
use reqwest::Client;

pub async fn fetch_rss(client: &Client, url: &str) -> Result<Bytes, reqwest::Error> {
    let bytes = client.get(url).send().await?.error_for_status()?.bytes().await?;
    Ok(bytes)
}
