/// Worker-pool loader for forecast groups.
///
/// Each bin (and the raster check) is fetched as its own job so one slow
/// or missing file does not hold up the rest of the group. Results are
/// sent back over an mpsc channel tagged with the request token; the main
/// loop drains the receiver and hands each result to the sequencer.

use super::sequencer::{GroupRequest, LoadItem, LoadResult};
use crate::model::DashboardError;
use serde_json::Value;
use std::sync::mpsc::{channel, Receiver, Sender};
use threadpool::ThreadPool;
use tracing::debug;

/// Fetches one rainfall-bin FeatureCollection, kept as raw GeoJSON for
/// the renderer.
pub fn fetch_bin(client: &reqwest::blocking::Client, url: &str) -> Result<Value, DashboardError> {
    let response = client.get(url).send()?;

    if !response.status().is_success() {
        return Err(DashboardError::Http(response.status().as_u16()));
    }

    let value: Value = response.json()?;
    if value.get("features").and_then(Value::as_array).is_none() {
        return Err(DashboardError::Parse(format!("{} is not a FeatureCollection", url)));
    }
    Ok(value)
}

/// Checks that the raster image for a frame exists.
pub fn check_raster(client: &reqwest::blocking::Client, url: &str) -> Result<(), DashboardError> {
    let response = client.head(url).send()?;

    if !response.status().is_success() {
        return Err(DashboardError::Http(response.status().as_u16()));
    }
    Ok(())
}

pub struct ForecastLoader {
    pool: ThreadPool,
    client: reqwest::blocking::Client,
    tx: Sender<LoadResult>,
}

impl ForecastLoader {
    /// Creates the loader and the receiving end the main loop drains.
    pub fn new(client: reqwest::blocking::Client, workers: usize) -> (Self, Receiver<LoadResult>) {
        let (tx, rx) = channel();
        let loader = Self {
            pool: ThreadPool::with_name("forecast-loader".to_string(), workers.max(1)),
            client,
            tx,
        };
        (loader, rx)
    }

    /// Queues every fetch for a group. Returns immediately.
    pub fn dispatch(&self, request: GroupRequest) {
        debug!(
            day = request.day + 1,
            token = request.token.0,
            bins = request.bin_urls.len(),
            raster = request.raster_url.is_some(),
            "dispatching forecast group"
        );

        for (bin, url) in request.bin_urls.into_iter().enumerate() {
            let client = self.client.clone();
            let tx = self.tx.clone();
            let (token, day) = (request.token, request.day);
            self.pool.execute(move || {
                let result = fetch_bin(&client, &url);
                // Receiver gone means the daemon is shutting down.
                let _ = tx.send(LoadResult { token, day, item: LoadItem::Bin { bin, result } });
            });
        }

        if let Some(url) = request.raster_url {
            let client = self.client.clone();
            let tx = self.tx.clone();
            let (token, day) = (request.token, request.day);
            self.pool.execute(move || {
                let result = check_raster(&client, &url);
                let _ = tx.send(LoadResult { token, day, item: LoadItem::Raster { result } });
            });
        }
    }

    /// Jobs queued or running.
    pub fn pending(&self) -> usize {
        self.pool.queued_count() + self.pool.active_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::sequencer::RequestToken;
    use std::time::Duration;

    #[test]
    fn test_unreachable_bins_come_back_as_errors_with_token() {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .expect("client");
        let (loader, rx) = ForecastLoader::new(client, 2);

        loader.dispatch(GroupRequest {
            token: RequestToken(7),
            day: 3,
            // Port 9 on localhost is the discard service; nothing listens.
            bin_urls: vec!["http://127.0.0.1:9/a.geojson".into(), "http://127.0.0.1:9/b.geojson".into()],
            raster_url: None,
        });

        let mut seen = Vec::new();
        for _ in 0..2 {
            let result = rx.recv_timeout(Duration::from_secs(10)).expect("result arrives");
            assert_eq!(result.token, RequestToken(7));
            assert_eq!(result.day, 3);
            match result.item {
                LoadItem::Bin { bin, result } => {
                    assert!(result.is_err());
                    seen.push(bin);
                }
                LoadItem::Raster { .. } => panic!("no raster requested"),
            }
        }
        seen.sort();
        assert_eq!(seen, [0, 1]);
    }
}
