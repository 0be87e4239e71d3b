//! Scripted upstream used by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use reqwest::{Request, Response, Url};
use serde_json::{Value, json};
use srt_sales::config::SrtConfig;
use srt_sales::fetch::HttpClient;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// What the fake upstream does for one request.
pub enum Reply {
    Json(u16, Value),
    Text(u16, String),
    /// Waits before answering, to trip the request timeout.
    Stall(Duration),
}

/// An [`HttpClient`] that answers from a queue and records every URL.
#[derive(Default)]
pub struct ScriptedClient {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<Url>>,
}

impl ScriptedClient {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Serves `total` records in pages of `page_size`, all on `run_date`.
    pub fn paged(total: usize, page_size: usize, run_date: &str) -> Self {
        let mut replies = Vec::new();
        let mut served = 0;
        while served < total {
            let n = page_size.min(total - served);
            let records = (0..n)
                .map(|i| record(run_date, "수서", "경부선", ((served + i) % 7) as u64))
                .collect();
            replies.push(Reply::Json(200, page(records, total as u64)));
            served += n;
        }
        Self::new(replies)
    }

    pub fn requests(&self) -> Vec<Url> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpClient for ScriptedClient {
    async fn execute(&self, req: Request) -> reqwest::Result<Response> {
        self.requests.lock().unwrap().push(req.url().clone());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("upstream received more requests than scripted");

        match reply {
            Reply::Json(status, body) => Ok(response(status, body.to_string())),
            Reply::Text(status, body) => Ok(response(status, body)),
            Reply::Stall(delay) => {
                tokio::time::sleep(delay).await;
                Ok(response(200, page(vec![], 0).to_string()))
            }
        }
    }
}

fn response(status: u16, body: String) -> Response {
    http::Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(body)
        .unwrap()
        .into()
}

pub fn record(run_date: &str, station: &str, route: &str, quantity: u64) -> Value {
    json!({
        "RUN_YMD": run_date,
        "SELLNG_STN_NM": station,
        "SELLNG_STN_CD": "0551",
        "ROUTE_NM": route,
        "SELLNG_QNTY": quantity,
        "PRT_CMPTN_QNTY": 0,
        "RFND_QNTY": 1
    })
}

pub fn page(records: Vec<Value>, total: u64) -> Value {
    json!({
        "page": 1,
        "perPage": 1000,
        "currentCount": records.len(),
        "totalCount": total,
        "data": records
    })
}

pub fn test_config() -> SrtConfig {
    SrtConfig {
        api_key: Some("test-key".to_string()),
        base_url: "http://upstream.test/B553912".to_string(),
        page_delay: Duration::ZERO,
        request_timeout: Duration::from_secs(5),
        ..SrtConfig::default()
    }
}

/// Value of query parameter `name` in `url`.
pub fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}
