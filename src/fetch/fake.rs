//! In-memory [`HttpClient`] serving canned responses by URL.

use async_trait::async_trait;
use reqwest::{Request, Response};
use std::collections::HashMap;
use std::sync::Mutex;

use super::client::HttpClient;

#[derive(Debug, Clone)]
pub(crate) struct Canned {
    status: u16,
    content_type: Option<String>,
    body: Vec<u8>,
}

impl Canned {
    pub(crate) fn ok(body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_type: None,
            body,
        }
    }

    pub(crate) fn status(status: u16) -> Self {
        Self {
            status,
            content_type: None,
            body: Vec::new(),
        }
    }

    pub(crate) fn content_type(mut self, value: &str) -> Self {
        self.content_type = Some(value.to_string());
        self
    }
}

/// Serves the n-th canned response of a URL on its n-th request and keeps
/// repeating the last one. Unknown URLs answer 404.
#[derive(Default)]
pub(crate) struct FakeClient {
    routes: HashMap<String, Vec<Canned>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl FakeClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn route(mut self, url: &str, responses: Vec<Canned>) -> Self {
        self.routes.insert(url.to_string(), responses);
        self
    }

    pub(crate) fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }
}

#[async_trait]
impl HttpClient for FakeClient {
    async fn execute(&self, req: Request) -> reqwest::Result<Response> {
        let url = req.url().as_str().to_string();
        let n = {
            let mut calls = self.calls.lock().unwrap();
            let count = calls.entry(url.clone()).or_insert(0);
            *count += 1;
            *count - 1
        };

        let canned = self
            .routes
            .get(&url)
            .and_then(|responses| responses.get(n).or_else(|| responses.last()))
            .cloned()
            .unwrap_or_else(|| Canned::status(404));

        let mut builder = http::Response::builder().status(canned.status);
        if let Some(content_type) = &canned.content_type {
            builder = builder.header(http::header::CONTENT_TYPE, content_type.as_str());
        }
        Ok(Response::from(builder.body(canned.body).unwrap()))
    }
}
