//! Scriptable transport and fixtures for tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use crate::transport::{Transport, TransportError};
use crate::types::{Price, ProductResult, SelectedFile};

/// A call observed by `MockTransport`.
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    Text(String),
    Image { file_name: String, top_k: usize },
    Random(usize),
    Categories,
}

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum MockResponse {
    Products(Vec<ProductResult>),
    Categories(Vec<String>),
    Fail(TransportError),
    /// Wait, then reply with the inner response.
    Delayed(Duration, Box<MockResponse>),
}

impl MockResponse {
    pub fn delayed(millis: u64, inner: MockResponse) -> Self {
        Self::Delayed(Duration::from_millis(millis), Box::new(inner))
    }
}

/// Transport that replays scripted responses in call order and records every
/// call. An exhausted script answers with an empty product list.
#[derive(Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<MockResponse>>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockTransport {
    pub fn new(script: Vec<MockResponse>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn next(&self, call: MockCall) -> MockResponse {
        self.calls.lock().unwrap().push(call);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(MockResponse::Products(Vec::new()))
    }

    async fn settle(mut response: MockResponse) -> MockResponse {
        loop {
            match response {
                MockResponse::Delayed(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    response = *inner;
                }
                other => return other,
            }
        }
    }

    async fn products(&self, call: MockCall) -> Result<Vec<ProductResult>, TransportError> {
        match Self::settle(self.next(call)).await {
            MockResponse::Products(products) => Ok(products),
            MockResponse::Fail(e) => Err(e),
            MockResponse::Categories(_) => Err(TransportError::MalformedResponse(
                "scripted categories for a product call".into(),
            )),
            MockResponse::Delayed(..) => unreachable!("settle unwraps delays"),
        }
    }
}

impl Transport for MockTransport {
    async fn search_by_text(&self, query: &str) -> Result<Vec<ProductResult>, TransportError> {
        self.products(MockCall::Text(query.to_string())).await
    }

    async fn search_by_image(
        &self,
        file: &SelectedFile,
        top_k: usize,
    ) -> Result<Vec<ProductResult>, TransportError> {
        self.products(MockCall::Image {
            file_name: file.name.clone(),
            top_k,
        })
        .await
    }

    async fn random_products(&self, count: usize) -> Result<Vec<ProductResult>, TransportError> {
        self.products(MockCall::Random(count)).await
    }

    async fn categories(&self) -> Result<Vec<String>, TransportError> {
        match Self::settle(self.next(MockCall::Categories)).await {
            MockResponse::Categories(categories) => Ok(categories),
            MockResponse::Products(_) => Ok(Vec::new()),
            MockResponse::Fail(e) => Err(e),
            MockResponse::Delayed(..) => unreachable!("settle unwraps delays"),
        }
    }
}

/// A text-mode product (no similarity score).
pub fn product(id: u64, name: &str) -> ProductResult {
    ProductResult {
        id,
        name: name.to_string(),
        category: "shoes".to_string(),
        price: Price::Label("29.99 €".to_string()),
        image_url: Some(format!("/images/products/shoes/{id}.jpg")),
        in_stock: true,
        similarity: None,
        description: None,
        rank: None,
    }
}

/// `count` image-mode products with descending similarity.
pub fn ranked_products(count: usize) -> Vec<ProductResult> {
    (1..=count as u64)
        .map(|id| ProductResult {
            similarity: Some(1.0 - id as f32 * 0.05),
            rank: Some(id as u32),
            ..product(id, &format!("Shoes #{id}"))
        })
        .collect()
}

pub fn photo(name: &str) -> SelectedFile {
    SelectedFile::new(name, "image/jpeg", vec![0xff, 0xd8, 0xff, 0xe0])
}
