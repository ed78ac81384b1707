//! Random "discover" feed shown next to the search surface.

use crate::transport::{Transport, TransportError};
use crate::types::ProductResult;

#[derive(Debug, Default)]
pub struct BrowseFeed {
    products: Vec<ProductResult>,
    error: Option<String>,
}

impl BrowseFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn products(&self) -> &[ProductResult] {
        &self.products
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Fetch a fresh random selection. On failure the previous products stay
    /// visible and the error is recorded.
    pub async fn refresh<T: Transport>(
        &mut self,
        transport: &T,
        count: usize,
    ) -> Result<(), TransportError> {
        match transport.random_products(count).await {
            Ok(products) => {
                log::info!("browse feed loaded {} product(s)", products.len());
                self.products = products;
                self.error = None;
                Ok(())
            }
            Err(e) => {
                log::error!("Error loading products: {e}");
                self.error = Some(e.message().to_string());
                Err(e)
            }
        }
    }
}
