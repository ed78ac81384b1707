//! Product cards and status text for result lists.

use std::fmt;

use url::Url;

use crate::config::Config;
use crate::types::{ProductResult, SearchMode, SearchPhase, SearchState};

pub const NO_RESULTS_MESSAGE: &str = "No products found";
pub const LOADING_MESSAGE: &str = "Searching...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockStatus {
    InStock,
    OutOfStock,
}

impl StockStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::InStock => "In stock",
            Self::OutOfStock => "Out of stock",
        }
    }
}

/// Display-ready view of one product.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductCard {
    pub id: u64,
    pub name: String,
    pub category: String,
    pub price: String,
    pub image_src: String,
    pub similarity_badge: Option<String>,
    pub stock: StockStatus,
    placeholder: String,
}

impl ProductCard {
    /// Swap in the placeholder after the image failed to load.
    pub fn image_failed(&mut self) {
        if self.image_src != self.placeholder {
            log::debug!("image for product {} unavailable, using placeholder", self.id);
            self.image_src = self.placeholder.clone();
        }
    }

    pub fn shows_placeholder(&self) -> bool {
        self.image_src == self.placeholder
    }
}

impl fmt::Display for ProductCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} | {} | {}", self.category, self.name, self.price, self.stock.label())?;
        if let Some(badge) = &self.similarity_badge {
            write!(f, " | {badge}")?;
        }
        write!(f, "\n    {}", self.image_src)
    }
}

/// Turns product records into cards.
#[derive(Debug, Clone)]
pub struct CardRenderer {
    image_origin: Option<String>,
    placeholder: String,
}

impl CardRenderer {
    pub fn new(image_origin: &str, placeholder: &str) -> Self {
        let image_origin = Url::parse(image_origin)
            .map(|_| image_origin.trim_end_matches('/').to_string())
            .map_err(|e| log::warn!("image origin '{image_origin}' is not a URL: {e}"))
            .ok();
        Self {
            image_origin,
            placeholder: placeholder.to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.backend.image_origin, &config.display.placeholder_image)
    }

    pub fn render(&self, product: &ProductResult) -> ProductCard {
        ProductCard {
            id: product.id,
            name: product.name.clone(),
            category: product.category.clone(),
            price: product.price.to_string(),
            image_src: self.resolve_image(product.image_url.as_deref()),
            similarity_badge: product.similarity.map(similarity_badge),
            stock: if product.in_stock {
                StockStatus::InStock
            } else {
                StockStatus::OutOfStock
            },
            placeholder: self.placeholder.clone(),
        }
    }

    pub fn render_all(&self, products: &[ProductResult]) -> Vec<ProductCard> {
        products.iter().map(|p| self.render(p)).collect()
    }

    /// Relative paths are appended to the image origin, path prefix included;
    /// absolute URLs pass through. Anything unusable resolves to the
    /// placeholder.
    fn resolve_image(&self, image_url: Option<&str>) -> String {
        let Some(path) = image_url.map(str::trim).filter(|p| !p.is_empty()) else {
            return self.placeholder.clone();
        };
        if let Ok(absolute) = Url::parse(path) {
            return absolute.to_string();
        }
        self.image_origin
            .as_ref()
            .and_then(|origin| {
                let joined = format!("{origin}/{}", path.trim_start_matches('/'));
                Url::parse(&joined).ok()
            })
            .map(|url| url.to_string())
            .unwrap_or_else(|| self.placeholder.clone())
    }
}

fn similarity_badge(similarity: f32) -> String {
    let percent = (similarity.clamp(0.0, 1.0) * 100.0).round() as u32;
    format!("{percent}% similar")
}

/// Heading for a non-empty result list, e.g. `"Image results (12 products)"`.
pub fn results_heading(state: &SearchState) -> Option<String> {
    if state.phase != SearchPhase::Success {
        return None;
    }
    let label = match state.mode {
        SearchMode::Text => "Text results",
        SearchMode::Image => "Image results",
        SearchMode::None => "Results",
    };
    Some(format!("{label} ({} products)", state.results.len()))
}

/// One-line status for phases that have no cards to show.
pub fn status_line(state: &SearchState) -> Option<String> {
    match state.phase {
        SearchPhase::Idle | SearchPhase::Success => None,
        SearchPhase::Loading => Some(LOADING_MESSAGE.to_string()),
        SearchPhase::Empty => Some(NO_RESULTS_MESSAGE.to_string()),
        SearchPhase::Error => Some(format!(
            "Error during search: {}",
            state.error_message.as_deref().unwrap_or("unknown error")
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{product, ranked_products};

    const PLACEHOLDER: &str = "https://via.placeholder.com/300x300?text=Image+Not+Found";

    fn renderer() -> CardRenderer {
        CardRenderer::new("http://localhost:5000", PLACEHOLDER)
    }

    #[test]
    fn relative_image_is_resolved_against_origin() {
        let card = renderer().render(&product(7, "Shoes #7"));
        assert_eq!(card.image_src, "http://localhost:5000/images/products/shoes/7.jpg");
        assert!(!card.shows_placeholder());
    }

    #[test]
    fn origin_path_prefix_is_kept() {
        let renderer = CardRenderer::new("https://cdn.example.com/shop/", PLACEHOLDER);
        let mut p = product(1, "A");
        p.image_url = Some("/images/a.jpg".into());
        assert_eq!(renderer.render(&p).image_src, "https://cdn.example.com/shop/images/a.jpg");

        p.image_url = Some("images/b.jpg".into());
        assert_eq!(renderer.render(&p).image_src, "https://cdn.example.com/shop/images/b.jpg");
    }

    #[test]
    fn absolute_image_passes_through() {
        let mut p = product(1, "A");
        p.image_url = Some("https://cdn.example.com/a.png".into());
        assert_eq!(renderer().render(&p).image_src, "https://cdn.example.com/a.png");
    }

    #[test]
    fn missing_image_uses_placeholder() {
        let mut p = product(1, "A");
        p.image_url = None;
        assert!(renderer().render(&p).shows_placeholder());

        p.image_url = Some("   ".into());
        assert!(renderer().render(&p).shows_placeholder());
    }

    #[test]
    fn image_failure_substitutes_placeholder_once() {
        let mut card = renderer().render(&product(1, "A"));
        card.image_failed();
        assert_eq!(card.image_src, PLACEHOLDER);
        card.image_failed();
        assert_eq!(card.image_src, PLACEHOLDER);
    }

    #[test]
    fn similarity_badge_only_for_scored_products() {
        assert!(renderer().render(&product(1, "A")).similarity_badge.is_none());

        let mut scored = product(2, "B");
        scored.similarity = Some(0.8731);
        assert_eq!(
            renderer().render(&scored).similarity_badge.as_deref(),
            Some("87% similar")
        );

        scored.similarity = Some(0.0);
        assert_eq!(
            renderer().render(&scored).similarity_badge.as_deref(),
            Some("0% similar")
        );
    }

    #[test]
    fn stock_indicator_follows_in_stock() {
        let mut p = product(1, "A");
        assert_eq!(renderer().render(&p).stock, StockStatus::InStock);
        p.in_stock = false;
        let card = renderer().render(&p);
        assert_eq!(card.stock, StockStatus::OutOfStock);
        assert!(card.to_string().contains("Out of stock"));
    }

    #[test]
    fn display_includes_badge_and_image() {
        let card = renderer().render(&ranked_products(1)[0]);
        let text = card.to_string();
        assert!(text.contains("Shoes #1"));
        assert!(text.contains("95% similar"));
        assert!(text.contains("http://localhost:5000/images/products/shoes/1.jpg"));
    }

    #[test]
    fn render_all_keeps_backend_order() {
        let cards = renderer().render_all(&[product(3, "C"), product(1, "A")]);
        let ids: Vec<u64> = cards.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[test]
    fn status_line_per_phase() {
        let mut state = SearchState::default();
        assert_eq!(status_line(&state), None);

        state.phase = SearchPhase::Loading;
        assert_eq!(status_line(&state).as_deref(), Some(LOADING_MESSAGE));

        state.phase = SearchPhase::Empty;
        assert_eq!(status_line(&state).as_deref(), Some(NO_RESULTS_MESSAGE));

        state.phase = SearchPhase::Error;
        state.error_message = Some("index unavailable".into());
        assert_eq!(
            status_line(&state).as_deref(),
            Some("Error during search: index unavailable")
        );
    }

    #[test]
    fn heading_reflects_mode() {
        let state = SearchState {
            mode: SearchMode::Image,
            phase: SearchPhase::Success,
            results: ranked_products(12),
            error_message: None,
        };
        assert_eq!(
            results_heading(&state).as_deref(),
            Some("Image results (12 products)")
        );
        assert_eq!(results_heading(&SearchState::default()), None);
    }
}
