use regex::{Regex, RegexBuilder};
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::config::ExtractorConfig;
use crate::models::{ProductListing, Snapshot};
use crate::utils::error::AppError;
use crate::Result;

/// Turns a product listing page into a [`Snapshot`].
#[derive(Debug, Clone)]
pub struct CatalogExtractor {
    item: Selector,
    title: Selector,
    price: Selector,
    link: Selector,
    actions: Selector,
    available_label: Regex,
    item_selector: String,
    base_url: Url,
}

impl CatalogExtractor {
    pub fn new(config: &ExtractorConfig, base_url: &str) -> Result<Self> {
        let available_label = RegexBuilder::new(&regex::escape(config.available_label.trim()))
            .case_insensitive(true)
            .build()
            .map_err(|e| AppError::Validation(format!("Invalid available_label: {}", e)))?;

        let base_url = Url::parse(base_url)
            .map_err(|e| AppError::Validation(format!("Invalid base url '{}': {}", base_url, e)))?;

        Ok(Self {
            item: parse_selector(&config.item_selector)?,
            title: parse_selector(&config.title_selector)?,
            price: parse_selector(&config.price_selector)?,
            link: parse_selector(&config.link_selector)?,
            actions: parse_selector(&config.actions_selector)?,
            available_label,
            item_selector: config.item_selector.clone(),
            base_url,
        })
    }

    /// Extracts every listed product.
    ///
    /// Items missing a name, price or link are skipped. A page without any
    /// usable item is treated as a layout change and reported as an error,
    /// never as an empty catalog.
    pub fn extract(&self, html: &str) -> Result<Snapshot> {
        let document = Html::parse_document(html);
        let mut snapshot = Snapshot::new();
        let mut found = 0;

        for (position, item) in document.select(&self.item).enumerate() {
            found += 1;

            match self.extract_item(item) {
                Ok((name, listing)) => {
                    if !snapshot.insert(name.clone(), listing) {
                        tracing::warn!(
                            "Duplicate product '{}' at position {}, keeping first",
                            name,
                            position
                        );
                    }
                }
                Err(reason) => {
                    tracing::warn!("Skipping listing at position {}: {}", position, reason);
                }
            }
        }

        if found == 0 {
            return Err(AppError::Extraction(format!(
                "no listings matched '{}', page layout may have changed",
                self.item_selector
            )));
        }

        if snapshot.is_empty() {
            return Err(AppError::Extraction(format!(
                "none of the {} listings could be parsed",
                found
            )));
        }

        tracing::debug!("Extracted {} products from {} listings", snapshot.len(), found);
        Ok(snapshot)
    }

    fn extract_item(
        &self,
        item: ElementRef<'_>,
    ) -> std::result::Result<(String, ProductListing), String> {
        let name = first_line_of(item, &self.title).ok_or("missing product name")?;
        let price = first_line_of(item, &self.price)
            .ok_or_else(|| format!("missing price for '{}'", name))?;

        let href = item
            .select(&self.link)
            .find_map(|link| link.value().attr("href"))
            .ok_or_else(|| format!("missing product page link for '{}'", name))?;
        let page_url = self
            .base_url
            .join(href.trim())
            .map_err(|e| format!("invalid product page link '{}' for '{}': {}", href, name, e))?;

        let available = item
            .select(&self.actions)
            .any(|actions| self.available_label.is_match(&element_text(actions)));

        Ok((name, ProductListing::new(price, page_url.to_string(), available)))
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|_| AppError::InvalidSelector {
        selector: selector.to_string(),
    })
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>()
}

fn first_line_of(item: ElementRef<'_>, selector: &Selector) -> Option<String> {
    item.select(selector)
        .next()
        .and_then(|element| first_non_blank_line(&element_text(element)))
}

/// First line with visible content, trimmed.
pub fn first_non_blank_line(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}
