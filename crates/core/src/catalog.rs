//! Catalog browsing: filter, sort, paginate.
//!
//! The pipeline runs over the in-memory list of active products. Each step
//! is a single pass (plus the sort), so the whole thing stays cheap for a
//! jewelry catalog of a few hundred items.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::product::Product;
use crate::types::capitalize;

/// Default lower bound of the price filter (rupees).
pub const DEFAULT_PRICE_MIN: Decimal = Decimal::ZERO;

/// Default upper bound of the price filter (rupees).
pub const DEFAULT_PRICE_MAX: Decimal = Decimal::from_parts(100_000, 0, 0, false, 0);

/// Default page size.
pub const DEFAULT_PER_PAGE: u32 = 20;

/// Largest page size a client may request.
pub const MAX_PER_PAGE: u32 = 100;

/// Catalog filter criteria.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogFilter {
    /// Category names, matched case-insensitively. Empty matches all.
    pub categories: Vec<String>,
    /// Inclusive lower price bound.
    pub price_min: Decimal,
    /// Inclusive upper price bound.
    pub price_max: Decimal,
    /// Only products flagged new.
    pub new_only: bool,
    /// Accepted for parity with the storefront UI; there is no sale data,
    /// so it never excludes anything.
    pub on_sale: bool,
    /// Only products with stock.
    pub in_stock_only: bool,
}

impl Default for CatalogFilter {
    fn default() -> Self {
        Self {
            categories: Vec::new(),
            price_min: DEFAULT_PRICE_MIN,
            price_max: DEFAULT_PRICE_MAX,
            new_only: false,
            on_sale: false,
            in_stock_only: false,
        }
    }
}

impl CatalogFilter {
    /// Whether `product` passes every criterion.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        if !self.categories.is_empty() {
            let category = product.category.as_str();
            if !self
                .categories
                .iter()
                .any(|c| c.trim().eq_ignore_ascii_case(category))
            {
                return false;
            }
        }

        let price = product.price.amount();
        if price < self.price_min || price > self.price_max {
            return false;
        }

        if self.in_stock_only && !product.in_stock() {
            return false;
        }

        if self.new_only && !product.is_new {
            return false;
        }

        true
    }

    /// Number of criteria that differ from the defaults.
    #[must_use]
    pub fn active_count(&self) -> u32 {
        [
            !self.categories.is_empty(),
            self.price_min > DEFAULT_PRICE_MIN || self.price_max < DEFAULT_PRICE_MAX,
            self.new_only,
            self.on_sale,
            self.in_stock_only,
        ]
        .into_iter()
        .map(u32::from)
        .sum()
    }
}

/// Catalog sort order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortOrder {
    /// Most popular first.
    #[default]
    #[serde(rename = "popularity")]
    Popularity,
    /// Cheapest first.
    #[serde(rename = "price-low")]
    PriceLow,
    /// Most expensive first.
    #[serde(rename = "price-high")]
    PriceHigh,
    /// New arrivals first, then most recently created.
    #[serde(rename = "newest")]
    Newest,
    /// Alphabetical, case-insensitive.
    #[serde(rename = "name")]
    Name,
    /// No rating data exists; popularity then name.
    #[serde(rename = "rating")]
    Rating,
}

impl std::str::FromStr for SortOrder {
    type Err = crate::types::UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "popularity" => Ok(Self::Popularity),
            "price-low" => Ok(Self::PriceLow),
            "price-high" => Ok(Self::PriceHigh),
            "newest" => Ok(Self::Newest),
            "name" => Ok(Self::Name),
            "rating" => Ok(Self::Rating),
            other => Err(crate::types::UnknownVariant {
                kind: "sort order",
                value: other.to_owned(),
            }),
        }
    }
}

/// Sort products in place. The sort is stable.
pub fn sort_products(products: &mut [Product], order: SortOrder) {
    match order {
        SortOrder::Popularity => products.sort_by(|a, b| b.popularity.cmp(&a.popularity)),
        SortOrder::PriceLow => products.sort_by(|a, b| a.price.cmp(&b.price)),
        SortOrder::PriceHigh => products.sort_by(|a, b| b.price.cmp(&a.price)),
        SortOrder::Newest => products.sort_by(|a, b| {
            b.is_new
                .cmp(&a.is_new)
                .then_with(|| b.created_at.cmp(&a.created_at))
        }),
        SortOrder::Name => products.sort_by_cached_key(|p| p.name.to_lowercase()),
        SortOrder::Rating => products.sort_by(|a, b| {
            b.popularity
                .cmp(&a.popularity)
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        }),
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: usize,
    pub total_pages: u32,
}

/// Slice out a 1-based page.
///
/// `page` 0 is treated as 1, `per_page` is clamped to `1..=MAX_PER_PAGE`.
/// A page past the end yields no items but still reports the totals.
#[must_use]
pub fn paginate<T>(items: Vec<T>, page: u32, per_page: u32) -> Page<T> {
    let page = page.max(1);
    let per_page = per_page.clamp(1, MAX_PER_PAGE);
    let total = items.len();
    let per = per_page as usize;
    let total_pages = u32::try_from(total.div_ceil(per)).unwrap_or(u32::MAX);

    let start = (page as usize - 1).saturating_mul(per);
    let items = items.into_iter().skip(start).take(per).collect();

    Page {
        items,
        page,
        per_page,
        total,
        total_pages,
    }
}

/// Count products per display category (`Rings`, `Necklaces`, ...).
#[must_use]
pub fn category_counts(products: &[Product]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for product in products {
        *counts.entry(capitalize(product.category.as_str())).or_insert(0) += 1;
    }
    counts
}

/// Result of running the full catalog pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogResult {
    #[serde(flatten)]
    pub page: Page<Product>,
    pub category_counts: BTreeMap<String, usize>,
    pub active_filters: u32,
}

/// Filter, sort and paginate `products`.
///
/// Category counts are taken over the unfiltered list so the filter sidebar
/// always shows what exists.
#[must_use]
pub fn browse(
    products: Vec<Product>,
    filter: &CatalogFilter,
    order: SortOrder,
    page: u32,
    per_page: u32,
) -> CatalogResult {
    let category_counts = category_counts(&products);
    let mut matching: Vec<Product> = products.into_iter().filter(|p| filter.matches(p)).collect();
    sort_products(&mut matching, order);

    CatalogResult {
        page: paginate(matching, page, per_page),
        category_counts,
        active_filters: filter.active_count(),
    }
}
