//! Product catalog route handlers.

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use zaffira_core::ProductId;
use zaffira_core::catalog::{
    CatalogFilter, DEFAULT_PER_PAGE, DEFAULT_PRICE_MAX, DEFAULT_PRICE_MIN, SortOrder, browse,
};
use zaffira_core::product::{ImageInput, ProductInput, ProductView, validate_images};

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::middleware::{OptionalAuth, RequireAdmin};
use crate::services::{ChangeAction, Table};
use crate::state::AppState;

/// Catalog query string.
///
/// `category` is a comma-separated list of category names.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    pub category: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub new: Option<bool>,
    pub sale: Option<bool>,
    pub in_stock: Option<bool>,
    pub sort: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl CatalogQuery {
    /// The filter criteria encoded in the query.
    #[must_use]
    pub fn filter(&self) -> CatalogFilter {
        let categories = self
            .category
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("all"))
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();

        CatalogFilter {
            categories,
            price_min: self.min_price.unwrap_or(DEFAULT_PRICE_MIN),
            price_max: self.max_price.unwrap_or(DEFAULT_PRICE_MAX),
            new_only: self.new.unwrap_or(false),
            on_sale: self.sale.unwrap_or(false),
            in_stock_only: self.in_stock.unwrap_or(false),
        }
    }

    /// The requested sort order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for an unknown order.
    pub fn sort_order(&self) -> Result<SortOrder> {
        self.sort
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map_or(Ok(SortOrder::default()), |s| {
                s.parse().map_err(|e: zaffira_core::UnknownVariant| {
                    AppError::BadRequest(e.to_string())
                })
            })
    }
}

/// A page of the catalog.
#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    pub products: Vec<ProductView>,
    pub page: u32,
    pub per_page: u32,
    pub total: usize,
    pub total_pages: u32,
    pub category_counts: BTreeMap<String, usize>,
    pub active_filters: u32,
}

/// Replacement image list.
#[derive(Debug, Deserialize)]
pub struct ImagesRequest {
    #[serde(default)]
    pub images: Vec<ImageInput>,
}

/// Featured toggle.
#[derive(Debug, Deserialize)]
pub struct FeaturedRequest {
    pub is_featured: bool,
}

/// Active toggle.
#[derive(Debug, Deserialize)]
pub struct ActiveRequest {
    pub is_active: bool,
}

fn views(products: Vec<zaffira_core::product::Product>) -> Vec<ProductView> {
    products.into_iter().map(ProductView::from).collect()
}

/// Browse active products.
///
/// GET /api/products
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<CatalogResponse>> {
    let filter = query.filter();
    let order = query.sort_order()?;

    let products = ProductRepository::new(state.pool()).list_active().await?;
    let result = browse(
        products,
        &filter,
        order,
        query.page.unwrap_or(1),
        query.per_page.unwrap_or(DEFAULT_PER_PAGE),
    );

    Ok(Json(CatalogResponse {
        products: views(result.page.items),
        page: result.page.page,
        per_page: result.page.per_page,
        total: result.page.total,
        total_pages: result.page.total_pages,
        category_counts: result.category_counts,
        active_filters: result.active_filters,
    }))
}

/// Active featured products.
///
/// GET /api/products/featured
#[instrument(skip(state))]
pub async fn featured(State(state): State<AppState>) -> Result<Json<Vec<ProductView>>> {
    let products = ProductRepository::new(state.pool()).list_featured().await?;
    Ok(Json(views(products)))
}

/// One product. Inactive products are only visible to admins.
///
/// GET /api/products/{id}
#[instrument(skip(state, caller))]
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(caller): OptionalAuth,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductView>> {
    let is_admin = caller.is_some_and(|c| c.is_admin());
    let product = ProductRepository::new(state.pool())
        .get(id)
        .await?
        .filter(|p| p.is_active || is_admin)
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    Ok(Json(product.into()))
}

/// Every product, including inactive ones.
///
/// GET /api/admin/products
#[instrument(skip_all)]
pub async fn admin_index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<ProductView>>> {
    let products = ProductRepository::new(state.pool()).list_all().await?;
    Ok(Json(views(products)))
}

/// Create a product.
///
/// POST /api/products
#[instrument(skip_all, fields(admin = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<ProductInput>,
) -> Result<(StatusCode, Json<ProductView>)> {
    let new_product = input.validate()?;
    let product = ProductRepository::new(state.pool())
        .create(&new_product)
        .await?;

    tracing::info!(product_id = %product.id, name = %product.name, "product created");
    state
        .changes()
        .publish(Table::Products, ChangeAction::Insert, product.id);

    Ok((StatusCode::CREATED, Json(product.into())))
}

/// Replace a product.
///
/// PUT /api/products/{id}
#[instrument(skip_all, fields(admin = %admin.id, product_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
    Json(input): Json<ProductInput>,
) -> Result<Json<ProductView>> {
    let new_product = input.validate()?;
    let product = ProductRepository::new(state.pool())
        .update(id, &new_product)
        .await?;

    state
        .changes()
        .publish(Table::Products, ChangeAction::Update, product.id);

    Ok(Json(product.into()))
}

/// Delete a product.
///
/// DELETE /api/products/{id}
#[instrument(skip_all, fields(admin = %admin.id, product_id = %id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    ProductRepository::new(state.pool()).delete(id).await?;

    tracing::info!("product deleted");
    state
        .changes()
        .publish(Table::Products, ChangeAction::Delete, id);

    Ok(StatusCode::NO_CONTENT)
}

/// Replace a product's images.
///
/// PUT /api/products/{id}/images
#[instrument(skip_all, fields(admin = %admin.id, product_id = %id))]
pub async fn set_images(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
    Json(request): Json<ImagesRequest>,
) -> Result<Json<ProductView>> {
    let repo = ProductRepository::new(state.pool());
    let current = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    let images = validate_images(request.images, &current.name)
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let product = repo.set_images(id, &images).await?;

    state
        .changes()
        .publish(Table::Products, ChangeAction::Update, id);

    Ok(Json(product.into()))
}

/// Set the featured flag.
///
/// PUT /api/products/{id}/featured
#[instrument(skip_all, fields(admin = %admin.id, product_id = %id))]
pub async fn set_featured(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
    Json(request): Json<FeaturedRequest>,
) -> Result<Json<ProductView>> {
    let product = ProductRepository::new(state.pool())
        .set_featured(id, request.is_featured)
        .await?;

    state
        .changes()
        .publish(Table::Products, ChangeAction::Update, id);

    Ok(Json(product.into()))
}

/// Set the active flag.
///
/// PUT /api/products/{id}/active
#[instrument(skip_all, fields(admin = %admin.id, product_id = %id))]
pub async fn set_active(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
    Json(request): Json<ActiveRequest>,
) -> Result<Json<ProductView>> {
    let product = ProductRepository::new(state.pool())
        .set_active(id, request.is_active)
        .await?;

    state
        .changes()
        .publish(Table::Products, ChangeAction::Update, id);

    Ok(Json(product.into()))
}
