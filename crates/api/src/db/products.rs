//! Product repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use zaffira_core::product::{NewProduct, Product, ProductImage, Specifications};
use zaffira_core::{Category, Price, ProductId};

use super::{RepositoryError, map_constraint};

macro_rules! product_columns {
    () => {
        "id, name, description, price, category, stock_quantity, images, is_active, \
         is_featured, is_new, popularity, tags, specifications, created_at, updated_at"
    };
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    description: String,
    price: Price,
    category: Category,
    stock_quantity: i32,
    images: Json<Vec<ProductImage>>,
    is_active: bool,
    is_featured: bool,
    is_new: bool,
    popularity: i32,
    tags: Vec<String>,
    specifications: Json<Specifications>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            price: row.price,
            category: row.category,
            stock_quantity: row.stock_quantity,
            images: row.images.0,
            is_active: row.is_active,
            is_featured: row.is_featured,
            is_new: row.is_new,
            popularity: row.popularity,
            tags: row.tags,
            specifications: row.specifications.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Product counts for the admin dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, sqlx::FromRow)]
pub struct ProductStats {
    pub total: i64,
    pub active: i64,
    pub featured: i64,
    pub out_of_stock: i64,
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All active products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(concat!(
            "SELECT ",
            product_columns!(),
            " FROM products WHERE is_active ORDER BY created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Every product including inactive ones, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(concat!(
            "SELECT ",
            product_columns!(),
            " FROM products ORDER BY created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Active featured products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_featured(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(concat!(
            "SELECT ",
            product_columns!(),
            " FROM products WHERE is_active AND is_featured ORDER BY created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Get a product by ID regardless of its active flag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(concat!(
            "SELECT ",
            product_columns!(),
            " FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    /// Get several products by ID regardless of their active flag.
    ///
    /// Unknown IDs are skipped.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<uuid::Uuid> = ids.iter().map(ProductId::as_uuid).collect();
        let rows = sqlx::query_as::<_, ProductRow>(concat!(
            "SELECT ",
            product_columns!(),
            " FROM products WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Whether a product with this exact name exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists_by_name(&self, name: &str) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM products WHERE name = $1)")
                .bind(name)
                .fetch_one(self.pool)
                .await?;
        Ok(exists)
    }

    /// Insert a validated product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(concat!(
            "INSERT INTO products (name, description, price, category, stock_quantity, images, \
             is_active, is_featured, is_new, popularity, tags, specifications) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING ",
            product_columns!()
        ))
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.category)
        .bind(product.stock_quantity)
        .bind(Json(&product.images))
        .bind(product.is_active)
        .bind(product.is_featured)
        .bind(product.is_new)
        .bind(product.popularity)
        .bind(&product.tags)
        .bind(Json(&product.specifications))
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Replace every field of an existing product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product has this ID.
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn update(
        &self,
        id: ProductId,
        product: &NewProduct,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(concat!(
            "UPDATE products SET name = $2, description = $3, price = $4, category = $5, \
             stock_quantity = $6, images = $7, is_active = $8, is_featured = $9, is_new = $10, \
             popularity = $11, tags = $12, specifications = $13 \
             WHERE id = $1 RETURNING ",
            product_columns!()
        ))
        .bind(id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.category)
        .bind(product.stock_quantity)
        .bind(Json(&product.images))
        .bind(product.is_active)
        .bind(product.is_featured)
        .bind(product.is_new)
        .bind(product.popularity)
        .bind(&product.tags)
        .bind(Json(&product.specifications))
        .fetch_optional(self.pool)
        .await?;

        row.map(Product::from).ok_or(RepositoryError::NotFound)
    }

    /// Replace a product's images.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product has this ID.
    pub async fn set_images(
        &self,
        id: ProductId,
        images: &[ProductImage],
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(concat!(
            "UPDATE products SET images = $2 WHERE id = $1 RETURNING ",
            product_columns!()
        ))
        .bind(id)
        .bind(Json(images))
        .fetch_optional(self.pool)
        .await?;

        row.map(Product::from).ok_or(RepositoryError::NotFound)
    }

    /// Set the featured flag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product has this ID.
    pub async fn set_featured(
        &self,
        id: ProductId,
        featured: bool,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(concat!(
            "UPDATE products SET is_featured = $2 WHERE id = $1 RETURNING ",
            product_columns!()
        ))
        .bind(id)
        .bind(featured)
        .fetch_optional(self.pool)
        .await?;

        row.map(Product::from).ok_or(RepositoryError::NotFound)
    }

    /// Set the active flag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product has this ID.
    pub async fn set_active(&self, id: ProductId, active: bool) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(concat!(
            "UPDATE products SET is_active = $2 WHERE id = $1 RETURNING ",
            product_columns!()
        ))
        .bind(id)
        .bind(active)
        .fetch_optional(self.pool)
        .await?;

        row.map(Product::from).ok_or(RepositoryError::NotFound)
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product has this ID.
    /// Returns `RepositoryError::Conflict` if orders still reference it.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| {
                map_constraint(e, "product is referenced by orders; deactivate it instead")
            })?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Counts for the admin dashboard.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn stats(&self) -> Result<ProductStats, RepositoryError> {
        let stats = sqlx::query_as::<_, ProductStats>(
            r"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE is_active) AS active,
                   COUNT(*) FILTER (WHERE is_featured) AS featured,
                   COUNT(*) FILTER (WHERE stock_quantity = 0) AS out_of_stock
            FROM products
            ",
        )
        .fetch_one(self.pool)
        .await?;

        Ok(stats)
    }
}
