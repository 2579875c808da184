//! Products, their images, and the validation applied on every write.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Category, Price, ProductId};

/// Image shown when a product has no images at all.
pub const PLACEHOLDER_IMAGE: &str = "/placeholder.svg";

/// A product image after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    pub url: String,
    pub alt: String,
    pub is_primary: bool,
}

/// An image as submitted by an admin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInput {
    pub url: String,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
}

/// Free-text product specifications.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Specifications {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemstone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purity: Option<String>,
}

impl Specifications {
    /// Trim every field and drop the empty ones.
    #[must_use]
    pub fn normalized(self) -> Self {
        let clean = |v: Option<String>| {
            v.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
        };
        Self {
            material: clean(self.material),
            weight: clean(self.weight),
            dimensions: clean(self.dimensions),
            gemstone: clean(self.gemstone),
            purity: clean(self.purity),
        }
    }
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Price,
    pub category: Category,
    pub stock_quantity: i32,
    pub images: Vec<ProductImage>,
    pub is_active: bool,
    pub is_featured: bool,
    pub is_new: bool,
    pub popularity: i32,
    pub tags: Vec<String>,
    pub specifications: Specifications,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Whether at least one unit is available.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock_quantity > 0
    }

    /// URL of the primary image, falling back to the first image and then
    /// to [`PLACEHOLDER_IMAGE`].
    #[must_use]
    pub fn image_url(&self) -> &str {
        primary_image_url(&self.images)
    }
}

/// Resolve the display image for a list of images.
#[must_use]
pub fn primary_image_url(images: &[ProductImage]) -> &str {
    images
        .iter()
        .find(|img| img.is_primary)
        .or_else(|| images.first())
        .map_or(PLACEHOLDER_IMAGE, |img| img.url.as_str())
}

/// A product as returned to clients, with derived fields included.
#[derive(Debug, Clone, Serialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub image_url: String,
    pub in_stock: bool,
}

impl From<Product> for ProductView {
    fn from(product: Product) -> Self {
        let image_url = product.image_url().to_owned();
        let in_stock = product.in_stock();
        Self {
            product,
            image_url,
            in_stock,
        }
    }
}

// =============================================================================
// Validation
// =============================================================================

/// A single product validation failure.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProductError {
    #[error("Product name must be between 2 and 100 characters")]
    Name,
    #[error("Description must be between 10 and 1000 characters")]
    Description,
    #[error("Price must be a positive number")]
    Price,
    #[error("Invalid category")]
    Category,
    #[error("Stock quantity must be a non-negative integer")]
    StockQuantity,
    #[error("Popularity must be a non-negative integer")]
    Popularity,
    #[error("At least one image is required")]
    NoImages,
    #[error("Each image must have a valid URL")]
    ImageUrl,
}

/// Every failure found in one submission.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", join_messages(.0))]
pub struct ProductErrors(pub Vec<ProductError>);

fn join_messages(errors: &[ProductError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Product fields as submitted on create or full update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: String,
    pub stock_quantity: i64,
    #[serde(default)]
    pub images: Vec<ImageInput>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub is_featured: Option<bool>,
    #[serde(default)]
    pub is_new: Option<bool>,
    #[serde(default)]
    pub popularity: Option<i64>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub specifications: Specifications,
}

/// A validated product ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Price,
    pub category: Category,
    pub stock_quantity: i32,
    pub images: Vec<ProductImage>,
    pub is_active: bool,
    pub is_featured: bool,
    pub is_new: bool,
    pub popularity: i32,
    pub tags: Vec<String>,
    pub specifications: Specifications,
}

impl ProductInput {
    /// Validate every field and normalize images, tags and specifications.
    ///
    /// # Errors
    ///
    /// Returns all failures at once so a form can show them together.
    pub fn validate(self) -> Result<NewProduct, ProductErrors> {
        let mut errors = Vec::new();

        let name = self.name.trim().to_owned();
        if !(2..=100).contains(&name.chars().count()) {
            errors.push(ProductError::Name);
        }

        let description = self.description.trim().to_owned();
        if !(10..=1000).contains(&description.chars().count()) {
            errors.push(ProductError::Description);
        }

        let price = Price::new(self.price).map_err(|_| ProductError::Price);
        let category = self
            .category
            .parse::<Category>()
            .map_err(|_| ProductError::Category);
        let stock_quantity =
            i32::try_from(self.stock_quantity).map_err(|_| ProductError::StockQuantity);
        let popularity =
            i32::try_from(self.popularity.unwrap_or(0)).map_err(|_| ProductError::Popularity);

        let images = match validate_images(self.images, &name) {
            Ok(images) => Some(images),
            Err(e) => {
                errors.push(e);
                None
            }
        };

        match (price, category, stock_quantity, popularity, images) {
            (Ok(price), Ok(category), Ok(stock), Ok(popularity), Some(images))
                if errors.is_empty() && stock >= 0 && popularity >= 0 =>
            {
                Ok(NewProduct {
                    name,
                    description,
                    price,
                    category,
                    stock_quantity: stock,
                    images,
                    is_active: self.is_active.unwrap_or(true),
                    is_featured: self.is_featured.unwrap_or(false),
                    is_new: self.is_new.unwrap_or(false),
                    popularity,
                    tags: normalize_tags(self.tags),
                    specifications: self.specifications.normalized(),
                })
            }
            (price, category, stock, popularity, _) => {
                if price.is_err() {
                    errors.push(ProductError::Price);
                }
                if category.is_err() {
                    errors.push(ProductError::Category);
                }
                if stock.map_or(true, |s| s < 0) {
                    errors.push(ProductError::StockQuantity);
                }
                if popularity.map_or(true, |p| p < 0) {
                    errors.push(ProductError::Popularity);
                }
                errors.sort_by_key(field_order);
                Err(ProductErrors(errors))
            }
        }
    }
}

const fn field_order(e: &ProductError) -> u8 {
    match e {
        ProductError::Name => 0,
        ProductError::Description => 1,
        ProductError::Price => 2,
        ProductError::Category => 3,
        ProductError::StockQuantity => 4,
        ProductError::Popularity => 5,
        ProductError::NoImages => 6,
        ProductError::ImageUrl => 7,
    }
}

/// Validate image URLs and normalize the primary flag.
///
/// # Errors
///
/// Returns [`ProductError::NoImages`] for an empty list and
/// [`ProductError::ImageUrl`] if any URL is not an absolute http(s) URL.
pub fn validate_images(
    images: Vec<ImageInput>,
    product_name: &str,
) -> Result<Vec<ProductImage>, ProductError> {
    if images.is_empty() {
        return Err(ProductError::NoImages);
    }
    if !images.iter().all(|img| is_valid_image_url(&img.url)) {
        return Err(ProductError::ImageUrl);
    }
    Ok(normalize_images(images, product_name))
}

/// Whether `url` is an absolute `http`/`https` URL with a host.
#[must_use]
pub fn is_valid_image_url(url: &str) -> bool {
    url::Url::parse(url.trim()).is_ok_and(|u| {
        matches!(u.scheme(), "http" | "https") && u.host_str().is_some_and(|h| !h.is_empty())
    })
}

/// Fill in missing alt text and leave exactly one primary image.
///
/// The first image flagged primary keeps the flag and later flags are
/// cleared; when none is flagged the first image becomes primary.
#[must_use]
pub fn normalize_images(images: Vec<ImageInput>, product_name: &str) -> Vec<ProductImage> {
    let primary_index = images.iter().position(|img| img.is_primary).unwrap_or(0);

    images
        .into_iter()
        .enumerate()
        .map(|(i, img)| ProductImage {
            url: img.url.trim().to_owned(),
            alt: img
                .alt
                .map(|a| a.trim().to_owned())
                .filter(|a| !a.is_empty())
                .unwrap_or_else(|| product_name.to_owned()),
            is_primary: i == primary_index,
        })
        .collect()
}

/// Trim tags and drop empty ones.
#[must_use]
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|t| t.trim().to_owned())
        .filter(|t| !t.is_empty())
        .collect()
}
