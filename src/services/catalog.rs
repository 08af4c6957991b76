//! Product catalog: identity allocation, barcode generation and the
//! create/update/delete lifecycle.

use std::{path::PathBuf, sync::Arc};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::storage::{FileStorage, UploadedFile};
use crate::{
    error::AppError,
    models::{
        parse_price_details, PriceDetail, Product, ProductDraft, ProductId, ProductType,
        TierContext,
    },
    repository::Repository,
    utils::barcode::{build_upc, write_barcode, BarcodeStyle, CompanyPrefix},
};

/// Result of a product deletion. Cleanup failures are informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub inventory_removed: u64,
    pub cleanup_failures: usize,
}

#[derive(Clone)]
pub struct CatalogService {
    repo: Arc<dyn Repository>,
    storage: FileStorage,
    prefix: CompanyPrefix,
    style: BarcodeStyle,
}

impl CatalogService {
    pub fn new(repo: Arc<dyn Repository>, storage: FileStorage, prefix: CompanyPrefix) -> Self {
        Self {
            repo,
            storage,
            prefix,
            style: BarcodeStyle::default(),
        }
    }

    pub fn storage(&self) -> &FileStorage {
        &self.storage
    }

    pub async fn list_products(&self) -> Result<Vec<Product>, AppError> {
        Ok(self.repo.list_products().await?)
    }

    pub async fn get_product(&self, id: Uuid) -> Result<Product, AppError> {
        self.repo
            .find_product(id)
            .await?
            .ok_or(AppError::NotFound("Product"))
    }

    /// Creates a product. The barcode image is on disk before the row is
    /// inserted; if rendering or writing it fails nothing is inserted.
    pub async fn create_product(
        &self,
        draft: ProductDraft,
        images: Vec<UploadedFile>,
    ) -> Result<Product, AppError> {
        let name = draft
            .name
            .clone()
            .ok_or_else(|| AppError::Validation("name is required".to_string()))?;
        let is_cake = draft.is_cake_product.unwrap_or(false);
        let price_details = match draft.price_details.as_deref() {
            Some(raw) => parse_price_details(
                raw,
                TierContext {
                    is_cake,
                    existing: &[],
                    cake_type_requires_kg: false,
                },
            )?,
            None => Vec::new(),
        };

        let number = self.repo.allocate_product_number().await?;
        let product_id = ProductId::from_number(number)?;
        let upc = build_upc(&self.prefix, &product_id)?;

        let barcode_path = self.storage.barcode_path(&product_id);
        if let Err(e) = write_barcode(&upc, &barcode_path, self.style).await {
            log::error!("Error generating barcode for product {}: {}", product_id, e);
            return Err(e.into());
        }

        let stored_images = self.storage.save_images(&images).await?;
        let now = Utc::now();
        let barcode = self.storage.barcode_url(&product_id);
        let product = Product {
            id: Uuid::new_v4(),
            product_id,
            upc,
            barcode,
            name,
            category: draft.category,
            album: draft.album.filter(|_| is_cake),
            product_type: ProductType::from_cake_flag(is_cake),
            description: draft.description.unwrap_or_default(),
            food_notes: draft.food_notes.unwrap_or_default(),
            ingredients: draft.ingredients.unwrap_or_default(),
            available: draft.available.unwrap_or(false),
            is_veg: draft.is_veg.unwrap_or(true),
            is_pastry: draft.is_pastry.unwrap_or(false),
            images: stored_images,
            price_details,
            created_at: now,
            updated_at: now,
        };

        self.repo.insert_product(&product).await?;
        log::info!("Created product {} with UPC {}", product.product_id, product.upc);
        Ok(product)
    }

    /// Partial update: only fields present in `draft` change; new images are
    /// appended to the existing ones.
    pub async fn update_product(
        &self,
        id: Uuid,
        draft: ProductDraft,
        images: Vec<UploadedFile>,
    ) -> Result<Product, AppError> {
        let mut product = self.get_product(id).await?;

        let is_cake = draft.is_cake_product.unwrap_or_else(|| product.is_cake());
        let tiers = match draft.price_details.as_deref() {
            Some(raw) => parse_price_details(
                raw,
                TierContext {
                    is_cake,
                    existing: &product.price_details,
                    cake_type_requires_kg: true,
                },
            )?,
            None => Vec::new(),
        };

        let new_images = self.storage.save_images(&images).await?;
        apply_update(&mut product, draft, tiers, new_images, Utc::now());

        if !self.repo.save_product(&product).await? {
            return Err(AppError::NotFound("Product"));
        }
        log::info!("Updated product {}", product.product_id);
        Ok(product)
    }

    /// Deletes a product and its inventory, then tries to remove its files.
    pub async fn delete_product(&self, id: Uuid) -> Result<DeleteOutcome, AppError> {
        let product = self.get_product(id).await?;

        let inventory_removed = self
            .repo
            .delete_product_cascade(product.id)
            .await?
            .ok_or(AppError::NotFound("Product"))?;

        let mut files: Vec<PathBuf> = product
            .images
            .iter()
            .map(|name| self.storage.image_path(name))
            .collect();
        files.push(self.storage.barcode_path(&product.product_id));
        let failures = self.storage.remove_best_effort(&files).await;

        log::info!(
            "Deleted product {} ({} inventory records, {} files not removed)",
            product.product_id,
            inventory_removed,
            failures.len()
        );
        Ok(DeleteOutcome {
            inventory_removed,
            cleanup_failures: failures.len(),
        })
    }
}

fn apply_update(
    product: &mut Product,
    draft: ProductDraft,
    tiers: Vec<PriceDetail>,
    new_images: Vec<String>,
    now: DateTime<Utc>,
) {
    let is_cake = draft.is_cake_product.unwrap_or_else(|| product.is_cake());

    if let Some(name) = draft.name {
        product.name = name;
    }
    if let Some(category) = draft.category {
        product.category = Some(category);
    }
    product.product_type = ProductType::from_cake_flag(is_cake);
    product.album = if is_cake {
        draft.album.or(product.album)
    } else {
        None
    };
    if let Some(description) = draft.description {
        product.description = description;
    }
    if let Some(food_notes) = draft.food_notes {
        product.food_notes = food_notes;
    }
    if let Some(ingredients) = draft.ingredients {
        product.ingredients = ingredients;
    }
    product.available = draft.available.unwrap_or(product.available);
    product.is_veg = draft.is_veg.unwrap_or(product.is_veg);
    product.is_pastry = draft.is_pastry.unwrap_or(product.is_pastry);
    product.images.extend(new_images);
    if !tiers.is_empty() {
        product.price_details = tiers;
    }
    product.updated_at = now;
}
