use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use axum_extra::extract::{multipart::MultipartError, Multipart, WithRejection};
use serde::Serialize;
use uuid::Uuid;

use super::AppState;
use crate::{
    error::AppError,
    models::{Product, ProductDraft},
    services::UploadedFile,
    utils::form::{non_empty, parse_flag},
};

pub const IMAGE_FIELD: &str = "images";
pub const MAX_IMAGES: usize = 5;

#[derive(Serialize)]
pub struct ProductResponse {
    pub message: &'static str,
    pub product: Product,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub message: &'static str,
    pub inventory_removed: u64,
    pub files_not_removed: usize,
}

pub async fn list_products(State(state): State<AppState>) -> Result<Json<Vec<Product>>, AppError> {
    Ok(Json(state.catalog.list_products().await?))
}

pub async fn get_product(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<Product>, AppError> {
    Ok(Json(state.catalog.get_product(id).await?))
}

pub async fn create_product(
    State(state): State<AppState>,
    WithRejection(multipart, _): WithRejection<Multipart, AppError>,
) -> Result<(StatusCode, Json<ProductResponse>), AppError> {
    let (draft, images) = parse_product_multipart(multipart).await?;
    let product = state.catalog.create_product(draft, images).await?;

    Ok((
        StatusCode::CREATED,
        Json(ProductResponse {
            message: "Product created successfully!",
            product,
        }),
    ))
}

pub async fn update_product(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(multipart, _): WithRejection<Multipart, AppError>,
) -> Result<Json<ProductResponse>, AppError> {
    let (draft, images) = parse_product_multipart(multipart).await?;
    let product = state.catalog.update_product(id, draft, images).await?;

    Ok(Json(ProductResponse {
        message: "Product updated successfully!",
        product,
    }))
}

pub async fn delete_product(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<DeleteResponse>, AppError> {
    let outcome = state.catalog.delete_product(id).await?;
    Ok(Json(DeleteResponse {
        message: "Product deleted successfully",
        inventory_removed: outcome.inventory_removed,
        files_not_removed: outcome.cleanup_failures,
    }))
}

fn upload_error(err: MultipartError) -> AppError {
    AppError::Upload(err.body_text())
}

fn parse_uuid(field: &str, value: Option<String>) -> Result<Option<Uuid>, AppError> {
    value
        .map(|raw| {
            Uuid::parse_str(raw.trim())
                .map_err(|_| AppError::Validation(format!("{field} must be a valid id, got {raw:?}")))
        })
        .transpose()
}

async fn parse_product_multipart(
    mut multipart: Multipart,
) -> Result<(ProductDraft, Vec<UploadedFile>), AppError> {
    let mut draft = ProductDraft::default();
    let mut images = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        let name = match field.name() {
            Some(name) => name.to_string(),
            None => continue,
        };

        if let Some(file_name) = field.file_name().map(|s| s.to_string()) {
            if name != IMAGE_FIELD {
                return Err(AppError::Upload(format!("Unexpected field: {name}")));
            }
            let data = field.bytes().await.map_err(upload_error)?;
            // Browsers send an empty part for an untouched file input.
            if file_name.is_empty() && data.is_empty() {
                continue;
            }
            if images.len() == MAX_IMAGES {
                return Err(AppError::Upload(format!(
                    "Too many files: at most {MAX_IMAGES} images per request"
                )));
            }
            images.push(UploadedFile { file_name, data });
            continue;
        }

        let value = non_empty(Some(field.text().await.map_err(upload_error)?));
        match name.as_str() {
            "name" => draft.name = value,
            "category" => draft.category = parse_uuid("category", value)?,
            "album" => draft.album = parse_uuid("album", value)?,
            "description" => draft.description = value,
            "foodNotes" => draft.food_notes = value,
            "ingredients" => draft.ingredients = value,
            "available" => draft.available = parse_flag("available", value.as_deref())?,
            "isVeg" => draft.is_veg = parse_flag("isVeg", value.as_deref())?,
            "isCakeProduct" => {
                draft.is_cake_product = parse_flag("isCakeProduct", value.as_deref())?
            }
            "isPastry" => draft.is_pastry = parse_flag("isPastry", value.as_deref())?,
            "priceDetails" => draft.price_details = value,
            _ => (),
        }
    }

    Ok((draft, images))
}
