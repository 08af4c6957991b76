use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{postgres::PgRow, types::Json, FromRow, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use super::{
    InventoryRepository, OrderRepository, ProductRepository, RepoResult, RepositoryError,
};
use crate::{
    database::Database,
    models::{
        InventoryRecord, Order, OrderFilter, OrderLine, OrderStatus, PriceDetail, Product,
        ProductId, ProductType,
    },
};

const PRODUCT_SEQUENCE: &str = "product_id";

#[derive(Clone)]
pub struct PgRepository {
    pool: Database,
}

impl PgRepository {
    pub fn new(pool: Database) -> Self {
        Self { pool }
    }

    /// Raises the product counter to at least the highest stored product
    /// number, for rows that were inserted without going through the counter.
    pub async fn sync_product_sequence(&self) -> RepoResult<u64> {
        let value = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE product_sequence
            SET value = GREATEST(value, (SELECT COALESCE(MAX(product_id::BIGINT), 0) FROM products))
            WHERE name = $1
            RETURNING value
            "#,
        )
        .bind(PRODUCT_SEQUENCE)
        .fetch_one(&self.pool)
        .await?;
        Ok(value as u64)
    }
}

fn map_write_error(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let constraint = db_err.constraint().unwrap_or("unique constraint");
            return RepositoryError::Duplicate(constraint.to_string());
        }
    }
    RepositoryError::Database(err)
}

#[derive(Debug, FromRow)]
struct ProductRow {
    id: Uuid,
    product_id: String,
    upc: String,
    barcode: String,
    name: String,
    category_id: Option<Uuid>,
    album_id: Option<Uuid>,
    product_type: String,
    description: String,
    food_notes: String,
    ingredients: String,
    available: bool,
    is_veg: bool,
    is_pastry: bool,
    images: Vec<String>,
    price_details: Json<Vec<PriceDetail>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let product_id = ProductId::parse(&row.product_id)
            .map_err(|e| RepositoryError::Corrupt(e.to_string()))?;
        let product_type = ProductType::parse(&row.product_type).ok_or_else(|| {
            RepositoryError::Corrupt(format!("unknown product type {:?}", row.product_type))
        })?;
        Ok(Product {
            id: row.id,
            product_id,
            upc: row.upc,
            barcode: row.barcode,
            name: row.name,
            category: row.category_id,
            album: row.album_id,
            product_type,
            description: row.description,
            food_notes: row.food_notes,
            ingredients: row.ingredients,
            available: row.available,
            is_veg: row.is_veg,
            is_pastry: row.is_pastry,
            images: row.images,
            price_details: row.price_details.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct OrderRow {
    id: Uuid,
    order_id: String,
    bill_no: Option<String>,
    branch_id: Uuid,
    tab: String,
    products: Json<Vec<OrderLine>>,
    payment_method: String,
    subtotal: Decimal,
    total_gst: Decimal,
    total_with_gst: Decimal,
    total_items: i32,
    status: String,
    waiter_id: Option<Uuid>,
    table_id: Option<Uuid>,
    delivery_date_time: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse()
            .map_err(|e| RepositoryError::Corrupt(format!("order {}: {e}", row.id)))?;
        Ok(Order {
            id: row.id,
            order_id: row.order_id,
            bill_no: row.bill_no,
            branch_id: row.branch_id,
            tab: row.tab,
            products: row.products.0,
            payment_method: row.payment_method,
            subtotal: row.subtotal,
            total_gst: row.total_gst,
            total_with_gst: row.total_with_gst,
            total_items: row.total_items,
            status,
            waiter_id: row.waiter_id,
            table_id: row.table_id,
            delivery_date_time: row.delivery_date_time,
            created_at: row.created_at,
            updated_at: row.updated_at,
            version: row.version,
        })
    }
}

fn decode_order(row: &PgRow) -> RepoResult<Order> {
    OrderRow::from_row(row)
        .map_err(|e| {
            let id = row
                .try_get::<Uuid, _>("id")
                .map(|id| id.to_string())
                .unwrap_or_else(|_| "<unknown>".to_string());
            RepositoryError::Corrupt(format!("order {id}: {e}"))
        })
        .and_then(Order::try_from)
}

#[derive(Debug, FromRow)]
struct InventoryRow {
    id: Uuid,
    product_id: Uuid,
    branch_id: Option<Uuid>,
    quantity: Decimal,
    created_at: DateTime<Utc>,
}

impl From<InventoryRow> for InventoryRecord {
    fn from(row: InventoryRow) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            branch_id: row.branch_id,
            quantity: row.quantity,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl ProductRepository for PgRepository {
    async fn allocate_product_number(&self) -> RepoResult<u64> {
        // Single-statement increment; concurrent callers serialize on the row lock.
        let value = sqlx::query_scalar::<_, i64>(
            "UPDATE product_sequence SET value = value + 1 WHERE name = $1 RETURNING value",
        )
        .bind(PRODUCT_SEQUENCE)
        .fetch_one(&self.pool)
        .await?;
        Ok(value as u64)
    }

    async fn insert_product(&self, product: &Product) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO products (
                id, product_id, upc, barcode, name, category_id, album_id, product_type,
                description, food_notes, ingredients, available, is_veg, is_pastry,
                images, price_details, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(product.id)
        .bind(product.product_id.as_str())
        .bind(&product.upc)
        .bind(&product.barcode)
        .bind(&product.name)
        .bind(product.category)
        .bind(product.album)
        .bind(product.product_type.as_str())
        .bind(&product.description)
        .bind(&product.food_notes)
        .bind(&product.ingredients)
        .bind(product.available)
        .bind(product.is_veg)
        .bind(product.is_pastry)
        .bind(&product.images)
        .bind(Json(&product.price_details))
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(())
    }

    async fn save_product(&self, product: &Product) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = $2, category_id = $3, album_id = $4, product_type = $5,
                description = $6, food_notes = $7, ingredients = $8, available = $9,
                is_veg = $10, is_pastry = $11, images = $12, price_details = $13,
                updated_at = $14
            WHERE id = $1
            "#,
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(product.category)
        .bind(product.album)
        .bind(product.product_type.as_str())
        .bind(&product.description)
        .bind(&product.food_notes)
        .bind(&product.ingredients)
        .bind(product.available)
        .bind(product.is_veg)
        .bind(product.is_pastry)
        .bind(&product.images)
        .bind(Json(&product.price_details))
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(result.rows_affected() == 1)
    }

    async fn find_product(&self, id: Uuid) -> RepoResult<Option<Product>> {
        sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Product::try_from)
            .transpose()
    }

    async fn list_products(&self) -> RepoResult<Vec<Product>> {
        sqlx::query_as::<_, ProductRow>("SELECT * FROM products ORDER BY product_id")
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Product::try_from)
            .collect()
    }

    async fn delete_product_cascade(&self, id: Uuid) -> RepoResult<Option<u64>> {
        let mut tx = self.pool.begin().await?;

        let inventory = sqlx::query("DELETE FROM inventory WHERE product_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let product = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if product.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }
        tx.commit().await?;
        Ok(Some(inventory.rows_affected()))
    }
}

#[async_trait]
impl InventoryRepository for PgRepository {
    async fn insert_inventory(&self, record: &InventoryRecord) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO inventory (id, product_id, branch_id, quantity, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(record.id)
        .bind(record.product_id)
        .bind(record.branch_id)
        .bind(record.quantity)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(())
    }

    async fn list_inventory(&self, product_id: Option<Uuid>) -> RepoResult<Vec<InventoryRecord>> {
        let rows = match product_id {
            Some(product_id) => {
                sqlx::query_as::<_, InventoryRow>(
                    "SELECT * FROM inventory WHERE product_id = $1 ORDER BY created_at",
                )
                .bind(product_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, InventoryRow>("SELECT * FROM inventory ORDER BY created_at")
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(rows.into_iter().map(InventoryRecord::from).collect())
    }
}

#[async_trait]
impl OrderRepository for PgRepository {
    async fn insert_order(&self, order: &Order) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (
                id, order_id, bill_no, branch_id, tab, products, payment_method,
                subtotal, total_gst, total_with_gst, total_items, status,
                waiter_id, table_id, delivery_date_time, created_at, updated_at, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(order.id)
        .bind(&order.order_id)
        .bind(&order.bill_no)
        .bind(order.branch_id)
        .bind(&order.tab)
        .bind(Json(&order.products))
        .bind(&order.payment_method)
        .bind(order.subtotal)
        .bind(order.total_gst)
        .bind(order.total_with_gst)
        .bind(order.total_items)
        .bind(order.status.as_str())
        .bind(order.waiter_id)
        .bind(order.table_id)
        .bind(order.delivery_date_time)
        .bind(order.created_at)
        .bind(order.updated_at)
        .bind(order.version)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(())
    }

    async fn find_order(&self, id: Uuid) -> RepoResult<Option<Order>> {
        sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Order::try_from)
            .transpose()
    }

    async fn list_orders(&self, filter: &OrderFilter) -> RepoResult<Vec<Order>> {
        let mut query_builder = QueryBuilder::<Postgres>::new("SELECT * FROM orders");
        let mut has_where = false;

        if let Some(status) = filter.status {
            query_builder.push(" WHERE status = ").push_bind(status.as_str());
            has_where = true;
        }
        if let Some(branch_id) = filter.branch_id {
            query_builder
                .push(if has_where { " AND " } else { " WHERE " })
                .push("branch_id = ")
                .push_bind(branch_id);
        }
        query_builder.push(" ORDER BY created_at DESC");

        query_builder
            .build_query_as::<OrderRow>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Order::try_from)
            .collect()
    }

    async fn list_orders_in(
        &self,
        statuses: &[OrderStatus],
    ) -> RepoResult<Vec<RepoResult<Order>>> {
        let statuses: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();
        // Raw rows, so one undecodable order does not fail the whole batch.
        let rows = sqlx::query("SELECT * FROM orders WHERE status = ANY($1) ORDER BY created_at")
            .bind(&statuses)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(decode_order).collect())
    }

    async fn update_order_status(
        &self,
        id: Uuid,
        expected_version: i64,
        status: OrderStatus,
    ) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = $1, version = version + 1, updated_at = NOW()
            WHERE id = $2 AND version = $3
            "#,
        )
        .bind(status.as_str())
        .bind(id)
        .bind(expected_version)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
