pub mod inventory;
pub mod order;
pub mod product;

pub use inventory::{CreateInventory, InventoryQuery, InventoryRecord};
pub use order::{CreateOrder, Order, OrderFilter, OrderLine, OrderStatus, StatusUpdate};
pub use product::{
    parse_price_details, PriceDetail, Product, ProductDraft, ProductId, ProductIdError,
    ProductType, TierContext,
};
