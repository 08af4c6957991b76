pub mod catalog;
pub mod orders;
pub mod storage;

pub use catalog::CatalogService;
pub use orders::{spawn_status_sweep, OrderService, SweepPolicy};
pub use storage::{FileStorage, UploadedFile};
