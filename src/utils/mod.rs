pub mod barcode;
pub mod form;
