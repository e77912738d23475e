pub mod green_invoice;
pub mod tranzila;
