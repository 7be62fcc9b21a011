pub mod files;
pub mod legacy;
pub mod lock;
pub mod records;
