pub mod data_type;
pub mod id;
pub mod table;
pub mod types;
pub mod value;
