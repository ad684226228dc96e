pub mod batch;
pub mod decode;
pub mod schema;
pub mod write;
