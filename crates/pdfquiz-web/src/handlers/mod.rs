pub mod apikey;
pub mod index;
pub mod quiz;
pub mod summary;
pub mod upload;
