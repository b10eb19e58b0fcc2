pub mod check;
pub mod dataset;
pub mod generate;
pub mod info;
pub mod validate;
