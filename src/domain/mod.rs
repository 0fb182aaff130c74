pub mod estimate;
pub mod id;
pub mod track;
pub mod validate;
