pub mod layout;
pub mod markup;
pub mod measure;
