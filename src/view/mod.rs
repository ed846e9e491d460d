pub mod editor;
pub mod transform;
