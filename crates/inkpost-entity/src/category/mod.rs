//! Blog posts ("Categories") and their tags ("Items").

pub mod item;
pub mod model;

pub use item::Item;
pub use model::{Category, DigestEntry};
