pub mod toml_loader;

pub use toml_loader::{load_all_class_sheets, load_class_sheet};
