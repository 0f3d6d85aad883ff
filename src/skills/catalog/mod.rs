pub mod scan;
pub mod selection;

pub use scan::{Catalog, list_packages};
pub use selection::{Selection, resolve};
