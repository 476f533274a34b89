//! CLI command implementations

mod check;
mod info;
mod translate;

pub use check::check;
pub use info::info;
pub use translate::{translate, TranslateArgs};
