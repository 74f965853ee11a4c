//! Site Glue
//!
//! The small pieces of the portfolio site that sit outside the update
//! scheduler: the server preload hook and the helpers project pages use to
//! format dates and derive page names.

mod format;
mod preload;

pub use format::{format_time, trim_name, DateInput};
pub use preload::{handle, PreloadPolicy, ResolveOptions, ResourceKind};
