//! Configuration sections.

mod serve;
mod site;

pub use serve::ServeConfig;
pub use site::SiteConfig;
