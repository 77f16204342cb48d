mod bioc_urls;
mod broken;
mod can_install;
mod depends;

pub use bioc_urls::bioc_urls;
pub use broken::{broken, BrokenPackage};
pub use can_install::can_install;
pub use depends::depends;
