pub mod interaction;
pub mod location_opener;
pub mod module_manager;
pub mod registry;

pub use interaction::ModulePicker;
pub use location_opener::DesktopOpener;
pub use module_manager::{ModuleManager, Outcome};
pub use registry::ModuleRegistry;
