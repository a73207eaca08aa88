pub mod model;
pub mod source;

pub use model::{LoaderType, ModEntry, ProviderKind};
pub use source::{build_entries, load_mod_list, ModSpec};
