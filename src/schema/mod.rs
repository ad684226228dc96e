pub mod derive;
pub mod filter;
pub mod profile;

pub use derive::{derive_headers, rectangularize, tabulate, Table};
pub use filter::MessageFilter;
pub use profile::Profile;
