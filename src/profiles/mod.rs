pub mod builtin;
pub mod store;

pub use builtin::BuiltinBundle;
pub use store::{looks_like_path, Profile, ProfileListing, ProfileSource, ProfileStore};
