pub mod constants;
pub mod url_utils;

pub use constants::*;
pub use url_utils::{absolutize, is_opaque_reference, resolve_url, url_file_name};
