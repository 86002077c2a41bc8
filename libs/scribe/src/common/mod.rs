mod types;
mod utils;

pub use types::{mime_type_from_path, ImageInput, DEFAULT_FILE_NAME, DEFAULT_MIME_TYPE};
pub use utils::{get_current_timestamp_str, load_reference};
