pub mod descriptor;
pub mod html;
pub mod live;

pub use descriptor::{FieldDescriptor, Rect, SelectOption};
pub use html::{extract_fields_from_frames, extract_fields_from_html};
pub use live::extract_fields;
