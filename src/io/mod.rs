//! Resource resolution and content type detection

mod content_type;
mod resource;

pub use content_type::{ContentDataType, ContentTypeDetector, MagicContentTypeDetector};
pub use resource::{
    decode_data_uri, is_absolute_uri, is_data_uri, join_uri, uri_directory, FileResourceResolver,
    MemoryResourceResolver, ResolveFuture, ResourceResolver,
};
