mod attachments;
mod record;
mod store;

pub use attachments::{resolve_attachment, resolve_attachments, AttachmentStore};
pub use record::{
    validate_name, ConnectionDetails, ConnectionRecord, ConnectionSpec, DEFAULT_PLUGIN,
};
pub use store::Registry;
