pub mod api_token;
pub mod application;
pub mod block_payload;
pub mod collection;
pub mod content_block;
pub mod page;
pub mod record;

pub use api_token::ApiToken;
pub use application::Application;
pub use block_payload::BlockPayload;
pub use collection::Collection;
pub use content_block::ContentBlock;
pub use page::Page;
pub use record::Record;

pub(crate) fn default_true() -> bool {
    true
}
