pub mod codec;
pub mod sled_store;

pub use codec::{decode_block, encode_block};
pub use sled_store::SledStore;
