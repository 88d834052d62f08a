//! Items in the download queue and the metadata handed to post-processing.

mod types;

pub use types::{
    Container, Item, ItemMetadata, ItemStatus, ItemType, ParentCategory, PlaylistKey,
};
