//! Translation from a 1.19.4 server to 1.20 clients.

pub mod block_entity;
pub mod blocks;
pub mod items;
pub mod mappings;
pub mod packets;
pub mod recipes;
pub mod translator;

pub use mappings::MappingData;
pub use recipes::UnknownRecipePolicy;
pub use translator::V1_19_4To1_20;
