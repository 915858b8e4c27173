//! In-memory store managers and their backing collections

mod array;
mod collection;
mod manager;
mod map;
mod object;
mod pairs;
mod report;
mod set;

pub use array::ArrayCollection;
pub use collection::Collection;
pub use manager::{
    AddOptions, ArrayPairsStoreManager, ArrayStoreManager, MapStoreManager, ObjectStoreManager,
    SetStoreManager, StoreManager,
};
pub use map::MapCollection;
pub use object::ObjectCollection;
pub use pairs::ArrayPairsCollection;
pub use report::{DeleteMode, DeleteReport};
pub use set::SetCollection;
