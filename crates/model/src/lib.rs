//! Shared data types for static-deploy.
//!
//! Every crate in the workspace speaks in these types: the path filter
//! produces [`FileEntry`] values collected into a [`WorkBatch`], the S3
//! client produces an [`Inventory`] of [`RemoteRecord`]s, and the transfer
//! scheduler consumes the batch.

mod batch;
mod inventory;

pub use batch::{FileEntry, Header, WorkBatch};
pub use inventory::{Inventory, RemoteRecord};
