//! Posts: local store, remote source and the sync policy between them.

pub mod domain;
pub mod remote;
pub mod repo;
pub mod repository;
pub mod service;

pub use domain::{NewPost, Post, PostDraft, PostInput, PostOrder, RemoteSync, UpdatedPost};
pub use remote::RemoteSource;
pub use repository::PostRepository;
pub use service::PostSyncService;
