//! Service layer keeping the local post store in sync with the remote posts API.
//! - Separates the sync policy from data access and HTTP plumbing.
//! - Store and remote are trait seams so the policy can run against fakes.
//! - Reuses entity definitions and field validation from the `models` crate.

pub mod errors;
pub mod posts;
#[cfg(test)]
pub mod test_support;
