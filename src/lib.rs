//! A content-addressed, versioned object store and synchronization protocol
//! for repositories of typed-link-connected structure elements: commits,
//! resources, associations, terminology entries, and opaque content blobs.

pub mod config;
pub mod errors;
pub mod hash;
pub mod object;
pub mod preloader;
pub mod protocol;
pub mod repository;
pub mod store;
pub mod workbench;
