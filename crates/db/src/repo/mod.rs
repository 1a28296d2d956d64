pub mod accounts;
pub mod blobs;
pub mod movies;
pub mod profiles;
