//! Concrete providers behind the traits in [`crate::services`].

pub mod geotab;
