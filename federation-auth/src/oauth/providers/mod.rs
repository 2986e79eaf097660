//! Identity provider variants.

pub mod generic;
pub mod google;
