//! Types shared between the donation core and its front ends.

pub mod domain;
pub mod error;
pub mod protocol;
