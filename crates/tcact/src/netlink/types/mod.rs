//! Kernel wire types.

pub mod tc;
