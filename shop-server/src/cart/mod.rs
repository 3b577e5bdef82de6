//! Shopping cart snapshots

pub mod translator;

pub use translator::{CartError, CartResult, clear, translate, translate_in};
