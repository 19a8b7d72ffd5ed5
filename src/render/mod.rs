//! The built-in renderers.
//!
//! Both renderers are [`Visitor`](crate::walk::Visitor) implementations
//! over the generic tree walk; custom output formats follow the same
//! pattern.

pub mod html;
pub mod markdown;
