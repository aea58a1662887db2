//! Best-effort field extraction. Every extractor returns a value, possibly
//! empty; callers log empties at record level instead of failing.

pub mod html;
pub mod json;
