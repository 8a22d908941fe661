//! Wire format types for the vendor protocols
//!
//! Each module contains pure serde structs matching the respective vendor's
//! JSON API format. They only appear at the HTTP boundary; everything above
//! it speaks the canonical types.

pub mod anthropic;
pub mod openai;
