//! PhotoWallet 工具模块
//!
//! 包含通用工具函数

pub mod error;
pub mod format;
pub mod sanitize;

pub use error::*;
pub use format::*;
pub use sanitize::*;
