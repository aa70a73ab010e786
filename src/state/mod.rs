//! PhotoWallet 视图状态模块

pub mod photo_wallet;

pub use photo_wallet::{AppView, PhotoWalletState, PhotoWalletStore, SubscriptionId, SyncPhase};
