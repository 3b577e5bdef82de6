//! Shop checkout server
//!
//! # Module layout
//!
//! ```text
//! shop-server/src/
//! ├── core/       # config, state, server, background tasks
//! ├── auth/       # JWT validation, CurrentUser extractor
//! ├── api/        # HTTP routes and handlers
//! ├── storage/    # redb tables and unit of work
//! ├── inventory/  # stock ledger
//! ├── vouchers/   # voucher evaluation and redemption
//! ├── cart/       # cart snapshot translation
//! ├── orders/     # checkout orchestration, money
//! ├── payment/    # VNPay signing and reconciliation
//! ├── cache/      # order read cache
//! ├── message/    # notification bus
//! ├── audit/      # hash-chained audit log
//! └── utils/      # logging, validation
//! ```

pub mod api;
pub mod audit;
pub mod auth;
pub mod cache;
pub mod cart;
pub mod core;
pub mod inventory;
pub mod message;
pub mod orders;
pub mod payment;
pub mod storage;
pub mod utils;
pub mod vouchers;

// Re-export common types
pub use auth::{CurrentUser, JwtService};
pub use core::{Config, Server, ServerState};
pub use orders::OrdersManager;
pub use payment::PaymentService;
pub use storage::ShopStorage;
pub use utils::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};

pub use utils::logger::{init_logger, init_logger_with_file};

// Security logging macro
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}

pub fn print_banner() {
    println!(
        r#"
     _
 ___| |__   ___  _ __
/ __| '_ \ / _ \| '_ \
\__ \ | | | (_) | |_) |
|___/_| |_|\___/| .__/
                |_|
    "#
    );
}
