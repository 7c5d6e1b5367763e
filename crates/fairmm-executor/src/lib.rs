//! Order gateway abstraction and order reconciliation for fairmm.
//!
//! - `OrderGateway`: dyn-compatible async trait over the marketplace's
//!   submit / cancel / list-resting calls
//! - `OrderReconciler`: diffs desired orders against resting ones and issues
//!   the minimal cancel / submit sequence, urgent markets first
//! - `PaperGateway`: in-memory marketplace for simulation and tests
//!
//! # Architecture
//!
//! ```text
//! MarketPlan (urgent first) → OrderReconciler.reconcile_all()
//!                               ├─ stale view? → gateway.list_resting()
//!                               ├─ PriceGuard re-check
//!                               └─ per side: keep / cancel / submit / cancel+submit
//!                                      ↓
//!                               OrderGateway (PaperGateway or live transport)
//! ```

pub mod config;
pub mod error;
pub mod gateway;
pub mod paper;
pub mod reconciler;

pub use config::ReconcilerConfig;
pub use error::{GatewayError, GatewayResult, ReconcileError, ReconcileResult};
pub use gateway::{BoxFuture, DynOrderGateway, OrderGateway};
pub use paper::{GatewayCall, PaperGateway};
pub use reconciler::{OrderReconciler, ReconcileReport};
