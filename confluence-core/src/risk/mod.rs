//! Risk management — sizing, stop levels, and the per-symbol position lifecycle.
//!
//! ```text
//! NONE ──set_position_stops──▶ OPEN ──check_exit_conditions──▶ exit reason
//!   ▲                                                              │
//!   └────────────────────────close_position─────────────────────────┘
//! ```

pub mod config;
pub mod manager;
pub mod ratchet;
pub mod registry;

pub use config::RiskConfig;
pub use manager::{
    ExitDecision, ExitDetails, PortfolioRisk, PositionSize, RiskLevel, RiskManager, StopLevels,
    LONG_HOLD_DAYS, TRAILING_ARM_MULTIPLE,
};
pub use ratchet::ratchet_up;
pub use registry::PositionRegistry;
