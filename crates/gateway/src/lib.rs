//! `balcao-gateway` — HTTP edge of the platform.
//!
//! The gateway owns request admission (route gate), the login/logout and
//! tenant-switch actions, and the wiring of per-session state. Everything it
//! knows about identity and tenants comes from `balcao-session`.

pub mod app;
pub mod config;
pub mod gate;
pub mod sessions;

pub use config::GatewayConfig;
