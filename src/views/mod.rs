// ============================================================================
// VIEWS - Funciones que renderizan DOM (sin lógica)
// ============================================================================

pub mod app;
pub mod shared;
pub mod offline_banner;
pub mod member_tile;
pub mod kiosk;
pub mod student;
pub mod admin;

pub use app::render_app;
