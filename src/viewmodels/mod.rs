pub mod kiosk_viewmodel;
pub mod student_viewmodel;
pub mod admin_viewmodel;
pub mod banner_viewmodel;

pub use kiosk_viewmodel::KioskViewModel;
pub use student_viewmodel::StudentViewModel;
pub use admin_viewmodel::AdminViewModel;
