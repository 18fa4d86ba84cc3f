pub mod error;
pub mod escrow_service;
pub mod invoice_service;
pub mod notification_service;
pub mod points_service;
pub mod time_service;
