pub mod db;
pub mod engagementdb;
pub mod invoicedb;
pub mod notificationdb;
pub mod pointsdb;
pub mod timedb;

#[cfg(test)]
pub mod memory;
