pub mod engagementmodel;
pub mod invoicemodel;
pub mod pointsmodel;
pub mod timemodel;
