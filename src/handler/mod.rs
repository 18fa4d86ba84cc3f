pub mod engagements;
pub mod invoices;
pub mod points;
pub mod time_entries;
