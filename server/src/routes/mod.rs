pub mod auth;
pub mod bookings;
pub mod dashboard;
pub mod expenses;
pub mod health;
pub mod packages;
pub mod salaries;
pub mod staff;
