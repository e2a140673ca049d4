pub mod booking;
pub mod expense;
pub mod package;
pub mod salary;
pub mod staff;
