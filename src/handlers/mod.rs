// src/handlers/mod.rs

pub mod attendance;
pub mod customer_api;
pub mod customers;
pub mod devices;
pub mod general;
pub mod inventory;
pub mod leave;
pub mod loans;
pub mod payments;
pub mod payroll;
pub mod staff;
pub mod tenant;
