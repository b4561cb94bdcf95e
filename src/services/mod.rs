// src/services/mod.rs

pub mod calendar;
pub mod email;
pub mod export;
pub mod gateways;
pub mod leave;
pub mod payment;
pub mod payroll;
pub mod reports;

#[cfg(test)]
pub mod fixtures;
