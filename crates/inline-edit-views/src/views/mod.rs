//! Views: class-based, function-based, generic, and conditional.

pub mod class_based;
pub mod conditional;
pub mod factory;
pub mod function;
pub mod generic;
