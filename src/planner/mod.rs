//! Plan compilation
//!
//! [`generate_plan`] turns a [`crate::catalog::Catalog`] plus the project's
//! modules and environment into a [`Plan`]: the steps that apply, grouped by
//! stage and ordered so that every artifact consumer runs after its
//! producers.

pub mod errors;
pub mod generator;
pub mod plan;
pub mod sorter;


pub use errors::PlanError;
pub use generator::{generate_plan, select_workflow};
pub use plan::{Dependency, Plan, Step};
pub use sorter::sort_steps;
