pub mod lifecycle_tests;
pub mod scheduler_tests;
