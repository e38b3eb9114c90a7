mod async_completion_tests;
mod lifecycle_tests;
