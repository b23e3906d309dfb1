mod correlation_tests;
mod logging_tests;
