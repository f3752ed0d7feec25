//! Integration tests for parameter selection


// Sequential formation energy fitting
mod formation_tests;

// Comparison of fitted parameters with data
mod compare_tests;
