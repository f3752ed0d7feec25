//! Integration tests for database loading and reduction

mod reduce_tests;
