/// Unit tests for the public domain types

mod domain_tests;
