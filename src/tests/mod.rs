pub mod responder_tests;
pub mod e2e_tests;
