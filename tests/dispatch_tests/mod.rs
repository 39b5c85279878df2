pub mod property_test;
pub mod protocol_test;
