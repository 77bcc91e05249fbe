//! Process-wide helpers shared by the binary and the tests.

pub mod logging;
