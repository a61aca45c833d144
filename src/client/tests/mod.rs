//! End-to-end tests driving a `Client` against a real `Server`

mod common;
