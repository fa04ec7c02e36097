//! End-to-end tests wiring the service layer to the in-memory backend.
//! Everything lives under `tests/`; this crate exports nothing.
