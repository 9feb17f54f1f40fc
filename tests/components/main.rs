//! Component tests, one module per file under src/components and src/backends

mod test_bridge;
mod test_headless;
mod test_payload;
mod test_timer;
