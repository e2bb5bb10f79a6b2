pub mod handlers;

pub use handlers::{create_router, start_server, ApiState};
