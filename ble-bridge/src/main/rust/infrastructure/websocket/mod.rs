mod server;

pub use server::{handle_connection, routes};
