pub mod ipc;
pub mod settings;
