pub mod operation;
pub mod profile;
pub mod resource;
pub mod state;
