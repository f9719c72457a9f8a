pub mod db;

pub use db::{ItemStore, Versioned};
