pub mod projection;

pub use projection::{matches, project, Projection};
