pub mod post;
pub mod profile;
pub mod style;
pub mod visual;
