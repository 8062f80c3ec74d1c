pub mod arguments;
pub mod pom;
pub mod version;
