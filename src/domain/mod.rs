pub mod audio;
pub mod reader;
pub mod text;
