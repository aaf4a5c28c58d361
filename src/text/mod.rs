pub mod decode;
pub mod fold;
