pub mod animation_source;
pub mod image_sequence_source;
