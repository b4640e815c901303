pub mod image_write;
