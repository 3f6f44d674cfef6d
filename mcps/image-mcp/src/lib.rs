//! Image MCP Library
//!
//! Image generation and inspection exposed as MCP tools:
//!
//! - `generate_image`: call the images API, save `generated_*.png`, return its path
//! - `list_generated_images`: list saved images with their sizes
//! - `get_image_info`: size, dimensions and color type of one file
//!
//! # Environment
//!
//! - `OPENAI_API_KEY`: needed by `generate_image`
//! - `OPENAI_BASE_URL`: API root, defaults to `https://api.openai.com/v1`
//! - `IMAGE_OUTPUT_DIR`: where images are saved and listed, defaults to the cwd

pub mod files;
pub mod server;

pub use files::{image_filename, image_info, list_images};
pub use server::{ImageConfig, ImageMcpServer};
