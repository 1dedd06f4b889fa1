mod traits;
mod gemini;

pub use traits::*;
pub use gemini::{GeminiClient, GeminiSession};
