pub mod claude;
pub mod cohere;
pub mod error;
pub mod gemini;
pub mod openai;
pub mod traits;
pub mod util;

pub use claude::Claude;
pub use cohere::Cohere;
pub use error::{AiError, Result};
pub use gemini::Gemini;
pub use openai::OpenAi;
pub use traits::LanguageModel;
pub use util::{strip_code_blocks, truncate_to_char_boundary};
