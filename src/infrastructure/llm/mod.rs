mod mock_llm_client;
mod openai_client;

pub use mock_llm_client::{MockLlmClient, MockReply};
pub use openai_client::{OpenAiClient, create_llm_client};
