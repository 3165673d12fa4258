mod llm;
mod storage;
