pub mod ai_service;
pub mod gemini_service;
pub mod quiz_store;
pub mod storage_service;
pub mod upload_service;
