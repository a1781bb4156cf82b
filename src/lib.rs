pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod speech_to_text;
pub mod visual_recognition;

// Re-export commonly used items for convenience
pub use auth::{Authenticator, IamTokenManager};
pub use config::{IbmRegion, ServiceConfig, ServiceKind};
pub use error::{WatsonError, WatsonResult};
pub use http::WatsonClient;
pub use speech_to_text::SpeechToTextService;
pub use visual_recognition::VisualRecognitionService;
