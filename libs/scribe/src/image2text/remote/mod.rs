mod types;
pub use types::RemoteConfig;

mod remote_api_call;
pub use remote_api_call::RemoteOcrEngine;
