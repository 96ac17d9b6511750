mod captioner_factory;
mod daemon_captioner;
mod mock_captioner;
mod remote_captioner;

pub use captioner_factory::CaptionerFactory;
pub use daemon_captioner::{ClapDaemonCaptioner, ClapDaemonLoader};
pub use mock_captioner::{MOCK_CAPTION, MockCaptioner, MockCaptionerLoader};
pub use remote_captioner::{RemoteCaptioner, RemoteCaptionerLoader};
