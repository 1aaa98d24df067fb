pub mod event;
pub mod participation;
pub mod test_flow;
pub mod tool;
pub mod tool_attempt;
pub mod user;
pub mod video_conference;
