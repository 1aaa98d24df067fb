pub mod attempt_service;
pub mod conference_service;
pub mod event_clock;
pub mod event_service;
pub mod grading_service;
pub mod identity_service;
pub mod notification_service;
pub mod participation_service;
pub mod release_service;
pub mod test_flow_service;
pub mod tool_service;
