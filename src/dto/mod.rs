pub mod attempt_dto;
pub mod event_dto;
pub mod participant_dto;
pub mod task_dto;
pub mod test_flow_dto;
pub mod tool_dto;
