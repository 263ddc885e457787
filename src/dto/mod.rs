pub mod grading_dto;
pub mod payment_dto;
