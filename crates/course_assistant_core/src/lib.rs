pub mod domain;
pub mod ports;

pub use domain::{
    Course, CourseChanges, CourseStatus, NewCourse, NewUser, SummaryQuota, User, UserChanges,
};
pub use ports::{
    DatabaseService, PortError, PortResult, SummaryClaim, SummaryGenerationService,
};
