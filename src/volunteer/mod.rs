pub mod domain;
pub mod handlers;
pub mod repository;

pub use domain::{
    ActivityRequest, ActivityStatus, RequestStatus, ReviewDecision, ReviewError, VolunteerActivity,
};
pub use repository::{
    ActivityPatch, DynVolunteerRepository, NewActivity, SqliteVolunteerRepository,
    VolunteerRepository,
};
