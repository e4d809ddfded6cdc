pub mod allocation;
pub mod availability;
pub mod time_off;
pub mod validation;

pub use allocation::{Allocation, AllocationFilter, AllocationInput, AllocationUpdate};
pub use availability::{AvailabilityInput, UserAvailability};
pub use time_off::{RequestType, TimeOffFilter, TimeOffInput, TimeOffStatus, TimeOffWindow};
pub use validation::ValidationError;
