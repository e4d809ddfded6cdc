mod allocations;
mod availability;
mod time_off;
